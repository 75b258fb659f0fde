use proptest::prelude::*;

use txforge_script::chunk::{compile_chunks, decode_script};
use txforge_script::classify::classify_output;
use txforge_script::signature;
use txforge_script::Script;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn script_bytes_roundtrip(data in prop::collection::vec(any::<u8>(), 0..512)) {
        let script = Script::from_bytes(&data);
        prop_assert_eq!(script.to_bytes(), &data[..]);
    }

    #[test]
    fn script_hex_roundtrip(data in prop::collection::vec(any::<u8>(), 0..256)) {
        let script = Script::from_bytes(&data);
        let script2 = Script::from_hex(&script.to_hex()).unwrap();
        prop_assert_eq!(script.to_bytes(), script2.to_bytes());
    }

    #[test]
    fn push_compile_decode_roundtrip(parts in prop::collection::vec(prop::collection::vec(any::<u8>(), 17..80), 0..8)) {
        // Payloads above 16 bytes never hit the minimal-opcode substitutions,
        // so decode(compile(chunks)) is exact.
        let chunks: Vec<_> = parts.iter().cloned().map(txforge_script::ScriptChunk::push).collect();
        let compiled = compile_chunks(&chunks).unwrap();
        let decoded = decode_script(&compiled).unwrap();
        let payloads: Vec<_> = decoded.into_iter().map(|c| c.data.unwrap()).collect();
        prop_assert_eq!(payloads, parts);
    }

    #[test]
    fn classify_output_total_on_decodable(data in prop::collection::vec(any::<u8>(), 0..128)) {
        let script = Script::from_bytes(&data);
        // Classification either names a type or reports an undecodable
        // script; it must never panic.
        let _ = classify_output(&script);
    }

    #[test]
    fn signature_codec_roundtrip(mut sig in prop::collection::vec(any::<u8>(), 64), flag_base in 1u8..=3, acp in any::<bool>()) {
        // Keep each half below the DER 33-byte ceiling after padding.
        sig[0] &= 0x7f;
        sig[32] &= 0x7f;
        let mut fixed = [0u8; 64];
        fixed.copy_from_slice(&sig);
        let hash_type = if acp { flag_base | 0x80 } else { flag_base };

        let wire = signature::encode(&fixed, hash_type).unwrap();
        let decoded = signature::decode(&wire).unwrap();
        prop_assert_eq!(decoded.signature, fixed);
        prop_assert_eq!(decoded.hash_type, hash_type);
    }
}
