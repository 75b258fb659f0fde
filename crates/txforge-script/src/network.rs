//! Network parameters for address encoding.
//!
//! Each network carries the base58 version bytes for legacy addresses,
//! the bech32 human-readable part for segwit addresses, and the WIF
//! version byte for private keys.

/// Address and key encoding parameters for one Bitcoin network.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Network {
    /// Base58 version byte for P2PKH addresses.
    pub pubkey_hash: u8,
    /// Base58 version byte for P2SH addresses.
    pub script_hash: u8,
    /// Bech32 human-readable part for segwit addresses.
    pub bech32_hrp: &'static str,
    /// WIF version byte for private keys.
    pub wif: u8,
}

impl Network {
    /// Bitcoin mainnet.
    pub const MAINNET: Network = Network {
        pubkey_hash: 0x00,
        script_hash: 0x05,
        bech32_hrp: "bc",
        wif: 0x80,
    };

    /// Bitcoin testnet.
    pub const TESTNET: Network = Network {
        pubkey_hash: 0x6f,
        script_hash: 0xc4,
        bech32_hrp: "tb",
        wif: 0xef,
    };

    /// Local regression test network.
    pub const REGTEST: Network = Network {
        pubkey_hash: 0x6f,
        script_hash: 0xc4,
        bech32_hrp: "bcrt",
        wif: 0xef,
    };
}

impl Default for Network {
    fn default() -> Self {
        Network::MAINNET
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Verify the mainnet constants.
    #[test]
    fn test_mainnet_params() {
        assert_eq!(Network::MAINNET.pubkey_hash, 0x00);
        assert_eq!(Network::MAINNET.script_hash, 0x05);
        assert_eq!(Network::MAINNET.bech32_hrp, "bc");
        assert_eq!(Network::MAINNET.wif, 0x80);
    }

    /// Verify testnet and regtest share base58 bytes but not prefixes.
    #[test]
    fn test_testnet_regtest() {
        assert_eq!(Network::TESTNET.pubkey_hash, Network::REGTEST.pubkey_hash);
        assert_ne!(Network::TESTNET.bech32_hrp, Network::REGTEST.bech32_hrp);
        assert_ne!(Network::MAINNET, Network::TESTNET);
    }
}
