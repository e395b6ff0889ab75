/// Wallet configuration from environment variables
///
/// Controls the target network (address version bytes, BIP44 coin type),
/// the node API endpoint, gap-limit enforcement and the transaction weight
/// constants announced by the node.

use std::env;

/// Reserved UID of the native token. Custom token UIDs are 32-byte hashes
/// of their creation transaction's first input.
pub const NATIVE_TOKEN_UID: &str = "00";

/// Largest output value that still fits the 4-byte wire encoding.
pub const MAX_OUTPUT_VALUE_32: u64 = i32::MAX as u64;

/// Protocol maximum for a single output value.
pub const MAX_OUTPUT_VALUE: u64 = 1 << 43;

/// Transaction version emitted by this wallet.
pub const DEFAULT_TX_VERSION: u16 = 1;

/// Decimal places carried inside integer amounts (a user-facing 20.00
/// becomes 2000 on the wire).
pub const DECIMAL_PLACES: u32 = 2;

#[derive(Clone, Debug)]
pub struct NetworkParams {
    pub name: String,
    /// Version byte of pay-to-public-key-hash addresses
    pub p2pkh_version: u8,
    /// Version byte of pay-to-script-hash addresses
    pub p2sh_version: u8,
    /// BIP44 coin type used in the derivation path
    pub coin_type: u32,
}

impl NetworkParams {
    pub fn mainnet() -> Self {
        Self {
            name: "mainnet".to_string(),
            p2pkh_version: 0x28,
            p2sh_version: 0x64,
            coin_type: 280,
        }
    }

    pub fn testnet() -> Self {
        Self {
            name: "testnet".to_string(),
            p2pkh_version: 0x49,
            p2sh_version: 0x87,
            coin_type: 280,
        }
    }

    /// Custom version bytes, mainly for tests against reference vectors
    /// produced on development networks.
    pub fn with_versions(p2pkh_version: u8, p2sh_version: u8) -> Self {
        Self {
            name: "custom".to_string(),
            p2pkh_version,
            p2sh_version,
            coin_type: 280,
        }
    }

    /// Derivation path for the account chain: m/44'/<coin>'/0'/0
    pub fn derivation_path(&self) -> String {
        format!("m/44'/{}'/0'/0", self.coin_type)
    }
}

/// Weight constants announced by the node's version endpoint. The wallet
/// must compute at least the node minimum or the transaction is rejected.
#[derive(Clone, Copy, Debug)]
pub struct WeightConstants {
    pub min_tx_weight: f64,
    pub weight_coefficient: f64,
    pub min_weight_k: f64,
}

impl Default for WeightConstants {
    fn default() -> Self {
        Self {
            min_tx_weight: 14.0,
            weight_coefficient: 1.6,
            min_weight_k: 100.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct WalletConfig {
    pub network: NetworkParams,
    /// Node REST API base URL
    pub node_url: String,
    /// Maximum number of consecutive unused addresses kept generated
    pub gap_limit: u32,
    pub gap_limit_enforced: bool,
    /// Upper bound of the PoW nonce search
    pub max_nonce: u32,
    pub weights: WeightConstants,
}

impl WalletConfig {
    /// Load configuration from environment variables
    ///
    /// - `WALLET_NETWORK`: "mainnet" (default) or "testnet"
    /// - `NODE_URL`: node REST API endpoint
    /// - `WALLET_GAP_LIMIT`: address gap limit (default 20)
    pub fn from_env() -> Self {
        let network_str = env::var("WALLET_NETWORK")
            .unwrap_or_else(|_| "mainnet".to_string())
            .to_lowercase();

        let network = match network_str.as_str() {
            "testnet" => {
                log::info!("Using testnet network");
                NetworkParams::testnet()
            }
            "mainnet" | "" => NetworkParams::mainnet(),
            other => {
                log::warn!("Unknown network '{}', defaulting to mainnet", other);
                NetworkParams::mainnet()
            }
        };

        let node_url = env::var("NODE_URL").unwrap_or_else(|_| match network.name.as_str() {
            "testnet" => "https://node.testnet.example/v1a".to_string(),
            _ => "https://node.mainnet.example/v1a".to_string(),
        });

        let gap_limit = env::var("WALLET_GAP_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(20);

        Self {
            network,
            node_url,
            gap_limit,
            gap_limit_enforced: true,
            max_nonce: u32::MAX,
            weights: WeightConstants::default(),
        }
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            network: NetworkParams::mainnet(),
            node_url: "https://node.mainnet.example/v1a".to_string(),
            gap_limit: 20,
            gap_limit_enforced: true,
            max_nonce: u32::MAX,
            weights: WeightConstants::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_mainnet() {
        let config = WalletConfig::default();
        assert_eq!(config.network.name, "mainnet");
        assert_eq!(config.network.p2pkh_version, 0x28);
        assert_eq!(config.gap_limit, 20);
    }

    #[test]
    fn test_derivation_path() {
        let params = NetworkParams::mainnet();
        assert_eq!(params.derivation_path(), "m/44'/280'/0'/0");
    }
}
