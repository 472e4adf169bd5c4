//! Node configuration
//!
//! Defaults keep the store in the working directory and wallets under the
//! user's home directory; environment variables override, CLI flags win
//! over both.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Environment override for the chain data directory
pub const DATA_DIR_ENV: &str = "LEDGER_DATA_DIR";
/// Environment override for the wallet directory
pub const WALLET_DIR_ENV: &str = "LEDGER_WALLET_DIR";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Directory holding the chain store
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory holding wallet files
    #[serde(default = "default_wallet_dir")]
    pub wallet_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("ledger-db")
}

fn default_wallet_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".ledger-wallets")
}

impl Default for NodeConfig {
    fn default() -> Self {
        NodeConfig {
            data_dir: default_data_dir(),
            wallet_dir: default_wallet_dir(),
        }
    }
}

impl NodeConfig {
    /// Defaults with environment overrides applied
    pub fn from_env() -> NodeConfig {
        let mut config = NodeConfig::default();
        if let Some(dir) = std::env::var_os(DATA_DIR_ENV) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = std::env::var_os(WALLET_DIR_ENV) {
            config.wallet_dir = PathBuf::from(dir);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = NodeConfig::default();
        assert_eq!(config.data_dir, PathBuf::from("ledger-db"));
        assert!(config.wallet_dir.ends_with(".ledger-wallets"));
    }

    #[test]
    fn test_serde_defaults_fill_missing_fields() {
        let config: NodeConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, NodeConfig::default());
    }
}
