//! Chain deployment configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use rebase_bridge::RemoteChainConfig;
use rebase_types::{Address, ChainSelector, InterestRate};

use crate::logging::LogFormat;
use crate::ChainError;

/// Configuration for one chain's token deployment.
///
/// Can be loaded from a TOML file via [`ChainConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Which chain this deployment lives on.
    #[serde(default = "default_chain_selector")]
    pub chain_selector: ChainSelector,

    #[serde(default = "default_chain_name")]
    pub chain_name: String,

    /// The only address allowed to change the global interest rate.
    #[serde(default = "default_owner")]
    pub owner: Address,

    /// The token contract address other chains know this token by.
    #[serde(default = "default_token_address")]
    pub token_address: Address,

    /// Custody address holding the base asset.
    #[serde(default = "default_vault_address")]
    pub vault_address: Address,

    /// The pool's own ledger account.
    #[serde(default = "default_pool_address")]
    pub pool_address: Address,

    /// The router allowed to drive the pool.
    #[serde(default = "default_router_address")]
    pub router_address: Address,

    /// Global rate at genesis, per second, scaled by 1e18.
    #[serde(default = "default_initial_interest_rate")]
    pub initial_interest_rate: InterestRate,

    /// Data directory for ledger storage.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Counterpart chains the pool may bridge to and from.
    #[serde(default)]
    pub remotes: Vec<RemoteChainConfig>,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_chain_selector() -> ChainSelector {
    ChainSelector::SEPOLIA
}

fn default_chain_name() -> String {
    "sepolia".to_string()
}

fn default_owner() -> Address {
    Address::from_low_u64_be(0x0100)
}

fn default_token_address() -> Address {
    Address::from_low_u64_be(0x0200)
}

fn default_vault_address() -> Address {
    Address::from_low_u64_be(0x0300)
}

fn default_pool_address() -> Address {
    Address::from_low_u64_be(0x0400)
}

fn default_router_address() -> Address {
    Address::from_low_u64_be(0x0500)
}

fn default_initial_interest_rate() -> InterestRate {
    InterestRate::DEFAULT_INITIAL
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./rebase_data")
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl ChainConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ChainError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ChainError::Config(format!("{}: {e}", path.as_ref().display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ChainError> {
        let config: Self = toml::from_str(s).map_err(|e| ChainError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, ChainError> {
        toml::to_string_pretty(self).map_err(|e| ChainError::Config(e.to_string()))
    }

    pub fn log_format(&self) -> Result<LogFormat, ChainError> {
        self.log_format.parse()
    }

    /// Reject configurations no deployment could run with.
    pub fn validate(&self) -> Result<(), ChainError> {
        if self.pool_address == self.vault_address {
            return Err(ChainError::Config(
                "pool and vault must use different addresses".to_string(),
            ));
        }
        for remote in &self.remotes {
            if remote.remote_chain == self.chain_selector {
                return Err(ChainError::Config(format!(
                    "{} cannot be its own remote",
                    self.chain_selector
                )));
            }
        }
        self.log_format()?;
        Ok(())
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_selector: default_chain_selector(),
            chain_name: default_chain_name(),
            owner: default_owner(),
            token_address: default_token_address(),
            vault_address: default_vault_address(),
            pool_address: default_pool_address(),
            router_address: default_router_address(),
            initial_interest_rate: default_initial_interest_rate(),
            data_dir: default_data_dir(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            remotes: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rebase_bridge::RateLimiterConfig;
    use rebase_types::TokenAmount;

    #[test]
    fn default_config_round_trips_through_toml() {
        let mut config = ChainConfig::default();
        config.remotes.push(RemoteChainConfig {
            remote_chain: ChainSelector::ARBITRUM_SEPOLIA,
            remote_pools: vec![Address::from_low_u64_be(0x0401)],
            remote_token: Address::from_low_u64_be(0x0201),
            outbound_rate_limit: RateLimiterConfig::enabled(
                TokenAmount::from(1_000_000u64),
                TokenAmount::from(10u64),
            ),
            inbound_rate_limit: RateLimiterConfig::disabled(),
        });
        let toml_str = config.to_toml_string().unwrap();
        let parsed = ChainConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed, config);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = ChainConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.chain_selector, ChainSelector::SEPOLIA);
        assert_eq!(config.initial_interest_rate, InterestRate::DEFAULT_INITIAL);
        assert_eq!(config.log_format, "human");
        assert!(config.remotes.is_empty());
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            chain_selector = "3478487238524512106"
            chain_name = "arbitrum-sepolia"
            initial_interest_rate = "40000000000"
            owner = "0x00000000000000000000000000000000000000aa"

            [[remotes]]
            remote_chain = "16015286601757825753"
            remote_pools = ["0x0000000000000000000000000000000000000401"]
        "#;
        let config = ChainConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.chain_selector, ChainSelector::ARBITRUM_SEPOLIA);
        assert_eq!(config.initial_interest_rate, InterestRate::from(40_000_000_000u64));
        assert_eq!(config.owner, Address::from_low_u64_be(0xaa));
        assert_eq!(config.remotes[0].remote_chain, ChainSelector::SEPOLIA);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn self_remote_is_rejected() {
        let toml = r#"
            chain_selector = 5
            [[remotes]]
            remote_chain = 5
        "#;
        assert!(matches!(
            ChainConfig::from_toml_str(toml),
            Err(ChainError::Config(_))
        ));
    }

    #[test]
    fn unknown_log_format_is_rejected() {
        assert!(ChainConfig::from_toml_str(r#"log_format = "xml""#).is_err());
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = ChainConfig::from_toml_file("/nonexistent/rebase.toml");
        assert!(matches!(result, Err(ChainError::Config(_))));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chain.toml");
        std::fs::write(&path, "chain_name = \"local\"\n").unwrap();
        let config = ChainConfig::from_toml_file(&path).unwrap();
        assert_eq!(config.chain_name, "local");
    }
}
