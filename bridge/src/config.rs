//! Remote chain configuration for a token pool.

use rebase_types::{Address, ChainSelector, TokenAmount};
use serde::{Deserialize, Serialize};

/// Token-bucket parameters for one direction of one lane.
///
/// Disabled limiters let everything through.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimiterConfig {
    pub enabled: bool,
    /// Largest amount the bucket can hold.
    pub capacity: TokenAmount,
    /// Tokens added back per second.
    pub rate: TokenAmount,
}

impl RateLimiterConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            capacity: TokenAmount::ZERO,
            rate: TokenAmount::ZERO,
        }
    }

    pub fn enabled(capacity: TokenAmount, rate: TokenAmount) -> Self {
        Self {
            enabled: true,
            capacity,
            rate,
        }
    }
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Everything a pool needs to know about one counterpart chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteChainConfig {
    pub remote_chain: ChainSelector,
    /// Pools on the remote chain allowed to send to this one.
    #[serde(default)]
    pub remote_pools: Vec<Address>,
    /// Token contract on the remote chain.
    #[serde(default)]
    pub remote_token: Address,
    #[serde(default)]
    pub outbound_rate_limit: RateLimiterConfig,
    #[serde(default)]
    pub inbound_rate_limit: RateLimiterConfig,
}

impl RemoteChainConfig {
    /// A lane to `remote_chain` with no rate limits.
    pub fn new(remote_chain: ChainSelector, remote_pool: Address, remote_token: Address) -> Self {
        Self {
            remote_chain,
            remote_pools: vec![remote_pool],
            remote_token,
            outbound_rate_limit: RateLimiterConfig::disabled(),
            inbound_rate_limit: RateLimiterConfig::disabled(),
        }
    }

    pub fn is_remote_pool(&self, pool: &Address) -> bool {
        self.remote_pools.contains(pool)
    }
}
