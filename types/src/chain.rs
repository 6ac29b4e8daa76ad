//! Chain selector.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Identifies one chain (and therefore one independent ledger) in a
/// multi-chain deployment.
///
/// Selectors use the full `u64` range, which TOML integers cannot hold, so
/// they serialize as decimal strings. Plain integers are accepted on read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChainSelector(u64);

impl ChainSelector {
    /// Ethereum Sepolia.
    pub const SEPOLIA: Self = Self(16_015_286_601_757_825_753);
    /// Arbitrum Sepolia.
    pub const ARBITRUM_SEPOLIA: Self = Self(3_478_487_238_524_512_106);

    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ChainSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chain:{}", self.0)
    }
}

impl Serialize for ChainSelector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for ChainSelector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_str(SelectorVisitor)
    }
}

struct SelectorVisitor;

impl<'de> Visitor<'de> for SelectorVisitor {
    type Value = ChainSelector;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a chain selector (decimal string or integer)")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<ChainSelector, E> {
        v.trim()
            .replace('_', "")
            .parse::<u64>()
            .map(ChainSelector)
            .map_err(|e| E::custom(format!("invalid chain selector {v}: {e}")))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<ChainSelector, E> {
        Ok(ChainSelector(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<ChainSelector, E> {
        u64::try_from(v)
            .map(ChainSelector)
            .map_err(|_| E::custom(format!("negative chain selector {v}")))
    }
}
