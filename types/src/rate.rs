//! Per-second interest rates in fixed point.

use primitive_types::U256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::amount::decimal;
use crate::error::TypesError;

/// Fixed-point scale shared by every rate/time product (1e18).
pub const PRECISION_FACTOR: U256 = U256([1_000_000_000_000_000_000, 0, 0, 0]);

/// A per-second simple interest rate scaled by [`PRECISION_FACTOR`].
///
/// A rate of `5e10` grows a balance by `5e10 / 1e18` of its principal each
/// second, i.e. roughly 0.16% per year.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct InterestRate(U256);

impl InterestRate {
    pub const ZERO: Self = Self(U256([0, 0, 0, 0]));

    /// `5 * PRECISION_FACTOR / 1e8`, the rate a fresh deployment starts at.
    pub const DEFAULT_INITIAL: Self = Self(U256([50_000_000_000, 0, 0, 0]));

    pub fn new(raw: U256) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Fixed 32-byte big-endian encoding.
    pub fn to_be_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        self.0.to_big_endian(&mut out);
        out
    }

    pub fn from_be_bytes(bytes: &[u8; 32]) -> Self {
        Self(U256::from_big_endian(bytes))
    }
}

impl From<u64> for InterestRate {
    fn from(raw: u64) -> Self {
        Self(U256::from(raw))
    }
}

impl From<U256> for InterestRate {
    fn from(raw: U256) -> Self {
        Self(raw)
    }
}

impl FromStr for InterestRate {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decimal::parse(s).map(Self)
    }
}

impl fmt::Display for InterestRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/s", self.0)
    }
}

impl Serialize for InterestRate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        decimal::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for InterestRate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        decimal::deserialize(deserializer).map(Self)
    }
}
