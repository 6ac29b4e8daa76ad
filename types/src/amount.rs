//! Token amount type.
//!
//! Amounts are 256-bit unsigned integers in the token's smallest unit (18
//! decimals by convention). `TokenAmount::MAX` doubles as the "everything"
//! sentinel accepted by redeem, transfer and burn.

use primitive_types::U256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::TypesError;

/// An amount of rebase tokens (or of the base asset held in custody).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TokenAmount(U256);

impl TokenAmount {
    pub const ZERO: Self = Self(U256([0, 0, 0, 0]));

    /// The largest representable amount; callers pass it to mean "my whole balance".
    pub const MAX: Self = Self(U256::MAX);

    pub fn new(raw: U256) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Whether this is the "whole balance" sentinel.
    pub fn is_max(&self) -> bool {
        self.0 == U256::MAX
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
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

impl From<u64> for TokenAmount {
    fn from(raw: u64) -> Self {
        Self(U256::from(raw))
    }
}

impl From<u128> for TokenAmount {
    fn from(raw: u128) -> Self {
        Self(U256::from(raw))
    }
}

impl From<U256> for TokenAmount {
    fn from(raw: U256) -> Self {
        Self(raw)
    }
}

impl FromStr for TokenAmount {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decimal::parse(s).map(Self)
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for TokenAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        decimal::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for TokenAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        decimal::deserialize(deserializer).map(Self)
    }
}

/// Decimal-string serde for 256-bit values.
///
/// Values are written as decimal strings; integers are accepted on read so
/// small values can be written bare in TOML.
pub(crate) mod decimal {
    use primitive_types::U256;
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    use crate::error::TypesError;

    pub fn parse(s: &str) -> Result<U256, TypesError> {
        let trimmed = s.trim().replace('_', "");
        if trimmed.is_empty() {
            return Err(TypesError::InvalidDecimal(s.to_string()));
        }
        U256::from_dec_str(&trimmed).map_err(|e| TypesError::InvalidDecimal(format!("{s}: {e:?}")))
    }

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        deserializer.deserialize_str(DecimalVisitor)
    }

    struct DecimalVisitor;

    impl<'de> Visitor<'de> for DecimalVisitor {
        type Value = U256;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a non-negative decimal integer (string or number)")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<U256, E> {
            parse(v).map_err(E::custom)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<U256, E> {
            Ok(U256::from(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<U256, E> {
            u64::try_from(v)
                .map(U256::from)
                .map_err(|_| E::custom(format!("negative value {v}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_is_the_sentinel() {
        assert!(TokenAmount::MAX.is_max());
        assert!(!TokenAmount::from(1u64).is_max());
    }

    #[test]
    fn checked_arithmetic() {
        let a = TokenAmount::from(10u64);
        let b = TokenAmount::from(3u64);
        assert_eq!(a.checked_sub(b), Some(TokenAmount::from(7u64)));
        assert_eq!(b.checked_sub(a), None);
        assert_eq!(TokenAmount::MAX.checked_add(b), None);
        assert_eq!(b.saturating_sub(a), TokenAmount::ZERO);
    }

    #[test]
    fn big_endian_encoding() {
        let amount = TokenAmount::from(0x0102u64);
        let bytes = amount.to_be_bytes();
        assert_eq!(bytes[30], 0x01);
        assert_eq!(bytes[31], 0x02);
        assert_eq!(TokenAmount::from_be_bytes(&bytes), amount);
    }

    #[test]
    fn parses_decimal_with_separators() {
        let amount: TokenAmount = "1_000_000".parse().unwrap();
        assert_eq!(amount, TokenAmount::from(1_000_000u64));
        assert!("".parse::<TokenAmount>().is_err());
        assert!("12a".parse::<TokenAmount>().is_err());
    }

    #[test]
    fn serializes_as_decimal_string() {
        let amount = TokenAmount::from(100_000u64);
        assert_eq!(serde_json::to_string(&amount).unwrap(), "\"100000\"");
        let back: TokenAmount = serde_json::from_str("\"100000\"").unwrap();
        assert_eq!(back, amount);
    }

    #[test]
    fn survives_bincode() {
        let amount = TokenAmount::MAX;
        let bytes = bincode::serialize(&amount).unwrap();
        let back: TokenAmount = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, amount);
    }
}
