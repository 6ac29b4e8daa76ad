//! Token-bucket rate limiter for bridged amounts.

use rebase_types::{Timestamp, TokenAmount, U256};

use crate::config::RateLimiterConfig;

/// Limits the token amount that can cross one lane in one direction.
///
/// The bucket holds at most `capacity` and refills at `rate` per second of
/// the caller-supplied clock. It starts full.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenBucket {
    config: RateLimiterConfig,
    tokens: TokenAmount,
    last_refill: Timestamp,
}

impl TokenBucket {
    pub fn new(config: RateLimiterConfig, now: Timestamp) -> Self {
        let tokens = config.capacity;
        Self {
            config,
            tokens,
            last_refill: now,
        }
    }

    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    /// Replace the limits.
    ///
    /// A bucket that was disabled starts full under the new limits; an
    /// enabled one keeps its tokens, clamped to the new capacity.
    pub fn set_config(&mut self, config: RateLimiterConfig, now: Timestamp) {
        self.refill(now);
        self.tokens = if self.config.enabled {
            self.tokens.min(config.capacity)
        } else {
            config.capacity
        };
        self.config = config;
    }

    /// Tokens available at `now`, without consuming anything.
    pub fn available(&self, now: Timestamp) -> TokenAmount {
        if !self.config.enabled {
            return TokenAmount::MAX;
        }
        let elapsed = U256::from(self.last_refill.elapsed_since(now));
        let refill = self.config.rate.raw().saturating_mul(elapsed);
        TokenAmount::new(self.tokens.raw().saturating_add(refill)).min(self.config.capacity)
    }

    /// Take `amount` out of the bucket, or report how much was available.
    pub fn try_consume(&mut self, amount: TokenAmount, now: Timestamp) -> Result<(), TokenAmount> {
        if !self.config.enabled {
            return Ok(());
        }
        let available = self.available(now);
        let remaining = available.checked_sub(amount).ok_or(available)?;
        self.tokens = remaining;
        if now > self.last_refill {
            self.last_refill = now;
        }
        Ok(())
    }

    fn refill(&mut self, now: Timestamp) {
        if self.config.enabled {
            self.tokens = self.available(now);
        }
        if now > self.last_refill {
            self.last_refill = now;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket(capacity: u64, rate: u64) -> TokenBucket {
        TokenBucket::new(
            RateLimiterConfig::enabled(TokenAmount::from(capacity), TokenAmount::from(rate)),
            Timestamp::new(0),
        )
    }

    #[test]
    fn starts_full() {
        let b = bucket(1000, 10);
        assert_eq!(b.available(Timestamp::new(0)), TokenAmount::from(1000u64));
    }

    #[test]
    fn consume_within_budget_succeeds() {
        let mut b = bucket(1000, 10);
        assert!(b.try_consume(TokenAmount::from(600u64), Timestamp::new(0)).is_ok());
        assert_eq!(
            b.try_consume(TokenAmount::from(600u64), Timestamp::new(0)),
            Err(TokenAmount::from(400u64))
        );
    }

    #[test]
    fn refills_over_time_up_to_capacity() {
        let mut b = bucket(1000, 10);
        b.try_consume(TokenAmount::from(1000u64), Timestamp::new(0)).unwrap();
        assert_eq!(b.available(Timestamp::new(5)), TokenAmount::from(50u64));
        assert_eq!(b.available(Timestamp::new(10_000)), TokenAmount::from(1000u64));
    }

    #[test]
    fn disabled_bucket_allows_everything() {
        let mut b = TokenBucket::new(RateLimiterConfig::disabled(), Timestamp::new(0));
        assert!(b.try_consume(TokenAmount::MAX, Timestamp::new(0)).is_ok());
    }

    #[test]
    fn failed_consume_changes_nothing() {
        let mut b = bucket(100, 1);
        let before = b.clone();
        assert!(b.try_consume(TokenAmount::from(101u64), Timestamp::new(0)).is_err());
        assert_eq!(b, before);
    }

    #[test]
    fn shrinking_capacity_clamps_tokens() {
        let mut b = bucket(1000, 10);
        b.set_config(
            RateLimiterConfig::enabled(TokenAmount::from(100u64), TokenAmount::from(1u64)),
            Timestamp::new(1),
        );
        assert_eq!(b.available(Timestamp::new(1)), TokenAmount::from(100u64));
    }

    #[test]
    fn enabling_a_disabled_bucket_starts_full() {
        let mut b = TokenBucket::new(RateLimiterConfig::disabled(), Timestamp::new(0));
        b.set_config(
            RateLimiterConfig::enabled(TokenAmount::from(100u64), TokenAmount::from(1u64)),
            Timestamp::new(5),
        );
        assert_eq!(b.available(Timestamp::new(5)), TokenAmount::from(100u64));
        assert!(b.try_consume(TokenAmount::from(100u64), Timestamp::new(5)).is_ok());
        assert_eq!(
            b.try_consume(TokenAmount::from(1u64), Timestamp::new(5)),
            Err(TokenAmount::ZERO)
        );
    }
}
