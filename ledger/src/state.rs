//! Per-account accrual state and the global rate history.

use crate::error::LedgerError;
use rebase_types::{InterestRate, Timestamp, TokenAmount, PRECISION_FACTOR, U256};
use serde::{Deserialize, Serialize};

/// A period during which one global rate was offered to new deposits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateSegment {
    /// The rate (fixed point, per second) offered during this segment.
    pub rate: InterestRate,
    /// When this rate became the global rate.
    pub start: Timestamp,
    /// When this rate was replaced (None if still current).
    pub end: Option<Timestamp>,
}

/// The global current rate as a versioned value.
///
/// Each accepted change closes the current segment and appends one new
/// segment. The setter refuses increases, so rates along the history are
/// non-increasing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateHistory {
    segments: Vec<RateSegment>,
}

impl RateHistory {
    pub fn new(initial_rate: InterestRate, genesis: Timestamp) -> Self {
        Self {
            segments: vec![RateSegment {
                rate: initial_rate,
                start: genesis,
                end: None,
            }],
        }
    }

    /// Replace the current rate, returning the rate it replaced.
    ///
    /// Fails with `RateIncreaseRejected` if `new_rate` exceeds the current
    /// rate, and with `InvalidTimestamp` if `change_at` precedes the start of
    /// the current segment. Either failure leaves the history untouched.
    pub fn apply_rate_change(
        &mut self,
        new_rate: InterestRate,
        change_at: Timestamp,
    ) -> Result<InterestRate, LedgerError> {
        let current = self.current_segment();
        if new_rate > current.rate {
            return Err(LedgerError::RateIncreaseRejected {
                current: current.rate,
                requested: new_rate,
            });
        }
        if change_at < current.start {
            return Err(LedgerError::InvalidTimestamp);
        }
        let previous = current.rate;
        if let Some(last) = self.segments.last_mut() {
            last.end = Some(change_at);
        }
        self.segments.push(RateSegment {
            rate: new_rate,
            start: change_at,
            end: None,
        });
        Ok(previous)
    }

    pub fn current_rate(&self) -> InterestRate {
        self.current_segment().rate
    }

    /// Number of accepted rate changes since genesis.
    pub fn version(&self) -> u64 {
        (self.segments.len() as u64).saturating_sub(1)
    }

    pub fn segments(&self) -> &[RateSegment] {
        &self.segments
    }

    fn current_segment(&self) -> &RateSegment {
        // `new` and deserialization both produce at least one segment; an
        // empty history can only come from corrupted storage.
        static EMPTY: RateSegment = RateSegment {
            rate: InterestRate::ZERO,
            start: Timestamp::EPOCH,
            end: None,
        };
        self.segments.last().unwrap_or(&EMPTY)
    }
}

impl Default for RateHistory {
    fn default() -> Self {
        Self::new(InterestRate::DEFAULT_INITIAL, Timestamp::EPOCH)
    }
}

/// Accrual state of one account.
///
/// `principal` only changes through explicit credits, debits and
/// materialization; the displayed balance is computed from it on demand.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    pub principal: TokenAmount,
    pub locked_rate: InterestRate,
    pub last_update: Timestamp,
}

impl AccountState {
    /// A fresh, unfunded account.
    pub fn new(now: Timestamp) -> Self {
        Self {
            principal: TokenAmount::ZERO,
            locked_rate: InterestRate::ZERO,
            last_update: now,
        }
    }

    /// `PRECISION_FACTOR + locked_rate × (now − last_update)`.
    pub fn accrual_factor_checked(&self, now: Timestamp) -> Option<U256> {
        let elapsed = U256::from(self.last_update.elapsed_since(now));
        let growth = self.locked_rate.raw().checked_mul(elapsed)?;
        PRECISION_FACTOR.checked_add(growth)
    }

    /// `principal × accrual_factor / PRECISION_FACTOR`, multiplied before dividing.
    pub fn materialized_balance_checked(&self, now: Timestamp) -> Option<TokenAmount> {
        let factor = self.accrual_factor_checked(now)?;
        let scaled = self.principal.raw().checked_mul(factor)?;
        Some(TokenAmount::new(scaled / PRECISION_FACTOR))
    }

    /// Interest accrued since `last_update` that is not yet part of `principal`.
    pub fn pending_interest_checked(&self, now: Timestamp) -> Option<TokenAmount> {
        self.materialized_balance_checked(now)?
            .checked_sub(self.principal)
    }

    /// Fold pending interest into `principal` and move `last_update` to `now`.
    ///
    /// Returns the amount materialized. Calling it twice at the same
    /// timestamp materializes nothing the second time.
    pub fn materialize(&mut self, now: Timestamp) -> Result<TokenAmount, LedgerError> {
        let delta = self
            .pending_interest_checked(now)
            .ok_or(LedgerError::Overflow)?;
        self.principal = self
            .principal
            .checked_add(delta)
            .ok_or(LedgerError::Overflow)?;
        if now > self.last_update {
            self.last_update = now;
        }
        Ok(delta)
    }
}
