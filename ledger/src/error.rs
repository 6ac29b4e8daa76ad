//! Ledger errors.

use rebase_types::{InterestRate, TokenAmount};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("interest rate can only decrease: current {current}, requested {requested}")]
    RateIncreaseRejected {
        current: InterestRate,
        requested: InterestRate,
    },

    #[error("insufficient balance: need {needed}, available {available}")]
    InsufficientBalance {
        needed: TokenAmount,
        available: TokenAmount,
    },

    #[error("insufficient allowance: need {needed}, allowed {allowed}")]
    InsufficientAllowance {
        needed: TokenAmount,
        allowed: TokenAmount,
    },

    #[error("rate change timestamp must not precede the current rate's start")]
    InvalidTimestamp,

    #[error("arithmetic overflow in accrual computation")]
    Overflow,

    #[error("store error: {0}")]
    Store(#[from] rebase_store::StoreError),

    #[error("serialization error: {0}")]
    Serialization(String),
}
