//! Rebase ledger: the accrual engine behind the interest-bearing token.
//!
//! Each account's displayed balance is its principal grown by simple
//! interest at a rate locked in when the account was first funded:
//! `balance = principal × (1e18 + locked_rate × (now − last_update)) / 1e18`.
//!
//! This crate handles:
//! - Lazy materialization of accrued interest into principal
//! - Credits (mint), debits (burn) and same-chain transfers
//! - The non-increasing global rate and its history
//! - Allowances for delegated transfers
//! - Snapshots to and from a [`rebase_store::LedgerStore`]

pub mod engine;
pub mod error;
pub mod events;
pub mod state;

pub use engine::AccrualLedger;
pub use error::LedgerError;
pub use events::{EventBus, LedgerEvent};
pub use state::{AccountState, RateHistory, RateSegment};
