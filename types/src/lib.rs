//! Fundamental types for the rebase token protocol.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! addresses, token amounts, interest rates, timestamps, chain selectors and message ids.

pub mod address;
pub mod amount;
pub mod chain;
pub mod error;
pub mod hash;
pub mod rate;
pub mod time;

pub use address::Address;
pub use amount::TokenAmount;
pub use chain::ChainSelector;
pub use error::TypesError;
pub use hash::MessageId;
pub use rate::{InterestRate, PRECISION_FACTOR};
pub use time::{Clock, SystemClock, Timestamp};

/// Re-exported so downstream crates name the same 256-bit integer.
pub use primitive_types::U256;
