//! A single chain's rebase token deployment.
//!
//! Wires one [`rebase_ledger::AccrualLedger`], one [`rebase_vault::Vault`]
//! and one [`rebase_bridge::TokenPool`] together behind one lock and exposes
//! the user-facing token surface: deposit, redeem, transfer, balance and
//! rate queries, and cross-chain send/receive.

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::ChainConfig;
pub use error::ChainError;
pub use logging::{init_logging, LogFormat};
pub use runtime::Chain;
