//! Custody vault for the rebase token.
//!
//! Holds the base asset that backs the token. Deposits mint ledger credits at
//! the current global rate; redemptions burn ledger balance and pay the base
//! asset back out. Rewards enter as base asset with no matching credit, which
//! is what lets redeemers draw more than they put in.

pub mod asset;
pub mod error;
pub mod events;
pub mod vault;

pub use asset::{AssetError, BaseAsset, InMemoryAsset};
pub use error::VaultError;
pub use events::VaultEvent;
pub use vault::Vault;
