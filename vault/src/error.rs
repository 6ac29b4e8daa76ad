//! Vault errors.

use crate::asset::AssetError;
use rebase_ledger::LedgerError;
use rebase_types::TokenAmount;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Releasing base asset to the redeemer failed; the burn was rolled back.
    #[error("redeem of {amount} failed to release base asset: {reason}")]
    RedeemTransferFailed { amount: TokenAmount, reason: String },

    #[error("base asset error: {0}")]
    Asset(#[from] AssetError),

    #[error("amount must be non-zero")]
    ZeroAmount,
}
