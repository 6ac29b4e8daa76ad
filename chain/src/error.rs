use rebase_types::{Address, ChainSelector};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("ledger error: {0}")]
    Ledger(#[from] rebase_ledger::LedgerError),

    #[error("vault error: {0}")]
    Vault(#[from] rebase_vault::VaultError),

    #[error("bridge error: {0}")]
    Bridge(#[from] rebase_bridge::BridgeError),

    #[error("store error: {0}")]
    Store(#[from] rebase_store::StoreError),

    #[error("LMDB error: {0}")]
    Lmdb(#[from] rebase_store_lmdb::LmdbError),

    #[error("{0} is not the owner")]
    NotOwner(Address),

    #[error("message for {actual} delivered to {expected}")]
    WrongDestination {
        expected: ChainSelector,
        actual: ChainSelector,
    },

    #[error("config error: {0}")]
    Config(String),
}
