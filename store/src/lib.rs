//! Abstract storage traits for the rebase token ledger.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The rest of the codebase depends only on the traits.
//!
//! Persisted layout:
//! - `accounts`: address → (principal, locked rate, last update)
//! - `meta`: global state (rate history, allowances, schema version)

pub mod account;
pub mod error;
pub mod meta;

pub use account::{AccountRecord, AccountStore};
pub use error::StoreError;
pub use meta::MetaStore;

/// Well-known keys in the meta table.
pub mod keys {
    pub const RATE_HISTORY: &str = "rate_history";
    pub const ALLOWANCES: &str = "allowances";
    pub const SCHEMA_VERSION: &str = "schema_version";
}

/// A full ledger backend: accounts plus metadata, with an atomic snapshot commit.
pub trait LedgerStore: AccountStore + MetaStore {
    /// Write a batch of meta entries and account records as one unit.
    ///
    /// The default implementation writes entry by entry; backends with real
    /// transactions override it so a crash never leaves a half-written snapshot.
    fn commit_snapshot(
        &self,
        meta: &[(&str, Vec<u8>)],
        accounts: &[AccountRecord],
    ) -> Result<(), StoreError> {
        for (key, value) in meta {
            self.put_meta(key, value)?;
        }
        for record in accounts {
            self.put_account(record)?;
        }
        Ok(())
    }
}
