//! LMDB storage backend for the rebase token ledger.
//!
//! Implements the storage traits from `rebase-store` using the `heed` LMDB
//! bindings. Each logical table maps to one named database within a single
//! environment.

pub mod account;
pub mod environment;
pub mod error;
pub mod meta;
pub mod migration;

pub use environment::{LmdbEnvironment, LmdbLedgerStore, DEFAULT_MAP_SIZE};
pub use error::LmdbError;
pub use migration::{Migrator, CURRENT_SCHEMA_VERSION};
