//! LMDB environment setup and the combined ledger store.

use std::path::Path;
use std::sync::Arc;

use heed::{Env, EnvOpenOptions};

use rebase_store::{AccountRecord, AccountStore, LedgerStore, MetaStore, StoreError};
use rebase_types::Address;

use crate::account::LmdbAccountStore;
use crate::meta::LmdbMetaStore;
use crate::migration::Migrator;
use crate::LmdbError;

/// Named databases inside the environment.
const ACCOUNTS_DB: &str = "accounts";
const META_DB: &str = "meta";
const MAX_DBS: u32 = 4;

/// Default map size: 1 GiB is plenty for an account table.
pub const DEFAULT_MAP_SIZE: usize = 1 << 30;

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    env: Arc<Env>,
    store: Arc<LmdbLedgerStore>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path and bring its
    /// schema up to date.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;
        // SAFETY: the environment is opened once per path by this process and
        // never memory-mapped elsewhere while it is alive.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(MAX_DBS)
                .open(path)?
        };
        let mut wtxn = env.write_txn()?;
        let accounts_db = env.create_database(&mut wtxn, Some(ACCOUNTS_DB))?;
        let meta_db = env.create_database(&mut wtxn, Some(META_DB))?;
        wtxn.commit()?;

        let env = Arc::new(env);
        let store = Arc::new(LmdbLedgerStore {
            env: Arc::clone(&env),
            accounts: LmdbAccountStore {
                env: Arc::clone(&env),
                accounts_db,
            },
            meta: LmdbMetaStore {
                env: Arc::clone(&env),
                meta_db,
            },
        });
        Migrator::run(store.as_ref())?;
        tracing::info!(path = %path.display(), "opened LMDB ledger store");
        Ok(Self { env, store })
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    /// The ledger store backed by this environment.
    pub fn ledger_store(&self) -> Arc<LmdbLedgerStore> {
        Arc::clone(&self.store)
    }
}

/// Accounts and meta tables of one environment, usable as a [`LedgerStore`].
pub struct LmdbLedgerStore {
    env: Arc<Env>,
    accounts: LmdbAccountStore,
    meta: LmdbMetaStore,
}

impl AccountStore for LmdbLedgerStore {
    fn get_account(&self, address: &Address) -> Result<Option<AccountRecord>, StoreError> {
        self.accounts.get_account(address)
    }

    fn put_account(&self, record: &AccountRecord) -> Result<(), StoreError> {
        self.accounts.put_account(record)
    }

    fn account_count(&self) -> Result<u64, StoreError> {
        self.accounts.account_count()
    }

    fn iter_accounts(&self) -> Result<Vec<AccountRecord>, StoreError> {
        self.accounts.iter_accounts()
    }
}

impl MetaStore for LmdbLedgerStore {
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.meta.put_meta(key, value)
    }

    fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.meta.get_meta(key)
    }

    fn delete_meta(&self, key: &str) -> Result<(), StoreError> {
        self.meta.delete_meta(key)
    }
}

impl LedgerStore for LmdbLedgerStore {
    /// Single write transaction: either the whole snapshot lands or none of it.
    fn commit_snapshot(
        &self,
        meta: &[(&str, Vec<u8>)],
        accounts: &[AccountRecord],
    ) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        for (key, value) in meta {
            self.meta.put_in(&mut wtxn, key, value)?;
        }
        for record in accounts {
            self.accounts.put_in(&mut wtxn, record)?;
        }
        wtxn.commit().map_err(LmdbError::from)?;
        tracing::debug!(
            meta_entries = meta.len(),
            accounts = accounts.len(),
            "committed ledger snapshot"
        );
        Ok(())
    }
}
