//! Nullable store: thread-safe in-memory ledger storage for testing.

use rebase_store::{AccountRecord, AccountStore, LedgerStore, MetaStore, StoreError};
use rebase_types::Address;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// An in-memory accounts + meta store.
///
/// `fail_writes` makes every subsequent write return a backend error so
/// callers' error paths can be exercised.
pub struct NullLedgerStore {
    accounts: Mutex<HashMap<Address, AccountRecord>>,
    meta: Mutex<HashMap<String, Vec<u8>>>,
    failing: AtomicBool,
}

impl NullLedgerStore {
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            meta: Mutex::new(HashMap::new()),
            failing: AtomicBool::new(false),
        }
    }

    /// Make all writes fail from now on (or succeed again with `false`).
    pub fn fail_writes(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StoreError::Backend("null store: writes disabled".into()))
        } else {
            Ok(())
        }
    }
}

impl Default for NullLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountStore for NullLedgerStore {
    fn get_account(&self, address: &Address) -> Result<Option<AccountRecord>, StoreError> {
        Ok(self.accounts.lock().unwrap().get(address).cloned())
    }

    fn put_account(&self, record: &AccountRecord) -> Result<(), StoreError> {
        self.check_writable()?;
        self.accounts
            .lock()
            .unwrap()
            .insert(record.address, record.clone());
        Ok(())
    }

    fn account_count(&self) -> Result<u64, StoreError> {
        Ok(self.accounts.lock().unwrap().len() as u64)
    }

    fn iter_accounts(&self) -> Result<Vec<AccountRecord>, StoreError> {
        Ok(self.accounts.lock().unwrap().values().cloned().collect())
    }
}

impl MetaStore for NullLedgerStore {
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.check_writable()?;
        self.meta
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.meta.lock().unwrap().get(key).cloned())
    }

    fn delete_meta(&self, key: &str) -> Result<(), StoreError> {
        self.check_writable()?;
        self.meta.lock().unwrap().remove(key);
        Ok(())
    }
}

impl LedgerStore for NullLedgerStore {
    fn commit_snapshot(
        &self,
        meta: &[(&str, Vec<u8>)],
        accounts: &[AccountRecord],
    ) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut meta_table = self.meta.lock().unwrap();
        let mut account_table = self.accounts.lock().unwrap();
        for (key, value) in meta {
            meta_table.insert((*key).to_string(), value.clone());
        }
        for record in accounts {
            account_table.insert(record.address, record.clone());
        }
        Ok(())
    }
}
