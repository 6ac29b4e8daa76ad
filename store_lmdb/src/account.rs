//! LMDB implementation of AccountStore.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, RwTxn};

use rebase_store::{AccountRecord, AccountStore, StoreError};
use rebase_types::Address;

use crate::LmdbError;

pub struct LmdbAccountStore {
    pub(crate) env: Arc<Env>,
    pub(crate) accounts_db: Database<Bytes, Bytes>,
}

impl LmdbAccountStore {
    /// Write one record inside a caller-owned transaction.
    pub(crate) fn put_in(&self, wtxn: &mut RwTxn<'_>, record: &AccountRecord) -> Result<(), LmdbError> {
        let bytes = bincode::serialize(record)?;
        self.accounts_db
            .put(wtxn, record.address.as_bytes(), &bytes)?;
        Ok(())
    }
}

impl AccountStore for LmdbAccountStore {
    fn get_account(&self, address: &Address) -> Result<Option<AccountRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        match self
            .accounts_db
            .get(&rtxn, address.as_bytes())
            .map_err(LmdbError::from)?
        {
            Some(bytes) => {
                let record: AccountRecord = bincode::deserialize(bytes).map_err(LmdbError::from)?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    fn put_account(&self, record: &AccountRecord) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.put_in(&mut wtxn, record)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn account_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let count = self.accounts_db.len(&rtxn).map_err(LmdbError::from)?;
        Ok(count)
    }

    fn iter_accounts(&self) -> Result<Vec<AccountRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let mut records = Vec::new();
        let iter = self.accounts_db.iter(&rtxn).map_err(LmdbError::from)?;
        for result in iter {
            let (key, val) = result.map_err(LmdbError::from)?;
            let record: AccountRecord = bincode::deserialize(val).map_err(LmdbError::from)?;
            if record.address.as_bytes().as_slice() != key {
                return Err(StoreError::Corruption(format!(
                    "account row keyed by 0x{} holds {}",
                    key.iter().map(|b| format!("{:02x}", b)).collect::<String>(),
                    record.address
                )));
            }
            records.push(record);
        }
        Ok(records)
    }
}
