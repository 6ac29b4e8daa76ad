//! Account storage trait.

use crate::StoreError;
use rebase_types::{Address, InterestRate, Timestamp, TokenAmount};
use serde::{Deserialize, Serialize};

/// Per-account row of the accounts table.
///
/// Rows are created on first credit and never deleted; a drained account
/// keeps its row at zero principal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub address: Address,
    /// Tokens actually issued to the account, excluding unmaterialized interest.
    pub principal: TokenAmount,
    /// Rate applied to this account's future accrual.
    pub locked_rate: InterestRate,
    /// When interest was last materialized into `principal`.
    pub last_update: Timestamp,
}

/// Trait for account storage operations.
pub trait AccountStore {
    fn get_account(&self, address: &Address) -> Result<Option<AccountRecord>, StoreError>;
    fn put_account(&self, record: &AccountRecord) -> Result<(), StoreError>;
    fn account_count(&self) -> Result<u64, StoreError>;
    fn iter_accounts(&self) -> Result<Vec<AccountRecord>, StoreError>;

    fn exists(&self, address: &Address) -> Result<bool, StoreError> {
        self.get_account(address).map(|r| r.is_some())
    }
}
