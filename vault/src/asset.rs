//! The base asset held in custody.

use std::collections::{HashMap, HashSet};

use rebase_types::{Address, TokenAmount};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssetError {
    #[error("insufficient base asset at {holder}: need {needed}, have {available}")]
    InsufficientFunds {
        holder: Address,
        needed: TokenAmount,
        available: TokenAmount,
    },

    #[error("recipient {0} rejected the transfer")]
    Rejected(Address),

    #[error("base asset balance overflow")]
    Overflow,
}

/// The asset that backs the token (native coin, wrapped coin, ...).
///
/// Its mechanics are external to this system; the vault only needs to move
/// it between holders and read balances. A transfer may fail, and a failed
/// transfer must leave every balance unchanged.
pub trait BaseAsset: Send {
    fn balance_of(&self, holder: &Address) -> TokenAmount;

    fn transfer(
        &mut self,
        from: &Address,
        to: &Address,
        amount: TokenAmount,
    ) -> Result<(), AssetError>;
}

/// In-process base asset: a balance map plus recipients that refuse funds.
#[derive(Clone, Debug, Default)]
pub struct InMemoryAsset {
    balances: HashMap<Address, TokenAmount>,
    rejecting: HashSet<Address>,
}

impl InMemoryAsset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create base asset out of thin air for `holder`.
    pub fn fund(&mut self, holder: Address, amount: TokenAmount) {
        let balance = self.balances.entry(holder).or_insert(TokenAmount::ZERO);
        *balance = balance.saturating_add(amount);
    }

    /// Make `holder` refuse (or accept again) incoming transfers.
    pub fn set_rejecting(&mut self, holder: Address, rejecting: bool) {
        if rejecting {
            self.rejecting.insert(holder);
        } else {
            self.rejecting.remove(&holder);
        }
    }
}

impl BaseAsset for InMemoryAsset {
    fn balance_of(&self, holder: &Address) -> TokenAmount {
        self.balances.get(holder).copied().unwrap_or(TokenAmount::ZERO)
    }

    fn transfer(
        &mut self,
        from: &Address,
        to: &Address,
        amount: TokenAmount,
    ) -> Result<(), AssetError> {
        if self.rejecting.contains(to) {
            return Err(AssetError::Rejected(*to));
        }
        let available = self.balance_of(from);
        let new_from = available
            .checked_sub(amount)
            .ok_or(AssetError::InsufficientFunds {
                holder: *from,
                needed: amount,
                available,
            })?;
        if from == to {
            return Ok(());
        }
        let new_to = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(AssetError::Overflow)?;
        self.balances.insert(*from, new_from);
        self.balances.insert(*to, new_to);
        Ok(())
    }
}
