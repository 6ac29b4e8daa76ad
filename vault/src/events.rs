//! Vault events.

use rebase_types::{Address, InterestRate, TokenAmount};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VaultEvent {
    Deposited {
        account: Address,
        amount: TokenAmount,
        /// The account's locked rate after the deposit.
        locked_rate: InterestRate,
    },
    Redeemed {
        account: Address,
        amount: TokenAmount,
    },
    RewardsInjected {
        from: Address,
        amount: TokenAmount,
    },
}
