//! Pool events.

use rebase_types::{Address, ChainSelector, InterestRate, TokenAmount};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PoolEvent {
    /// Tokens left this chain.
    Burned {
        sender: Address,
        remote_chain: ChainSelector,
        amount: TokenAmount,
        rate: InterestRate,
    },
    /// Tokens arrived on this chain.
    Minted {
        receiver: Address,
        source_chain: ChainSelector,
        amount: TokenAmount,
        rate: InterestRate,
    },
    ChainAdded(ChainSelector),
    ChainRemoved(ChainSelector),
}
