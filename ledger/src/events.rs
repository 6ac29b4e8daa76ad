//! Events emitted after ledger operations commit.

use rebase_types::{Address, InterestRate, Timestamp, TokenAmount};

/// Ledger-level events that observers can subscribe to via the [`EventBus`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerEvent {
    /// The global rate offered to new deposits changed.
    InterestRateSet {
        previous: InterestRate,
        new: InterestRate,
        at: Timestamp,
    },
    /// Accrued interest was folded into an account's principal.
    InterestMaterialized {
        account: Address,
        amount: TokenAmount,
    },
    /// Tokens were issued to an account.
    Credited {
        account: Address,
        amount: TokenAmount,
        /// The account's locked rate after the credit.
        locked_rate: InterestRate,
    },
    /// Tokens were burned from an account.
    Debited {
        account: Address,
        amount: TokenAmount,
    },
    /// Tokens moved between two accounts on the same chain.
    Transferred {
        from: Address,
        to: Address,
        amount: TokenAmount,
    },
    /// A spender allowance was set.
    Approval {
        owner: Address,
        spender: Address,
        amount: TokenAmount,
    },
}

type Listener<E> = Box<dyn Fn(&E) + Send + Sync>;

/// Synchronous fan-out event bus.
///
/// Listeners are invoked inline on the emitting thread, after the state
/// change they describe has been applied.
pub struct EventBus<E> {
    listeners: Vec<Listener<E>>,
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    pub fn emit(&self, event: &E) {
        for listener in &self.listeners {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}
