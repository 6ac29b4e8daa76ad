//! Bridge errors.

use rebase_ledger::LedgerError;
use rebase_types::{Address, ChainSelector, TokenAmount};
use std::fmt;
use thiserror::Error;

/// Which way a transfer is flowing, from this pool's point of view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Outbound,
    Inbound,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Outbound => f.write_str("outbound"),
            Direction::Inbound => f.write_str("inbound"),
        }
    }
}

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("malformed pool payload: {0}")]
    MalformedPayload(String),

    #[error("unauthorized sender {0}")]
    UnauthorizedSender(Address),

    #[error("remote chain {0} is not configured")]
    UnconfiguredRemote(ChainSelector),

    #[error("{direction} rate limit for {chain} exceeded: requested {requested}, available {available}")]
    RateLimitExceeded {
        chain: ChainSelector,
        direction: Direction,
        requested: TokenAmount,
        available: TokenAmount,
    },

    #[error("sender {0} is not on the allowlist")]
    SenderNotAllowed(Address),

    #[error("receiver must not be the zero address")]
    InvalidReceiver,

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("message codec error: {0}")]
    Codec(String),

    #[error("transport error: {0}")]
    Transport(String),
}
