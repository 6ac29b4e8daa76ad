//! Cross-chain bridging for the rebase token.
//!
//! A [`TokenPool`] sits on every chain. Outbound, it burns the transferred
//! amount from its own ledger account and emits a payload carrying the
//! amount and the sender's locked rate. Inbound, it decodes that payload and
//! credits the receiver at the carried rate, so the rate survives the trip.
//!
//! Messages travel between pools through a [`Transport`], which this crate
//! only models: [`LocalTransport`] is an in-process, at-least-once bus.

pub mod config;
pub mod error;
pub mod events;
pub mod payload;
pub mod pool;
pub mod rate_limiter;
pub mod transport;

pub use config::{RateLimiterConfig, RemoteChainConfig};
pub use error::{BridgeError, Direction};
pub use events::PoolEvent;
pub use payload::PoolPayload;
pub use pool::{LockOrBurnIn, LockOrBurnOut, ReleaseOrMintIn, ReleaseOrMintOut, TokenPool};
pub use rate_limiter::TokenBucket;
pub use transport::{CrossChainMessage, LocalTransport, Transport};
