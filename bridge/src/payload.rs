//! The pool payload carried alongside every cross-chain transfer.
//!
//! Wire layout, 64 bytes, big-endian:
//!
//! ```text
//! 0..32   amount  (uint256)
//! 32..64  rate    (uint256, the sender's locked rate)
//! ```

use rebase_types::{InterestRate, TokenAmount};

use crate::error::BridgeError;

/// Encoded payload length.
pub const PAYLOAD_LEN: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolPayload {
    pub amount: TokenAmount,
    pub rate: InterestRate,
}

impl PoolPayload {
    pub fn new(amount: TokenAmount, rate: InterestRate) -> Self {
        Self { amount, rate }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(PAYLOAD_LEN);
        out.extend_from_slice(&self.amount.to_be_bytes());
        out.extend_from_slice(&self.rate.to_be_bytes());
        out
    }

    /// Decode a payload, rejecting anything that is not exactly 64 bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, BridgeError> {
        if bytes.len() != PAYLOAD_LEN {
            return Err(BridgeError::MalformedPayload(format!(
                "expected {PAYLOAD_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        let mut amount = [0u8; 32];
        let mut rate = [0u8; 32];
        amount.copy_from_slice(&bytes[..32]);
        rate.copy_from_slice(&bytes[32..]);
        Ok(Self {
            amount: TokenAmount::from_be_bytes(&amount),
            rate: InterestRate::from_be_bytes(&rate),
        })
    }
}
