//! Cross-chain message envelope and transports.
//!
//! The envelope is what the transport moves between chains; the pool
//! payload rides inside it as opaque bytes. Envelopes are bincode-encoded
//! and identified by a Blake2b-256 hash over their contents.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use rebase_types::{Address, ChainSelector, MessageId, TokenAmount};
use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

type Blake2b256 = Blake2b<U32>;

/// One cross-chain token transfer in flight.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossChainMessage {
    pub id: MessageId,
    /// Per-lane counter assigned by the sending chain.
    pub sequence: u64,
    pub source_chain: ChainSelector,
    pub dest_chain: ChainSelector,
    pub original_sender: Address,
    pub receiver: Address,
    pub source_pool: Address,
    pub dest_token: Address,
    pub amount: TokenAmount,
    pub pool_data: Vec<u8>,
}

impl CrossChainMessage {
    /// Build a message and stamp its id.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sequence: u64,
        source_chain: ChainSelector,
        dest_chain: ChainSelector,
        original_sender: Address,
        receiver: Address,
        source_pool: Address,
        dest_token: Address,
        amount: TokenAmount,
        pool_data: Vec<u8>,
    ) -> Self {
        let mut message = Self {
            id: MessageId::ZERO,
            sequence,
            source_chain,
            dest_chain,
            original_sender,
            receiver,
            source_pool,
            dest_token,
            amount,
            pool_data,
        };
        message.id = message.compute_id();
        message
    }

    /// Blake2b-256 over every field except the id itself.
    pub fn compute_id(&self) -> MessageId {
        let mut hasher = Blake2b256::new();
        hasher.update(self.sequence.to_be_bytes());
        hasher.update(self.source_chain.as_u64().to_be_bytes());
        hasher.update(self.dest_chain.as_u64().to_be_bytes());
        hasher.update(self.original_sender.as_bytes());
        hasher.update(self.receiver.as_bytes());
        hasher.update(self.source_pool.as_bytes());
        hasher.update(self.dest_token.as_bytes());
        hasher.update(self.amount.to_be_bytes());
        hasher.update((self.pool_data.len() as u64).to_be_bytes());
        hasher.update(&self.pool_data);
        let mut out = [0u8; 32];
        out.copy_from_slice(&hasher.finalize());
        MessageId::new(out)
    }

    pub fn encode(&self) -> Result<Vec<u8>, BridgeError> {
        bincode::serialize(self).map_err(|e| BridgeError::Codec(e.to_string()))
    }

    /// Decode an envelope and check that its id matches its contents.
    pub fn decode(bytes: &[u8]) -> Result<Self, BridgeError> {
        let message: Self =
            bincode::deserialize(bytes).map_err(|e| BridgeError::Codec(e.to_string()))?;
        if message.id != message.compute_id() {
            return Err(BridgeError::Codec(format!(
                "message id {} does not match contents",
                message.id
            )));
        }
        Ok(message)
    }
}

/// Moves messages from a source chain to a destination chain.
///
/// Delivery is at-least-once with arbitrary delay; receivers must not
/// assume ordering or uniqueness.
pub trait Transport: Send + Sync {
    /// Accept a message for delivery. Once accepted it cannot be recalled.
    fn send(&self, message: &CrossChainMessage) -> Result<MessageId, BridgeError>;
}

#[derive(Default)]
struct LocalInner {
    pending: VecDeque<Vec<u8>>,
    delivered: HashMap<MessageId, Vec<u8>>,
}

/// In-process transport for tests and single-process deployments.
///
/// Messages sit encoded in a pending queue until someone takes them for a
/// destination chain. Taken messages are remembered so they can be handed
/// out again, which is how at-least-once redelivery is exercised.
#[derive(Default)]
pub struct LocalTransport {
    inner: Mutex<LocalInner>,
}

impl LocalTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }

    /// Remove and return every pending message bound for `dest`, oldest first.
    pub fn take_pending(&self, dest: ChainSelector) -> Result<Vec<CrossChainMessage>, BridgeError> {
        let mut inner = self.lock();
        let mut taken = Vec::new();
        let mut kept = VecDeque::new();
        for bytes in &inner.pending {
            let message = CrossChainMessage::decode(bytes)?;
            if message.dest_chain == dest {
                taken.push((message, bytes.clone()));
            } else {
                kept.push_back(bytes.clone());
            }
        }
        inner.pending = kept;
        for (message, bytes) in &taken {
            inner.delivered.insert(message.id, bytes.clone());
        }
        Ok(taken.into_iter().map(|(message, _)| message).collect())
    }

    /// Hand out an already-delivered message again.
    pub fn redeliver(&self, id: &MessageId) -> Result<Option<CrossChainMessage>, BridgeError> {
        let inner = self.lock();
        inner
            .delivered
            .get(id)
            .map(|bytes| CrossChainMessage::decode(bytes))
            .transpose()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LocalInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Transport for LocalTransport {
    fn send(&self, message: &CrossChainMessage) -> Result<MessageId, BridgeError> {
        let bytes = message.encode()?;
        self.lock().pending.push_back(bytes);
        tracing::debug!(id = %message.id, dest = %message.dest_chain, "message queued");
        Ok(message.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn message(sequence: u64, dest: u64) -> CrossChainMessage {
        CrossChainMessage::new(
            sequence,
            ChainSelector::new(1),
            ChainSelector::new(dest),
            Address::from_low_u64_be(1),
            Address::from_low_u64_be(2),
            Address::from_low_u64_be(3),
            Address::from_low_u64_be(4),
            TokenAmount::from(100u64),
            vec![0u8; 64],
        )
    }

    #[test]
    fn id_covers_contents() {
        let a = message(1, 2);
        let b = message(2, 2);
        assert_ne!(a.id, b.id);
        assert_eq!(a.id, a.compute_id());
        assert!(!a.id.is_zero());
    }

    #[test]
    fn tampered_envelope_is_rejected() {
        let mut m = message(1, 2);
        m.amount = TokenAmount::from(1_000_000u64);
        let bytes = bincode::serialize(&m).unwrap();
        assert!(matches!(
            CrossChainMessage::decode(&bytes),
            Err(BridgeError::Codec(_))
        ));
    }

    #[test]
    fn local_transport_routes_by_destination() {
        let transport = LocalTransport::new();
        transport.send(&message(1, 2)).unwrap();
        transport.send(&message(2, 3)).unwrap();
        transport.send(&message(3, 2)).unwrap();

        let to_two = transport.take_pending(ChainSelector::new(2)).unwrap();
        assert_eq!(
            to_two.iter().map(|m| m.sequence).collect::<Vec<_>>(),
            vec![1, 3]
        );
        assert_eq!(transport.pending_count(), 1);
        assert!(transport.take_pending(ChainSelector::new(2)).unwrap().is_empty());
    }

    #[test]
    fn delivered_messages_can_be_redelivered() {
        let transport = LocalTransport::new();
        let id = transport.send(&message(1, 2)).unwrap();
        assert!(transport.redeliver(&id).unwrap().is_none());
        let first = transport.take_pending(ChainSelector::new(2)).unwrap();
        let again = transport.redeliver(&id).unwrap().unwrap();
        assert_eq!(first[0], again);
    }

    proptest! {
        #[test]
        fn decode_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
            let _ = CrossChainMessage::decode(&bytes);
        }
    }
}
