//! The burn/mint token pool.

use std::collections::{HashMap, HashSet};

use rebase_ledger::{AccrualLedger, EventBus};
use rebase_types::{Address, ChainSelector, Timestamp, TokenAmount};

use crate::config::{RateLimiterConfig, RemoteChainConfig};
use crate::error::{BridgeError, Direction};
use crate::events::PoolEvent;
use crate::payload::PoolPayload;
use crate::rate_limiter::TokenBucket;

/// Outbound request, as handed to the pool by the router.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LockOrBurnIn {
    /// The user who initiated the transfer; their locked rate is carried.
    pub original_sender: Address,
    pub receiver: Address,
    pub remote_chain: ChainSelector,
    pub amount: TokenAmount,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LockOrBurnOut {
    pub dest_token: Address,
    pub dest_pool_data: Vec<u8>,
}

/// Inbound request, with the amount and receiver verified by the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReleaseOrMintIn {
    pub original_sender: Address,
    pub source_chain: ChainSelector,
    pub receiver: Address,
    pub amount: TokenAmount,
    /// The pool on the source chain that produced `pool_data`.
    pub source_pool: Address,
    pub pool_data: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReleaseOrMintOut {
    pub minted: TokenAmount,
}

struct RemoteChain {
    config: RemoteChainConfig,
    outbound: TokenBucket,
    inbound: TokenBucket,
}

/// A burn/mint pool for the rebase token on one chain.
///
/// Only the configured router may call [`TokenPool::lock_or_burn`] and
/// [`TokenPool::release_or_mint`]. Tokens to be bridged out must already sit
/// on the pool's own ledger account; the pool burns them from there.
pub struct TokenPool {
    address: Address,
    token: Address,
    router: Address,
    remotes: HashMap<ChainSelector, RemoteChain>,
    allowlist: Option<HashSet<Address>>,
    events: EventBus<PoolEvent>,
}

impl TokenPool {
    pub fn new(address: Address, token: Address, router: Address) -> Self {
        Self {
            address,
            token,
            router,
            remotes: HashMap::new(),
            allowlist: None,
            events: EventBus::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn token(&self) -> Address {
        self.token
    }

    pub fn router(&self) -> Address {
        self.router
    }

    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: Fn(&PoolEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(listener);
    }

    // ── Configuration ──────────────────────────────────────────────────

    /// Remove and then add remote chains. Adding a chain that is already
    /// configured replaces its configuration and resets its rate limiters.
    pub fn apply_chain_updates(
        &mut self,
        removes: &[ChainSelector],
        adds: Vec<RemoteChainConfig>,
        now: Timestamp,
    ) {
        for chain in removes {
            if self.remotes.remove(chain).is_some() {
                tracing::info!(remote_chain = %chain, "remote chain removed");
                self.events.emit(&PoolEvent::ChainRemoved(*chain));
            }
        }
        for config in adds {
            let chain = config.remote_chain;
            let remote = RemoteChain {
                outbound: TokenBucket::new(config.outbound_rate_limit.clone(), now),
                inbound: TokenBucket::new(config.inbound_rate_limit.clone(), now),
                config,
            };
            self.remotes.insert(chain, remote);
            tracing::info!(remote_chain = %chain, "remote chain added");
            self.events.emit(&PoolEvent::ChainAdded(chain));
        }
    }

    pub fn is_supported_chain(&self, chain: &ChainSelector) -> bool {
        self.remotes.contains_key(chain)
    }

    pub fn supported_chains(&self) -> Vec<ChainSelector> {
        let mut chains: Vec<_> = self.remotes.keys().copied().collect();
        chains.sort();
        chains
    }

    pub fn remote_config(&self, chain: &ChainSelector) -> Option<&RemoteChainConfig> {
        self.remotes.get(chain).map(|r| &r.config)
    }

    pub fn set_rate_limits(
        &mut self,
        chain: &ChainSelector,
        outbound: RateLimiterConfig,
        inbound: RateLimiterConfig,
        now: Timestamp,
    ) -> Result<(), BridgeError> {
        let remote = self
            .remotes
            .get_mut(chain)
            .ok_or(BridgeError::UnconfiguredRemote(*chain))?;
        remote.config.outbound_rate_limit = outbound.clone();
        remote.config.inbound_rate_limit = inbound.clone();
        remote.outbound.set_config(outbound, now);
        remote.inbound.set_config(inbound, now);
        Ok(())
    }

    /// Restrict outbound transfers to these original senders; `None` lifts
    /// the restriction.
    pub fn set_allowlist(&mut self, senders: Option<Vec<Address>>) {
        self.allowlist = senders.map(|s| s.into_iter().collect());
    }

    /// Outbound tokens still allowed through on `chain` at `now`.
    pub fn outbound_capacity(
        &self,
        chain: &ChainSelector,
        now: Timestamp,
    ) -> Result<TokenAmount, BridgeError> {
        let remote = self
            .remotes
            .get(chain)
            .ok_or(BridgeError::UnconfiguredRemote(*chain))?;
        Ok(remote.outbound.available(now))
    }

    // ── Outbound ───────────────────────────────────────────────────────

    /// Check an outbound request without changing anything.
    ///
    /// Covers every failure of [`TokenPool::lock_or_burn`] except the
    /// ledger debit itself.
    pub fn validate_lock_or_burn(
        &self,
        caller: &Address,
        input: &LockOrBurnIn,
        now: Timestamp,
    ) -> Result<(), BridgeError> {
        if *caller != self.router {
            return Err(BridgeError::UnauthorizedSender(*caller));
        }
        let remote = self
            .remotes
            .get(&input.remote_chain)
            .ok_or(BridgeError::UnconfiguredRemote(input.remote_chain))?;
        if let Some(allowed) = &self.allowlist {
            if !allowed.contains(&input.original_sender) {
                return Err(BridgeError::SenderNotAllowed(input.original_sender));
            }
        }
        if input.receiver.is_zero() {
            return Err(BridgeError::InvalidReceiver);
        }
        let available = remote.outbound.available(now);
        if input.amount > available {
            return Err(BridgeError::RateLimitExceeded {
                chain: input.remote_chain,
                direction: Direction::Outbound,
                requested: input.amount,
                available,
            });
        }
        Ok(())
    }

    /// Burn `input.amount` from the pool's ledger account and produce the
    /// payload for the destination pool.
    ///
    /// The carried rate is the original sender's locked rate as of now.
    pub fn lock_or_burn(
        &mut self,
        ledger: &mut AccrualLedger,
        caller: &Address,
        input: &LockOrBurnIn,
        now: Timestamp,
    ) -> Result<LockOrBurnOut, BridgeError> {
        self.lock_or_burn_then(ledger, caller, input, now, |out| Ok(out.clone()))
    }

    /// Like [`TokenPool::lock_or_burn`], but `dispatch` runs before the burn
    /// commits. If it fails, neither the ledger nor the rate limiter changes.
    pub fn lock_or_burn_then<T, F>(
        &mut self,
        ledger: &mut AccrualLedger,
        caller: &Address,
        input: &LockOrBurnIn,
        now: Timestamp,
        dispatch: F,
    ) -> Result<T, BridgeError>
    where
        F: FnOnce(&LockOrBurnOut) -> Result<T, BridgeError>,
    {
        self.validate_lock_or_burn(caller, input, now)?;
        let remote = self
            .remotes
            .get_mut(&input.remote_chain)
            .ok_or(BridgeError::UnconfiguredRemote(input.remote_chain))?;

        let rate = ledger.locked_rate(&input.original_sender);

        let mut outbound = remote.outbound.clone();
        outbound
            .try_consume(input.amount, now)
            .map_err(|available| BridgeError::RateLimitExceeded {
                chain: input.remote_chain,
                direction: Direction::Outbound,
                requested: input.amount,
                available,
            })?;
        let out = LockOrBurnOut {
            dest_token: remote.config.remote_token,
            dest_pool_data: PoolPayload::new(input.amount, rate).encode(),
        };
        let result = ledger.debit_then(&self.address, input.amount, now, |_| dispatch(&out))?;
        remote.outbound = outbound;

        tracing::info!(
            sender = %input.original_sender,
            remote_chain = %input.remote_chain,
            amount = %input.amount,
            %rate,
            "burned for cross-chain transfer"
        );
        self.events.emit(&PoolEvent::Burned {
            sender: input.original_sender,
            remote_chain: input.remote_chain,
            amount: input.amount,
            rate,
        });
        Ok(result)
    }

    // ── Inbound ────────────────────────────────────────────────────────

    /// Mint to the receiver at the rate carried in the payload.
    pub fn release_or_mint(
        &mut self,
        ledger: &mut AccrualLedger,
        caller: &Address,
        input: &ReleaseOrMintIn,
        now: Timestamp,
    ) -> Result<ReleaseOrMintOut, BridgeError> {
        if *caller != self.router {
            return Err(BridgeError::UnauthorizedSender(*caller));
        }
        let remote = self
            .remotes
            .get_mut(&input.source_chain)
            .ok_or(BridgeError::UnconfiguredRemote(input.source_chain))?;
        if !remote.config.is_remote_pool(&input.source_pool) {
            return Err(BridgeError::UnauthorizedSender(input.source_pool));
        }

        let payload = PoolPayload::decode(&input.pool_data)?;
        if payload.amount != input.amount {
            return Err(BridgeError::MalformedPayload(format!(
                "payload amount {} does not match transferred amount {}",
                payload.amount, input.amount
            )));
        }
        if input.receiver.is_zero() {
            return Err(BridgeError::InvalidReceiver);
        }

        let mut inbound = remote.inbound.clone();
        inbound
            .try_consume(input.amount, now)
            .map_err(|available| BridgeError::RateLimitExceeded {
                chain: input.source_chain,
                direction: Direction::Inbound,
                requested: input.amount,
                available,
            })?;
        ledger.credit_at_rate(&input.receiver, input.amount, payload.rate, now)?;
        remote.inbound = inbound;

        tracing::info!(
            receiver = %input.receiver,
            source_chain = %input.source_chain,
            amount = %input.amount,
            rate = %payload.rate,
            "minted from cross-chain transfer"
        );
        self.events.emit(&PoolEvent::Minted {
            receiver: input.receiver,
            source_chain: input.source_chain,
            amount: input.amount,
            rate: payload.rate,
        });

        Ok(ReleaseOrMintOut {
            minted: input.amount,
        })
    }
}
