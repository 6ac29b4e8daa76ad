//! The chain runtime: every token operation on one chain.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use rebase_bridge::{
    BridgeError, CrossChainMessage, LockOrBurnIn, ReleaseOrMintIn, TokenPool, Transport,
};
use rebase_ledger::{AccrualLedger, LedgerEvent};
use rebase_store::LedgerStore;
use rebase_store_lmdb::{LmdbEnvironment, LmdbLedgerStore, DEFAULT_MAP_SIZE};
use rebase_types::{Address, ChainSelector, Clock, InterestRate, MessageId, Timestamp, TokenAmount};
use rebase_vault::{BaseAsset, Vault};

use crate::config::ChainConfig;
use crate::ChainError;

struct ChainState {
    ledger: AccrualLedger,
    vault: Vault,
    pool: TokenPool,
    /// Next outbound sequence number per destination chain.
    sequences: HashMap<ChainSelector, u64>,
}

/// One chain's token deployment.
///
/// Ledger, vault and pool share a single lock, so every call below runs to
/// completion before the next one starts, including the two-account
/// operations (transfers, bridging) that must never be observed half done.
pub struct Chain {
    config: ChainConfig,
    clock: Arc<dyn Clock>,
    state: Mutex<ChainState>,
}

impl Chain {
    /// Build a fresh deployment from `config`.
    ///
    /// The vault takes custody of whatever `asset` already holds at
    /// `config.vault_address`.
    pub fn new(
        config: ChainConfig,
        asset: Box<dyn BaseAsset>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ChainError> {
        config.validate()?;
        let now = clock.now();

        let ledger = AccrualLedger::with_rate(config.initial_interest_rate, now);
        let vault = Vault::new(config.vault_address, asset);
        let mut pool = TokenPool::new(
            config.pool_address,
            config.token_address,
            config.router_address,
        );
        pool.apply_chain_updates(&[], config.remotes.clone(), now);

        tracing::info!(
            chain = %config.chain_selector,
            name = %config.chain_name,
            rate = %config.initial_interest_rate,
            remotes = config.remotes.len(),
            "chain initialised"
        );

        Ok(Self {
            config,
            clock,
            state: Mutex::new(ChainState {
                ledger,
                vault,
                pool,
                sequences: HashMap::new(),
            }),
        })
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn selector(&self) -> ChainSelector {
        self.config.chain_selector
    }

    fn now(&self) -> Timestamp {
        self.clock.now()
    }

    fn lock(&self) -> MutexGuard<'_, ChainState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ── Views ──────────────────────────────────────────────────────────

    /// Materialized balance: principal plus interest accrued so far.
    pub fn balance_of(&self, account: &Address) -> Result<TokenAmount, ChainError> {
        let now = self.now();
        Ok(self.lock().ledger.materialized_balance_of(account, now)?)
    }

    pub fn principal_balance_of(&self, account: &Address) -> TokenAmount {
        self.lock().ledger.principal_balance_of(account)
    }

    /// The global rate new deposits receive.
    pub fn get_interest_rate(&self) -> InterestRate {
        self.lock().ledger.current_rate()
    }

    pub fn get_user_interest_rate(&self, account: &Address) -> InterestRate {
        self.lock().ledger.locked_rate(account)
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> TokenAmount {
        self.lock().ledger.allowance(owner, spender)
    }

    pub fn total_supply(&self) -> Result<TokenAmount, ChainError> {
        let now = self.now();
        Ok(self.lock().ledger.total_materialized_supply(now)?)
    }

    pub fn vault_reserves(&self) -> TokenAmount {
        self.lock().vault.reserves()
    }

    /// Base asset held by `holder`.
    pub fn base_balance_of(&self, holder: &Address) -> TokenAmount {
        self.lock().vault.asset().balance_of(holder)
    }

    pub fn is_supported_chain(&self, chain: &ChainSelector) -> bool {
        self.lock().pool.is_supported_chain(chain)
    }

    /// Register a listener for ledger events on this chain.
    pub fn subscribe_ledger<F>(&self, listener: F)
    where
        F: Fn(&LedgerEvent) + Send + Sync + 'static,
    {
        self.lock().ledger.subscribe(listener);
    }

    // ── Token surface ──────────────────────────────────────────────────

    pub fn deposit(&self, caller: &Address, amount: TokenAmount) -> Result<InterestRate, ChainError> {
        let now = self.now();
        let mut guard = self.lock();
        let state = &mut *guard;
        let result = state
            .vault
            .deposit(&mut state.ledger, caller, amount, now)
            .map_err(ChainError::from);
        rejected("deposit", caller, result)
    }

    /// Redeem `amount` (or everything for `TokenAmount::MAX`) for base asset.
    pub fn redeem(&self, caller: &Address, amount: TokenAmount) -> Result<TokenAmount, ChainError> {
        let now = self.now();
        let mut guard = self.lock();
        let state = &mut *guard;
        let result = state
            .vault
            .redeem(&mut state.ledger, caller, amount, now)
            .map_err(ChainError::from);
        rejected("redeem", caller, result)
    }

    pub fn transfer(
        &self,
        caller: &Address,
        to: &Address,
        amount: TokenAmount,
    ) -> Result<TokenAmount, ChainError> {
        let now = self.now();
        let result = self
            .lock()
            .ledger
            .transfer(caller, to, amount, now)
            .map_err(ChainError::from);
        rejected("transfer", caller, result)
    }

    pub fn approve(&self, caller: &Address, spender: &Address, amount: TokenAmount) {
        self.lock().ledger.approve(caller, spender, amount);
    }

    pub fn transfer_from(
        &self,
        caller: &Address,
        from: &Address,
        to: &Address,
        amount: TokenAmount,
    ) -> Result<TokenAmount, ChainError> {
        let now = self.now();
        let result = self
            .lock()
            .ledger
            .transfer_from(caller, from, to, amount, now)
            .map_err(ChainError::from);
        rejected("transfer_from", caller, result)
    }

    /// Lower the global rate. Owner only.
    pub fn set_interest_rate(&self, caller: &Address, rate: InterestRate) -> Result<(), ChainError> {
        if *caller != self.config.owner {
            return rejected("set_interest_rate", caller, Err(ChainError::NotOwner(*caller)));
        }
        let now = self.now();
        let result = self
            .lock()
            .ledger
            .set_global_rate(rate, now)
            .map_err(ChainError::from);
        rejected("set_interest_rate", caller, result)
    }

    /// Add base asset to the vault without minting.
    pub fn inject_rewards(&self, from: &Address, amount: TokenAmount) -> Result<(), ChainError> {
        let result = self
            .lock()
            .vault
            .inject_rewards(from, amount)
            .map_err(ChainError::from);
        rejected("inject_rewards", from, result)
    }

    // ── Bridging ───────────────────────────────────────────────────────

    /// Send `amount` (or everything for `TokenAmount::MAX`) to `receiver`
    /// on `dest`.
    ///
    /// The tokens move to the pool and are burned there, and the message
    /// goes to the transport. If the transport refuses it nothing changes;
    /// once it is accepted the burn is final, whether or not the message is
    /// ever delivered.
    pub fn send_cross_chain(
        &self,
        caller: &Address,
        dest: ChainSelector,
        receiver: &Address,
        amount: TokenAmount,
        transport: &dyn Transport,
    ) -> Result<MessageId, ChainError> {
        let now = self.now();
        let mut guard = self.lock();
        let result = self.send_locked(&mut guard, caller, dest, receiver, amount, now, transport);
        rejected("send_cross_chain", caller, result)
    }

    #[allow(clippy::too_many_arguments)]
    fn send_locked(
        &self,
        state: &mut ChainState,
        caller: &Address,
        dest: ChainSelector,
        receiver: &Address,
        amount: TokenAmount,
        now: Timestamp,
        transport: &dyn Transport,
    ) -> Result<MessageId, ChainError> {
        let amount = if amount.is_max() {
            state.ledger.materialized_balance_of(caller, now)?
        } else {
            amount
        };
        let input = LockOrBurnIn {
            original_sender: *caller,
            receiver: *receiver,
            remote_chain: dest,
            amount,
        };
        let router = self.config.router_address;
        let pool_address = state.pool.address();

        // Tokens move to the pool and burn there; the transport is asked to
        // take the message before either step commits.
        state.pool.validate_lock_or_burn(&router, &input, now)?;
        let local_chain = self.config.chain_selector;
        let ChainState {
            ledger,
            pool,
            sequences,
            ..
        } = state;
        let id = ledger.transfer_then(caller, &pool_address, amount, now, |ledger, _| {
            pool.lock_or_burn_then(ledger, &router, &input, now, |out| {
                let sequence = sequences.get(&dest).copied().unwrap_or(0) + 1;
                let message = CrossChainMessage::new(
                    sequence,
                    local_chain,
                    dest,
                    *caller,
                    *receiver,
                    pool_address,
                    out.dest_token,
                    amount,
                    out.dest_pool_data.clone(),
                );
                let id = transport.send(&message)?;
                sequences.insert(dest, sequence);
                Ok::<_, BridgeError>(id)
            })
        })?;

        tracing::info!(
            %id,
            sender = %caller,
            %receiver,
            dest = %dest,
            %amount,
            "cross-chain transfer sent"
        );
        Ok(id)
    }

    /// Process a message delivered by the transport. Returns the amount minted.
    ///
    /// Delivering the same message twice mints twice; uniqueness is the
    /// transport's job.
    pub fn receive_cross_chain(&self, message: &CrossChainMessage) -> Result<TokenAmount, ChainError> {
        if message.dest_chain != self.config.chain_selector {
            return rejected(
                "receive_cross_chain",
                &message.receiver,
                Err(ChainError::WrongDestination {
                    expected: self.config.chain_selector,
                    actual: message.dest_chain,
                }),
            );
        }
        let now = self.now();
        let input = ReleaseOrMintIn {
            original_sender: message.original_sender,
            source_chain: message.source_chain,
            receiver: message.receiver,
            amount: message.amount,
            source_pool: message.source_pool,
            pool_data: message.pool_data.clone(),
        };

        let mut guard = self.lock();
        let state = &mut *guard;
        let result = state
            .pool
            .release_or_mint(&mut state.ledger, &self.config.router_address, &input, now)
            .map(|out| out.minted)
            .map_err(ChainError::from);
        if let Ok(minted) = &result {
            tracing::info!(id = %message.id, receiver = %message.receiver, %minted, "cross-chain transfer received");
        }
        rejected("receive_cross_chain", &message.receiver, result)
    }

    // ── Persistence ────────────────────────────────────────────────────

    /// Open (or create) the LMDB store under `config.data_dir`.
    pub fn open_lmdb_store(&self) -> Result<Arc<LmdbLedgerStore>, ChainError> {
        let env = LmdbEnvironment::open(&self.config.data_dir, DEFAULT_MAP_SIZE)?;
        Ok(env.ledger_store())
    }

    /// Write the ledger to `store` as one snapshot.
    pub fn save(&self, store: &dyn LedgerStore) -> Result<(), ChainError> {
        self.lock().ledger.save_to_store(store)?;
        tracing::info!(chain = %self.config.chain_selector, "ledger saved");
        Ok(())
    }

    /// Replace the in-memory ledger with the snapshot in `store`.
    ///
    /// Returns `false` (and changes nothing) if the store holds no snapshot.
    pub fn restore(&self, store: &dyn LedgerStore) -> Result<bool, ChainError> {
        if !AccrualLedger::has_snapshot(store)? {
            return Ok(false);
        }
        let ledger = AccrualLedger::load_from_store(store)?;
        self.lock().ledger = ledger;
        tracing::info!(chain = %self.config.chain_selector, "ledger restored");
        Ok(true)
    }
}

/// Log a rejected operation at `warn` and pass the result through.
fn rejected<T>(op: &str, caller: &Address, result: Result<T, ChainError>) -> Result<T, ChainError> {
    if let Err(e) = &result {
        tracing::warn!(op, %caller, error = %e, "operation rejected");
    }
    result
}
