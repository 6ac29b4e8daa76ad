//! Core accrual ledger.

use std::collections::HashMap;

use crate::error::LedgerError;
use crate::events::{EventBus, LedgerEvent};
use crate::state::{AccountState, RateHistory};
use rebase_store::{keys, AccountRecord, LedgerStore};
use rebase_types::{Address, InterestRate, Timestamp, TokenAmount};

/// An account copied out of the ledger, materialized and possibly mutated,
/// but not yet written back.
///
/// Operations stage every account they touch, validate, and only then
/// commit, so a failing call leaves no trace.
struct Staged {
    address: Address,
    state: AccountState,
    interest: TokenAmount,
}

/// The accrual ledger: per-account principal, locked rate and last update,
/// plus the single global rate.
///
/// Balances grow lazily. Nothing ticks in the background; every operation
/// that reads or writes an account first folds its pending interest into
/// principal ("materialize, then mutate").
pub struct AccrualLedger {
    accounts: HashMap<Address, AccountState>,
    allowances: HashMap<(Address, Address), TokenAmount>,
    rate_history: RateHistory,
    events: EventBus<LedgerEvent>,
}

impl AccrualLedger {
    pub fn new() -> Self {
        Self::from_parts(RateHistory::default(), HashMap::new(), HashMap::new())
    }

    /// Create a ledger whose global rate starts at `initial_rate` at `genesis`.
    pub fn with_rate(initial_rate: InterestRate, genesis: Timestamp) -> Self {
        Self::from_parts(
            RateHistory::new(initial_rate, genesis),
            HashMap::new(),
            HashMap::new(),
        )
    }

    fn from_parts(
        rate_history: RateHistory,
        accounts: HashMap<Address, AccountState>,
        allowances: HashMap<(Address, Address), TokenAmount>,
    ) -> Self {
        Self {
            accounts,
            allowances,
            rate_history,
            events: EventBus::new(),
        }
    }

    // ── Views ──────────────────────────────────────────────────────────

    /// The rate a freshly funded account receives on deposit.
    pub fn current_rate(&self) -> InterestRate {
        self.rate_history.current_rate()
    }

    pub fn rate_history(&self) -> &RateHistory {
        &self.rate_history
    }

    /// The rate locked onto `account` (zero for an account never funded).
    pub fn locked_rate(&self, account: &Address) -> InterestRate {
        self.accounts
            .get(account)
            .map(|s| s.locked_rate)
            .unwrap_or(InterestRate::ZERO)
    }

    /// Tokens actually issued to `account`, excluding unmaterialized interest.
    pub fn principal_balance_of(&self, account: &Address) -> TokenAmount {
        self.accounts
            .get(account)
            .map(|s| s.principal)
            .unwrap_or(TokenAmount::ZERO)
    }

    /// The displayed balance: principal plus linear interest since the last
    /// materialization. Has no side effects.
    pub fn materialized_balance_of(
        &self,
        account: &Address,
        now: Timestamp,
    ) -> Result<TokenAmount, LedgerError> {
        match self.accounts.get(account) {
            Some(state) => state
                .materialized_balance_checked(now)
                .ok_or(LedgerError::Overflow),
            None => Ok(TokenAmount::ZERO),
        }
    }

    pub fn account(&self, account: &Address) -> Option<&AccountState> {
        self.accounts.get(account)
    }

    pub fn accounts(&self) -> impl Iterator<Item = (&Address, &AccountState)> {
        self.accounts.iter()
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> TokenAmount {
        self.allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or(TokenAmount::ZERO)
    }

    /// Sum of all principals: what has actually been minted and not burned.
    pub fn total_principal_supply(&self) -> Result<TokenAmount, LedgerError> {
        self.accounts.values().try_fold(TokenAmount::ZERO, |acc, s| {
            acc.checked_add(s.principal).ok_or(LedgerError::Overflow)
        })
    }

    /// Sum of all materialized balances at `now`.
    pub fn total_materialized_supply(&self, now: Timestamp) -> Result<TokenAmount, LedgerError> {
        self.accounts.values().try_fold(TokenAmount::ZERO, |acc, s| {
            let balance = s
                .materialized_balance_checked(now)
                .ok_or(LedgerError::Overflow)?;
            acc.checked_add(balance).ok_or(LedgerError::Overflow)
        })
    }

    /// Register a listener for ledger events.
    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: Fn(&LedgerEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(listener);
    }

    // ── Mutations ──────────────────────────────────────────────────────

    /// Lower (or keep) the global rate. The only way the rate ever changes.
    pub fn set_global_rate(
        &mut self,
        new_rate: InterestRate,
        now: Timestamp,
    ) -> Result<(), LedgerError> {
        let previous = self.rate_history.apply_rate_change(new_rate, now)?;
        tracing::info!(
            previous = %previous,
            new = %new_rate,
            version = self.rate_history.version(),
            "global interest rate set"
        );
        self.events.emit(&LedgerEvent::InterestRateSet {
            previous,
            new: new_rate,
            at: now,
        });
        Ok(())
    }

    /// Fold `account`'s pending interest into its principal.
    ///
    /// Returns the amount materialized. Unknown accounts are left alone.
    pub fn materialize(
        &mut self,
        account: &Address,
        now: Timestamp,
    ) -> Result<TokenAmount, LedgerError> {
        if !self.accounts.contains_key(account) {
            return Ok(TokenAmount::ZERO);
        }
        let staged = self.stage(account, now)?;
        let interest = staged.interest;
        self.commit(staged);
        Ok(interest)
    }

    /// Issue `amount` to `account`.
    ///
    /// An account whose balance is zero (after materialization) adopts
    /// `rate`; a funded account keeps the rate it already has.
    pub fn credit_at_rate(
        &mut self,
        account: &Address,
        amount: TokenAmount,
        rate: InterestRate,
        now: Timestamp,
    ) -> Result<(), LedgerError> {
        self.credit_then(account, amount, rate, now, || Ok::<_, LedgerError>(()))
    }

    /// Credit `account`, committing only if `collect` succeeds.
    ///
    /// The counterpart of [`AccrualLedger::debit_then`]: it lets a mint and
    /// the intake of whatever backs it succeed or fail together.
    pub fn credit_then<T, E, F>(
        &mut self,
        account: &Address,
        amount: TokenAmount,
        rate: InterestRate,
        now: Timestamp,
        collect: F,
    ) -> Result<T, E>
    where
        E: From<LedgerError>,
        F: FnOnce() -> Result<T, E>,
    {
        let mut staged = self.stage(account, now)?;
        if staged.state.principal.is_zero() {
            staged.state.locked_rate = rate;
        }
        staged.state.principal = staged
            .state
            .principal
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        let locked_rate = staged.state.locked_rate;

        let out = collect()?;
        self.commit(staged);

        tracing::debug!(%account, %amount, %locked_rate, "credited");
        self.events.emit(&LedgerEvent::Credited {
            account: *account,
            amount,
            locked_rate,
        });
        Ok(out)
    }

    /// Burn `amount` (or the whole balance for `TokenAmount::MAX`) from
    /// `account`. Returns the amount burned.
    pub fn debit(
        &mut self,
        account: &Address,
        amount: TokenAmount,
        now: Timestamp,
    ) -> Result<TokenAmount, LedgerError> {
        self.debit_then(account, amount, now, Ok::<_, LedgerError>)
    }

    /// Burn from `account`, then run `release` with the burned amount; the
    /// burn is committed only if `release` succeeds.
    ///
    /// This is how a burn and an external side effect (paying out the base
    /// asset) become one atomic unit.
    pub fn debit_then<T, E, F>(
        &mut self,
        account: &Address,
        amount: TokenAmount,
        now: Timestamp,
        release: F,
    ) -> Result<T, E>
    where
        E: From<LedgerError>,
        F: FnOnce(TokenAmount) -> Result<T, E>,
    {
        let mut staged = self.stage(account, now)?;
        let amount = if amount.is_max() {
            staged.state.principal
        } else {
            amount
        };
        staged.state.principal = staged.state.principal.checked_sub(amount).ok_or(
            LedgerError::InsufficientBalance {
                needed: amount,
                available: staged.state.principal,
            },
        )?;

        let out = release(amount)?;
        self.commit(staged);

        tracing::debug!(%account, %amount, "debited");
        self.events.emit(&LedgerEvent::Debited {
            account: *account,
            amount,
        });
        Ok(out)
    }

    /// Move `amount` (or the sender's whole balance for `TokenAmount::MAX`)
    /// between two accounts. Returns the amount moved.
    ///
    /// A recipient whose balance is zero inherits the sender's locked rate,
    /// not the current global rate.
    pub fn transfer(
        &mut self,
        from: &Address,
        to: &Address,
        amount: TokenAmount,
        now: Timestamp,
    ) -> Result<TokenAmount, LedgerError> {
        let (staged, amount) = self.stage_transfer(from, to, amount, now)?;
        for s in staged {
            self.commit(s);
        }
        tracing::debug!(%from, %to, %amount, "transferred");
        self.events.emit(&LedgerEvent::Transferred {
            from: *from,
            to: *to,
            amount,
        });
        Ok(amount)
    }

    /// Transfer, then run `then` against the updated ledger before the
    /// transfer is final. If `then` fails, both accounts are put back as
    /// they were and no events are emitted.
    ///
    /// `then` must itself leave the ledger unchanged when it fails.
    pub fn transfer_then<T, E, F>(
        &mut self,
        from: &Address,
        to: &Address,
        amount: TokenAmount,
        now: Timestamp,
        then: F,
    ) -> Result<T, E>
    where
        E: From<LedgerError>,
        F: FnOnce(&mut Self, TokenAmount) -> Result<T, E>,
    {
        let (staged, amount) = self.stage_transfer(from, to, amount, now)?;
        let mut previous = Vec::with_capacity(staged.len());
        let mut interest = Vec::with_capacity(staged.len());
        for s in staged {
            previous.push((s.address, self.accounts.insert(s.address, s.state)));
            interest.push((s.address, s.interest));
        }

        match then(self, amount) {
            Ok(out) => {
                for (address, amount) in interest {
                    self.emit_materialized(address, amount);
                }
                tracing::debug!(%from, %to, %amount, "transferred");
                self.events.emit(&LedgerEvent::Transferred {
                    from: *from,
                    to: *to,
                    amount,
                });
                Ok(out)
            }
            Err(e) => {
                for (address, state) in previous.into_iter().rev() {
                    match state {
                        Some(state) => {
                            self.accounts.insert(address, state);
                        }
                        None => {
                            self.accounts.remove(&address);
                        }
                    }
                }
                Err(e)
            }
        }
    }

    /// Set `spender`'s allowance over `owner`'s tokens.
    pub fn approve(&mut self, owner: &Address, spender: &Address, amount: TokenAmount) {
        self.allowances.insert((*owner, *spender), amount);
        self.events.emit(&LedgerEvent::Approval {
            owner: *owner,
            spender: *spender,
            amount,
        });
    }

    /// Transfer on `from`'s behalf, spending `spender`'s allowance.
    ///
    /// A `TokenAmount::MAX` allowance is never decremented.
    pub fn transfer_from(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: TokenAmount,
        now: Timestamp,
    ) -> Result<TokenAmount, LedgerError> {
        let (staged, amount) = self.stage_transfer(from, to, amount, now)?;
        let allowed = self.allowance(from, spender);
        let remaining = if allowed.is_max() {
            allowed
        } else {
            allowed
                .checked_sub(amount)
                .ok_or(LedgerError::InsufficientAllowance {
                    needed: amount,
                    allowed,
                })?
        };

        for s in staged {
            self.commit(s);
        }
        self.allowances.insert((*from, *spender), remaining);
        tracing::debug!(%spender, %from, %to, %amount, "transferred on behalf");
        self.events.emit(&LedgerEvent::Transferred {
            from: *from,
            to: *to,
            amount,
        });
        Ok(amount)
    }

    // ── Staging ────────────────────────────────────────────────────────

    fn stage(&self, account: &Address, now: Timestamp) -> Result<Staged, LedgerError> {
        let mut state = self
            .accounts
            .get(account)
            .cloned()
            .unwrap_or_else(|| AccountState::new(now));
        let interest = state.materialize(now)?;
        Ok(Staged {
            address: *account,
            state,
            interest,
        })
    }

    fn stage_transfer(
        &self,
        from: &Address,
        to: &Address,
        amount: TokenAmount,
        now: Timestamp,
    ) -> Result<(Vec<Staged>, TokenAmount), LedgerError> {
        let mut sender = self.stage(from, now)?;
        let amount = if amount.is_max() {
            sender.state.principal
        } else {
            amount
        };
        if amount > sender.state.principal {
            return Err(LedgerError::InsufficientBalance {
                needed: amount,
                available: sender.state.principal,
            });
        }

        if from == to {
            return Ok((vec![sender], amount));
        }

        let mut recipient = self.stage(to, now)?;
        if recipient.state.principal.is_zero() {
            recipient.state.locked_rate = sender.state.locked_rate;
        }
        sender.state.principal = sender
            .state
            .principal
            .checked_sub(amount)
            .ok_or(LedgerError::Overflow)?;
        recipient.state.principal = recipient
            .state
            .principal
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        Ok((vec![sender, recipient], amount))
    }

    fn commit(&mut self, staged: Staged) {
        let Staged {
            address,
            state,
            interest,
        } = staged;
        self.accounts.insert(address, state);
        self.emit_materialized(address, interest);
    }

    fn emit_materialized(&self, address: Address, interest: TokenAmount) {
        if !interest.is_zero() {
            tracing::debug!(account = %address, %interest, "materialized interest");
            self.events.emit(&LedgerEvent::InterestMaterialized {
                account: address,
                amount: interest,
            });
        }
    }
}

impl AccrualLedger {
    /// Persist all ledger state to a store in one snapshot.
    pub fn save_to_store(&self, store: &dyn LedgerStore) -> Result<(), LedgerError> {
        let rate_bytes = bincode::serialize(&self.rate_history)
            .map_err(|e| LedgerError::Serialization(e.to_string()))?;
        let allowances: Vec<(Address, Address, TokenAmount)> = self
            .allowances
            .iter()
            .map(|(&(owner, spender), &amount)| (owner, spender, amount))
            .collect();
        let allowance_bytes = bincode::serialize(&allowances)
            .map_err(|e| LedgerError::Serialization(e.to_string()))?;

        let records: Vec<AccountRecord> = self
            .accounts
            .iter()
            .map(|(address, state)| AccountRecord {
                address: *address,
                principal: state.principal,
                locked_rate: state.locked_rate,
                last_update: state.last_update,
            })
            .collect();

        store.commit_snapshot(
            &[
                (keys::RATE_HISTORY, rate_bytes),
                (keys::ALLOWANCES, allowance_bytes),
            ],
            &records,
        )?;
        tracing::debug!(accounts = records.len(), "ledger saved");
        Ok(())
    }

    /// Restore ledger state from a store.
    ///
    /// A store that has never been written yields an empty ledger at the
    /// default rate; use [`AccrualLedger::has_snapshot`] to tell the two apart.
    pub fn load_from_store(store: &dyn LedgerStore) -> Result<Self, LedgerError> {
        let rate_history = match store.get_meta(keys::RATE_HISTORY)? {
            Some(bytes) => bincode::deserialize(&bytes)
                .map_err(|e| LedgerError::Serialization(e.to_string()))?,
            None => RateHistory::default(),
        };

        let allowances = match store.get_meta(keys::ALLOWANCES)? {
            Some(bytes) => {
                let entries: Vec<(Address, Address, TokenAmount)> = bincode::deserialize(&bytes)
                    .map_err(|e| LedgerError::Serialization(e.to_string()))?;
                entries
                    .into_iter()
                    .map(|(owner, spender, amount)| ((owner, spender), amount))
                    .collect()
            }
            None => HashMap::new(),
        };

        let accounts = store
            .iter_accounts()?
            .into_iter()
            .map(|r| {
                (
                    r.address,
                    AccountState {
                        principal: r.principal,
                        locked_rate: r.locked_rate,
                        last_update: r.last_update,
                    },
                )
            })
            .collect();

        Ok(Self::from_parts(rate_history, accounts, allowances))
    }

    /// Whether `store` holds a previously saved ledger.
    pub fn has_snapshot(store: &dyn LedgerStore) -> Result<bool, LedgerError> {
        Ok(store.get_meta(keys::RATE_HISTORY)?.is_some())
    }
}

impl Default for AccrualLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rebase_nullables::NullLedgerStore;
    use std::sync::{Arc, Mutex};

    const R0: u64 = 50_000_000_000;
    const R1: u64 = 40_000_000_000;

    fn addr(n: u64) -> Address {
        Address::from_low_u64_be(n)
    }

    fn ts(secs: u64) -> Timestamp {
        Timestamp::new(secs)
    }

    fn amt(n: u128) -> TokenAmount {
        TokenAmount::from(n)
    }

    fn rate(n: u64) -> InterestRate {
        InterestRate::from(n)
    }

    fn make_ledger() -> AccrualLedger {
        AccrualLedger::with_rate(rate(R0), ts(0))
    }

    fn deposit(ledger: &mut AccrualLedger, who: u64, amount: u128, now: u64) {
        let r = ledger.current_rate();
        ledger.credit_at_rate(&addr(who), amt(amount), r, ts(now)).unwrap();
    }

    fn record_events(ledger: &mut AccrualLedger) -> Arc<Mutex<Vec<LedgerEvent>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        ledger.subscribe(move |e| sink.lock().unwrap().push(e.clone()));
        events
    }

    #[test]
    fn deposit_then_warp_accrues_interest() {
        let mut ledger = make_ledger();
        deposit(&mut ledger, 1, 100_000, 0);

        let balance = ledger.materialized_balance_of(&addr(1), ts(3600)).unwrap();
        assert!(balance > amt(100_000));
        assert_eq!(balance, amt(100_018));
        assert_eq!(ledger.principal_balance_of(&addr(1)), amt(100_000));
        assert_eq!(ledger.locked_rate(&addr(1)), rate(R0));
    }

    #[test]
    fn redeem_all_after_warp_pays_materialized_balance() {
        let mut ledger = make_ledger();
        deposit(&mut ledger, 1, 100_000, 0);
        let before = ledger.materialized_balance_of(&addr(1), ts(3600)).unwrap();

        let burned = ledger.debit(&addr(1), TokenAmount::MAX, ts(3600)).unwrap();
        assert_eq!(burned, before);
        assert_eq!(ledger.materialized_balance_of(&addr(1), ts(3600)).unwrap(), TokenAmount::ZERO);
        assert_eq!(ledger.materialized_balance_of(&addr(1), ts(99_999)).unwrap(), TokenAmount::ZERO);
    }

    #[test]
    fn redeem_all_without_elapsed_time_returns_deposit() {
        let mut ledger = make_ledger();
        deposit(&mut ledger, 1, 5_000, 10);
        let burned = ledger.debit(&addr(1), TokenAmount::MAX, ts(10)).unwrap();
        assert_eq!(burned, amt(5_000));
        assert_eq!(ledger.principal_balance_of(&addr(1)), TokenAmount::ZERO);
    }

    #[test]
    fn lowering_rate_only_affects_new_depositors() {
        let mut ledger = make_ledger();
        deposit(&mut ledger, 1, 1_000, 0);

        ledger.set_global_rate(rate(R1), ts(10)).unwrap();
        deposit(&mut ledger, 2, 1_000, 20);

        assert_eq!(ledger.locked_rate(&addr(1)), rate(R0));
        assert_eq!(ledger.locked_rate(&addr(2)), rate(R1));

        let err = ledger.set_global_rate(rate(R0), ts(30)).unwrap_err();
        assert!(matches!(err, LedgerError::RateIncreaseRejected { .. }));
        assert_eq!(ledger.current_rate(), rate(R1));
    }

    #[test]
    fn funded_account_keeps_first_rate_on_recredit() {
        let mut ledger = make_ledger();
        deposit(&mut ledger, 1, 1_000, 0);
        ledger.credit_at_rate(&addr(1), amt(500), rate(1), ts(5)).unwrap();
        assert_eq!(ledger.locked_rate(&addr(1)), rate(R0));
        assert_eq!(ledger.principal_balance_of(&addr(1)), amt(1_500));
    }

    #[test]
    fn drained_account_takes_new_rate_on_refund() {
        let mut ledger = make_ledger();
        deposit(&mut ledger, 1, 1_000, 0);
        ledger.debit(&addr(1), TokenAmount::MAX, ts(0)).unwrap();
        ledger.set_global_rate(rate(R1), ts(1)).unwrap();
        deposit(&mut ledger, 1, 1_000, 2);
        assert_eq!(ledger.locked_rate(&addr(1)), rate(R1));
    }

    #[test]
    fn credit_materializes_before_adding() {
        let mut ledger = AccrualLedger::with_rate(rate(1_000_000_000_000_000), ts(0));
        deposit(&mut ledger, 1, 1_000, 0);
        // 100s at 1e15/s on 1000 → +100
        deposit(&mut ledger, 1, 1_000, 100);
        assert_eq!(ledger.principal_balance_of(&addr(1)), amt(2_100));
        assert_eq!(ledger.account(&addr(1)).unwrap().last_update, ts(100));
    }

    #[test]
    fn credit_then_rolls_back_when_collect_fails() {
        let mut ledger = make_ledger();
        let result: Result<(), LedgerError> =
            ledger.credit_then(&addr(1), amt(10), rate(R0), ts(0), || Err(LedgerError::Overflow));
        assert!(result.is_err());
        assert!(ledger.account(&addr(1)).is_none());
    }

    #[test]
    fn debit_beyond_balance_fails_without_side_effects() {
        let mut ledger = AccrualLedger::with_rate(rate(1_000_000_000_000_000), ts(0));
        deposit(&mut ledger, 1, 1_000, 0);
        let events = record_events(&mut ledger);

        let err = ledger.debit(&addr(1), amt(2_000), ts(100)).unwrap_err();
        match err {
            LedgerError::InsufficientBalance { needed, available } => {
                assert_eq!(needed, amt(2_000));
                assert_eq!(available, amt(1_100));
            }
            other => panic!("expected InsufficientBalance, got {other:?}"),
        }
        // Nothing was materialized either.
        assert_eq!(ledger.principal_balance_of(&addr(1)), amt(1_000));
        assert_eq!(ledger.account(&addr(1)).unwrap().last_update, ts(0));
        assert!(events.lock().unwrap().is_empty());
    }

    #[test]
    fn debit_then_rolls_back_when_release_fails() {
        let mut ledger = make_ledger();
        deposit(&mut ledger, 1, 1_000, 0);

        let result: Result<(), LedgerError> =
            ledger.debit_then(&addr(1), amt(400), ts(0), |_| Err(LedgerError::Overflow));
        assert!(result.is_err());
        assert_eq!(ledger.principal_balance_of(&addr(1)), amt(1_000));

        let paid = ledger
            .debit_then(&addr(1), amt(400), ts(0), |a| Ok::<_, LedgerError>(a))
            .unwrap();
        assert_eq!(paid, amt(400));
        assert_eq!(ledger.principal_balance_of(&addr(1)), amt(600));
    }

    #[test]
    fn transfer_to_new_recipient_inherits_sender_rate() {
        let mut ledger = make_ledger();
        deposit(&mut ledger, 1, 1_000, 0);
        ledger.set_global_rate(rate(R1), ts(1)).unwrap();

        ledger.transfer(&addr(1), &addr(2), amt(300), ts(2)).unwrap();
        assert_eq!(ledger.locked_rate(&addr(2)), rate(R0));
        assert_eq!(ledger.principal_balance_of(&addr(2)), amt(300));
        assert_eq!(ledger.principal_balance_of(&addr(1)), amt(700));
    }

    #[test]
    fn transfer_to_funded_recipient_keeps_its_rate() {
        let mut ledger = make_ledger();
        ledger.set_global_rate(rate(R1), ts(0)).unwrap();
        deposit(&mut ledger, 2, 1_000, 0);
        ledger.credit_at_rate(&addr(1), amt(1_000), rate(R0), ts(0)).unwrap();

        ledger.transfer(&addr(1), &addr(2), amt(10), ts(5)).unwrap();
        assert_eq!(ledger.locked_rate(&addr(2)), rate(R1));
    }

    #[test]
    fn transfer_max_moves_whole_materialized_balance() {
        let mut ledger = AccrualLedger::with_rate(rate(1_000_000_000_000_000), ts(0));
        deposit(&mut ledger, 1, 1_000, 0);
        let moved = ledger
            .transfer(&addr(1), &addr(2), TokenAmount::MAX, ts(100))
            .unwrap();
        assert_eq!(moved, amt(1_100));
        assert_eq!(ledger.materialized_balance_of(&addr(1), ts(100)).unwrap(), TokenAmount::ZERO);
        assert_eq!(ledger.principal_balance_of(&addr(2)), amt(1_100));
    }

    #[test]
    fn transfer_materializes_recipient_first() {
        let mut ledger = AccrualLedger::with_rate(rate(1_000_000_000_000_000), ts(0));
        deposit(&mut ledger, 1, 1_000, 0);
        deposit(&mut ledger, 2, 1_000, 0);
        ledger.transfer(&addr(1), &addr(2), amt(100), ts(100)).unwrap();
        // Recipient's 100 interest was materialized before the 100 arrived.
        assert_eq!(ledger.principal_balance_of(&addr(2)), amt(1_200));
        assert_eq!(ledger.principal_balance_of(&addr(1)), amt(1_000));
    }

    #[test]
    fn self_transfer_changes_nothing_but_materialization() {
        let mut ledger = AccrualLedger::with_rate(rate(1_000_000_000_000_000), ts(0));
        deposit(&mut ledger, 1, 1_000, 0);
        ledger.transfer(&addr(1), &addr(1), amt(500), ts(100)).unwrap();
        assert_eq!(ledger.principal_balance_of(&addr(1)), amt(1_100));
        assert_eq!(ledger.locked_rate(&addr(1)), rate(1_000_000_000_000_000));
    }

    #[test]
    fn failed_transfer_leaves_both_accounts_untouched() {
        let mut ledger = make_ledger();
        deposit(&mut ledger, 1, 100, 0);
        let err = ledger.transfer(&addr(1), &addr(2), amt(101), ts(0)).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientBalance { .. }));
        assert!(ledger.account(&addr(2)).is_none());
        assert_eq!(ledger.principal_balance_of(&addr(1)), amt(100));
    }

    #[test]
    fn transfer_from_spends_allowance() {
        let mut ledger = make_ledger();
        deposit(&mut ledger, 1, 1_000, 0);
        ledger.approve(&addr(1), &addr(9), amt(400));

        ledger
            .transfer_from(&addr(9), &addr(1), &addr(2), amt(300), ts(0))
            .unwrap();
        assert_eq!(ledger.allowance(&addr(1), &addr(9)), amt(100));
        assert_eq!(ledger.locked_rate(&addr(2)), rate(R0));

        let err = ledger
            .transfer_from(&addr(9), &addr(1), &addr(2), amt(101), ts(0))
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientAllowance { .. }));
        assert_eq!(ledger.principal_balance_of(&addr(1)), amt(700));
    }

    #[test]
    fn unlimited_allowance_is_not_decremented() {
        let mut ledger = make_ledger();
        deposit(&mut ledger, 1, 1_000, 0);
        ledger.approve(&addr(1), &addr(9), TokenAmount::MAX);
        ledger
            .transfer_from(&addr(9), &addr(1), &addr(2), amt(300), ts(0))
            .unwrap();
        assert_eq!(ledger.allowance(&addr(1), &addr(9)), TokenAmount::MAX);
    }

    #[test]
    fn materialize_unknown_account_creates_nothing() {
        let mut ledger = make_ledger();
        assert_eq!(ledger.materialize(&addr(5), ts(100)).unwrap(), TokenAmount::ZERO);
        assert!(ledger.account(&addr(5)).is_none());
    }

    #[test]
    fn zero_balance_account_persists() {
        let mut ledger = make_ledger();
        deposit(&mut ledger, 1, 10, 0);
        ledger.debit(&addr(1), amt(10), ts(0)).unwrap();
        assert!(ledger.account(&addr(1)).is_some());
        assert_eq!(ledger.principal_balance_of(&addr(1)), TokenAmount::ZERO);
    }

    #[test]
    fn supply_views_track_principal_and_materialized() {
        let mut ledger = AccrualLedger::with_rate(rate(1_000_000_000_000_000), ts(0));
        deposit(&mut ledger, 1, 1_000, 0);
        deposit(&mut ledger, 2, 2_000, 0);
        assert_eq!(ledger.total_principal_supply().unwrap(), amt(3_000));
        assert_eq!(ledger.total_materialized_supply(ts(100)).unwrap(), amt(3_300));
    }

    #[test]
    fn events_follow_committed_operations() {
        let mut ledger = AccrualLedger::with_rate(rate(1_000_000_000_000_000), ts(0));
        let events = record_events(&mut ledger);

        deposit(&mut ledger, 1, 1_000, 0);
        ledger.debit(&addr(1), amt(100), ts(100)).unwrap();
        ledger.set_global_rate(rate(1), ts(100)).unwrap();

        let events = events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                LedgerEvent::Credited {
                    account: addr(1),
                    amount: amt(1_000),
                    locked_rate: rate(1_000_000_000_000_000),
                },
                LedgerEvent::InterestMaterialized {
                    account: addr(1),
                    amount: amt(100),
                },
                LedgerEvent::Debited {
                    account: addr(1),
                    amount: amt(100),
                },
                LedgerEvent::InterestRateSet {
                    previous: rate(1_000_000_000_000_000),
                    new: rate(1),
                    at: ts(100),
                },
            ]
        );
    }

    #[test]
    fn save_and_load_round_trip_through_store() {
        let store = NullLedgerStore::new();
        let mut ledger = make_ledger();
        deposit(&mut ledger, 1, 1_000, 0);
        ledger.set_global_rate(rate(R1), ts(5)).unwrap();
        deposit(&mut ledger, 2, 2_000, 6);
        ledger.approve(&addr(1), &addr(2), amt(7));

        assert!(!AccrualLedger::has_snapshot(&store).unwrap());
        ledger.save_to_store(&store).unwrap();
        assert!(AccrualLedger::has_snapshot(&store).unwrap());

        let restored = AccrualLedger::load_from_store(&store).unwrap();
        assert_eq!(restored.current_rate(), rate(R1));
        assert_eq!(restored.rate_history().version(), 1);
        assert_eq!(restored.locked_rate(&addr(1)), rate(R0));
        assert_eq!(restored.principal_balance_of(&addr(2)), amt(2_000));
        assert_eq!(restored.allowance(&addr(1), &addr(2)), amt(7));
        assert_eq!(
            restored.materialized_balance_of(&addr(1), ts(3600)).unwrap(),
            ledger.materialized_balance_of(&addr(1), ts(3600)).unwrap()
        );
    }

    #[test]
    fn save_surfaces_store_failure() {
        let store = NullLedgerStore::new();
        store.fail_writes(true);
        let ledger = make_ledger();
        assert!(matches!(ledger.save_to_store(&store), Err(LedgerError::Store(_))));
    }

    #[test]
    fn failed_transfer_then_restores_both_accounts() {
        let mut ledger = make_ledger();
        deposit(&mut ledger, 1, 1_000, 0);
        let events = record_events(&mut ledger);
        let before = ledger.account(&addr(1)).cloned();

        let result: Result<(), LedgerError> =
            ledger.transfer_then(&addr(1), &addr(2), amt(400), ts(100), |inner, moved| {
                assert_eq!(inner.principal_balance_of(&addr(2)), moved);
                inner.debit(&addr(2), amt(401), ts(100)).map(|_| ())
            });

        assert!(matches!(result, Err(LedgerError::InsufficientBalance { .. })));
        assert_eq!(ledger.account(&addr(1)).cloned(), before);
        assert!(ledger.account(&addr(2)).is_none());
        assert!(events.lock().unwrap().is_empty());
    }

    #[test]
    fn transfer_then_commits_on_success() {
        let mut ledger = make_ledger();
        deposit(&mut ledger, 1, 1_000, 0);
        let burned = ledger
            .transfer_then(&addr(1), &addr(2), amt(400), ts(0), |inner, moved| {
                inner.debit(&addr(2), moved, ts(0))
            })
            .unwrap();
        assert_eq!(burned, amt(400));
        assert_eq!(ledger.principal_balance_of(&addr(1)), amt(600));
        assert_eq!(ledger.principal_balance_of(&addr(2)), TokenAmount::ZERO);
    }
}
