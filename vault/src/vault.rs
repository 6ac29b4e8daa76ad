//! The custody façade: deposit, redeem, reward injection.

use rebase_ledger::{AccrualLedger, EventBus};
use rebase_types::{Address, InterestRate, Timestamp, TokenAmount};

use crate::asset::BaseAsset;
use crate::error::VaultError;
use crate::events::VaultEvent;

/// Base-asset custody tied to one ledger.
///
/// The vault does not own the ledger; callers pass it in so that a chain can
/// keep ledger, vault and bridge pool behind one lock.
pub struct Vault {
    address: Address,
    asset: Box<dyn BaseAsset>,
    reserves: TokenAmount,
    events: EventBus<VaultEvent>,
}

impl Vault {
    /// A vault holding its base asset at `address`.
    pub fn new(address: Address, asset: Box<dyn BaseAsset>) -> Self {
        let reserves = asset.balance_of(&address);
        Self {
            address,
            asset,
            reserves,
            events: EventBus::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Base asset currently held for redemptions.
    pub fn reserves(&self) -> TokenAmount {
        self.reserves
    }

    pub fn asset(&self) -> &dyn BaseAsset {
        self.asset.as_ref()
    }

    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: Fn(&VaultEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(listener);
    }

    /// Take `amount` of base asset from `caller` and credit the same amount
    /// on the ledger at the current global rate.
    ///
    /// Returns the rate locked on the caller's account afterwards.
    pub fn deposit(
        &mut self,
        ledger: &mut AccrualLedger,
        caller: &Address,
        amount: TokenAmount,
        now: Timestamp,
    ) -> Result<InterestRate, VaultError> {
        if amount.is_zero() {
            return Err(VaultError::ZeroAmount);
        }
        let reserves = self
            .reserves
            .checked_add(amount)
            .ok_or(rebase_ledger::LedgerError::Overflow)?;

        let rate = ledger.current_rate();
        let custody = self.address;
        let asset = &mut self.asset;
        ledger.credit_then(caller, amount, rate, now, || {
            asset.transfer(caller, &custody, amount).map_err(VaultError::from)
        })?;
        self.reserves = reserves;

        let locked_rate = ledger.locked_rate(caller);
        tracing::info!(account = %caller, %amount, %locked_rate, "deposit");
        self.events.emit(&VaultEvent::Deposited {
            account: *caller,
            amount,
            locked_rate,
        });
        Ok(locked_rate)
    }

    /// Burn `requested` (or the whole balance for `TokenAmount::MAX`) and pay
    /// out the same amount of base asset. Returns the amount paid.
    ///
    /// The burn and the payout are one unit: if the payout fails the burn is
    /// not applied and [`VaultError::RedeemTransferFailed`] is returned.
    pub fn redeem(
        &mut self,
        ledger: &mut AccrualLedger,
        caller: &Address,
        requested: TokenAmount,
        now: Timestamp,
    ) -> Result<TokenAmount, VaultError> {
        let custody = self.address;
        let reserves = self.reserves;
        let asset = &mut self.asset;

        let paid = ledger.debit_then(caller, requested, now, |amount| {
            let remaining =
                reserves
                    .checked_sub(amount)
                    .ok_or_else(|| VaultError::RedeemTransferFailed {
                        amount,
                        reason: format!("vault reserves {reserves} cannot cover it"),
                    })?;
            asset
                .transfer(&custody, caller, amount)
                .map_err(|e| VaultError::RedeemTransferFailed {
                    amount,
                    reason: e.to_string(),
                })?;
            Ok::<_, VaultError>((amount, remaining))
        });

        let (amount, remaining) = match paid {
            Ok(paid) => paid,
            Err(e) => {
                tracing::warn!(account = %caller, requested = %requested, error = %e, "redeem rejected");
                return Err(e);
            }
        };
        self.reserves = remaining;

        tracing::info!(account = %caller, %amount, "redeem");
        self.events.emit(&VaultEvent::Redeemed {
            account: *caller,
            amount,
        });
        Ok(amount)
    }

    /// Add base asset to custody without minting anything.
    pub fn inject_rewards(&mut self, from: &Address, amount: TokenAmount) -> Result<(), VaultError> {
        if amount.is_zero() {
            return Err(VaultError::ZeroAmount);
        }
        let reserves = self
            .reserves
            .checked_add(amount)
            .ok_or(rebase_ledger::LedgerError::Overflow)?;
        self.asset.transfer(from, &self.address, amount)?;
        self.reserves = reserves;

        tracing::info!(%from, %amount, reserves = %self.reserves, "rewards injected");
        self.events.emit(&VaultEvent::RewardsInjected {
            from: *from,
            amount,
        });
        Ok(())
    }
}
