use proptest::prelude::*;

use rebase_ledger::{AccountState, AccrualLedger, LedgerError};
use rebase_types::{Address, InterestRate, Timestamp, TokenAmount, PRECISION_FACTOR, U256};

fn addr(n: u64) -> Address {
    Address::from_low_u64_be(n)
}

proptest! {
    /// Balance equals principal × (1e18 + rate × elapsed) / 1e18, truncated.
    #[test]
    fn balance_matches_linear_formula(
        principal in 0u128..1_000_000_000_000_000_000_000,
        rate in 0u64..1_000_000_000_000,
        elapsed in 0u64..10 * 365 * 86_400,
    ) {
        let state = AccountState {
            principal: TokenAmount::from(principal),
            locked_rate: InterestRate::from(rate),
            last_update: Timestamp::new(0),
        };
        let expected = U256::from(principal)
            * (PRECISION_FACTOR + U256::from(rate) * U256::from(elapsed))
            / PRECISION_FACTOR;
        prop_assert_eq!(
            state.materialized_balance_checked(Timestamp::new(elapsed)),
            Some(TokenAmount::new(expected))
        );
    }

    /// Equal time steps add equal interest, up to one unit of truncation.
    #[test]
    fn equal_intervals_accrue_equal_interest(
        principal in 0u128..1_000_000_000_000_000_000_000,
        rate in 0u64..1_000_000_000_000,
        t0 in 0u64..1_000_000,
        step in 0u64..1_000_000,
    ) {
        let mut ledger = AccrualLedger::with_rate(InterestRate::from(rate), Timestamp::new(0));
        ledger
            .credit_at_rate(&addr(1), TokenAmount::from(principal), InterestRate::from(rate), Timestamp::new(0))
            .unwrap();
        let at = |t: u64| ledger.materialized_balance_of(&addr(1), Timestamp::new(t)).unwrap().raw();
        let (b0, b1, b2) = (at(t0), at(t0 + step), at(t0 + 2 * step));
        let first = b1 - b0;
        let second = b2 - b1;
        let gap = if first > second { first - second } else { second - first };
        prop_assert!(gap <= U256::one());
    }

    /// Materializing halfway stays within two units of a single read at the end.
    #[test]
    fn split_materialization_is_within_two_units(
        principal in 1u128..1_000_000_000_000_000_000_000,
        rate in 1u64..1_000_000_000_000,
        t1 in 1u64..1_000_000,
        t2 in 1u64..1_000_000,
    ) {
        let start = AccountState {
            principal: TokenAmount::from(principal),
            locked_rate: InterestRate::from(rate),
            last_update: Timestamp::new(0),
        };
        let end = Timestamp::new(t1 + t2);
        let direct = start.materialized_balance_checked(end).unwrap();

        let mut split = start.clone();
        split.materialize(Timestamp::new(t1)).unwrap();
        let stepped = split.materialized_balance_checked(end).unwrap();

        // Each truncation loses under one unit, and the second one is scaled by
        // a factor below two.
        prop_assert!(stepped.saturating_add(TokenAmount::from(2u64)) >= direct);
    }

    /// The displayed balance never drops below principal and never shrinks with time.
    #[test]
    fn balance_is_monotonic_in_time(
        principal in 0u128..1_000_000_000_000_000_000,
        rate in 0u64..1_000_000_000_000,
        t1 in 0u64..1_000_000,
        dt in 0u64..1_000_000,
    ) {
        let mut ledger = AccrualLedger::with_rate(InterestRate::from(rate), Timestamp::new(0));
        ledger
            .credit_at_rate(&addr(1), TokenAmount::from(principal), InterestRate::from(rate), Timestamp::new(0))
            .unwrap();
        let b1 = ledger.materialized_balance_of(&addr(1), Timestamp::new(t1)).unwrap();
        let b2 = ledger.materialized_balance_of(&addr(1), Timestamp::new(t1 + dt)).unwrap();
        prop_assert!(b1 >= ledger.principal_balance_of(&addr(1)));
        prop_assert!(b2 >= b1);
    }

    /// Accepted rate changes never raise the global rate.
    #[test]
    fn global_rate_never_increases(changes in proptest::collection::vec(0u64..100_000, 1..20)) {
        let mut ledger = AccrualLedger::with_rate(InterestRate::from(50_000u64), Timestamp::new(0));
        let mut last = ledger.current_rate();
        for (i, r) in changes.into_iter().enumerate() {
            let requested = InterestRate::from(r);
            match ledger.set_global_rate(requested, Timestamp::new(i as u64)) {
                Ok(()) => prop_assert!(requested <= last),
                Err(LedgerError::RateIncreaseRejected { .. }) => prop_assert!(requested > last),
                Err(other) => prop_assert!(false, "unexpected error {other:?}"),
            }
            prop_assert!(ledger.current_rate() <= last);
            last = ledger.current_rate();
        }
    }

    /// A transfer conserves the sum of both materialized balances.
    #[test]
    fn transfer_conserves_materialized_total(
        a in 1u128..1_000_000_000_000_000_000,
        b in 0u128..1_000_000_000_000_000_000,
        pct in 0u128..=100,
        elapsed in 0u64..1_000_000,
    ) {
        let rate = InterestRate::DEFAULT_INITIAL;
        let mut ledger = AccrualLedger::with_rate(rate, Timestamp::new(0));
        ledger.credit_at_rate(&addr(1), TokenAmount::from(a), rate, Timestamp::new(0)).unwrap();
        if b > 0 {
            ledger.credit_at_rate(&addr(2), TokenAmount::from(b), rate, Timestamp::new(0)).unwrap();
        }
        let now = Timestamp::new(elapsed);
        let before = ledger.total_materialized_supply(now).unwrap();
        let amount = TokenAmount::from(a * pct / 100);
        ledger.transfer(&addr(1), &addr(2), amount, now).unwrap();
        prop_assert_eq!(ledger.total_materialized_supply(now).unwrap(), before);
        prop_assert_eq!(ledger.total_principal_supply().unwrap(), before);
    }

    /// A failing debit leaves the ledger exactly as it was.
    #[test]
    fn failed_debit_is_side_effect_free(
        principal in 0u128..1_000_000_000,
        excess in 1u128..1_000_000,
        elapsed in 0u64..1_000_000,
    ) {
        let rate = InterestRate::DEFAULT_INITIAL;
        let mut ledger = AccrualLedger::with_rate(rate, Timestamp::new(0));
        ledger.credit_at_rate(&addr(1), TokenAmount::from(principal), rate, Timestamp::new(0)).unwrap();
        let before = ledger.account(&addr(1)).cloned();
        let now = Timestamp::new(elapsed);
        let balance = ledger.materialized_balance_of(&addr(1), now).unwrap();
        let request = balance.checked_add(TokenAmount::from(excess)).unwrap();
        prop_assert!(ledger.debit(&addr(1), request, now).is_err());
        prop_assert_eq!(ledger.account(&addr(1)).cloned(), before);
    }
}
