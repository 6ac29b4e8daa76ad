#![no_main]

use libfuzzer_sys::fuzz_target;

use rebase_ledger::AccountState;
use rebase_types::{InterestRate, Timestamp, TokenAmount, U256};

fn word(bytes: &[u8]) -> U256 {
    U256::from_big_endian(bytes)
}

// Accrual on arbitrary principal, rate and timestamps either overflows cleanly
// or never reports less than principal.
fuzz_target!(|data: &[u8]| {
    if data.len() < 80 {
        return;
    }
    let mut state = AccountState {
        principal: TokenAmount::new(word(&data[0..32])),
        locked_rate: InterestRate::new(word(&data[32..64])),
        last_update: Timestamp::new(u64::from_be_bytes(data[64..72].try_into().unwrap())),
    };
    let now = Timestamp::new(u64::from_be_bytes(data[72..80].try_into().unwrap()));

    if let Some(balance) = state.materialized_balance_checked(now) {
        assert!(balance >= state.principal);
        let before = state.principal;
        if state.materialize(now).is_ok() {
            assert_eq!(state.principal, balance);
            assert!(state.principal >= before);
        }
    }
});
