//! Linear interest accrual and account state transitions.
//!
//! Balances grow linearly from an account's last materialization:
//!
//! ```text
//! balance = principal * (PRECISION + frozen_rate * elapsed) / PRECISION
//! ```
//!
//! All arithmetic is integer-only. Intermediates are `u128`, so the only
//! overflow that can surface is a final balance that does not fit in `u64`.
//! The transition functions here are pure; the ledger owns locking,
//! persistence and notification.

use crate::constants::{PRECISION, WITHDRAW_ALL};
use crate::error::LedgerError;
use crate::types::AccountState;

/// Seconds elapsed since `last_update`.
///
/// A clock reading behind a persisted timestamp counts as zero elapsed time,
/// so accrual never runs backwards.
pub fn elapsed(last_update: u64, now: u64) -> u64 {
    now.saturating_sub(last_update)
}

/// Fixed-point growth multiplier `PRECISION + rate * elapsed`.
///
/// Cannot overflow: `(2^64 - 1)^2 + 10^18 < 2^128`.
pub fn multiplier(rate: u64, elapsed: u64) -> u128 {
    PRECISION as u128 + rate as u128 * elapsed as u128
}

/// Interest accrued on `principal` at `rate` over `elapsed` seconds.
///
/// Equal to `floor(principal * rate * elapsed / PRECISION)`. The product is
/// split as `principal * rate = q * PRECISION + r` so that neither partial
/// term exceeds `u128`.
pub fn accrued_interest(principal: u64, rate: u64, elapsed: u64) -> Result<u64, LedgerError> {
    if principal == 0 || rate == 0 || elapsed == 0 {
        return Ok(0);
    }

    let p = PRECISION as u128;
    let scaled = principal as u128 * rate as u128;
    let (q, r) = (scaled / p, scaled % p);

    let whole = q
        .checked_mul(elapsed as u128)
        .ok_or(LedgerError::ArithmeticOverflow)?;
    // r < 10^18 and elapsed < 2^64, so this stays below 2^124.
    let frac = r * elapsed as u128 / p;

    let interest = whole
        .checked_add(frac)
        .ok_or(LedgerError::ArithmeticOverflow)?;
    u64::try_from(interest).map_err(|_| LedgerError::ArithmeticOverflow)
}

/// Observable balance of `state` at time `now`, including unmaterialized interest.
pub fn current_balance(state: &AccountState, now: u64) -> Result<u64, LedgerError> {
    let interest = accrued_interest(
        state.principal,
        state.frozen_rate,
        elapsed(state.last_update, now),
    )?;
    state
        .principal
        .checked_add(interest)
        .ok_or(LedgerError::ArithmeticOverflow)
}

/// Outcome of a state transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    /// Account state after the transition.
    pub state: AccountState,
    /// Interest folded into principal before the operation itself.
    pub interest: u64,
    /// Amount credited or debited by the operation (0 for plain materialization).
    pub amount: u64,
}

impl Transition {
    /// Outcome of an operation that left an unwritten account untouched.
    pub fn untouched() -> Self {
        Self {
            state: AccountState::default(),
            interest: 0,
            amount: 0,
        }
    }
}

/// Fold accrued interest into principal and reset the timestamp to `now`.
///
/// The frozen rate is left untouched. Calling this twice at the same `now`
/// yields zero interest the second time.
pub fn materialize(state: &AccountState, now: u64) -> Result<Transition, LedgerError> {
    let balance = current_balance(state, now)?;
    let interest = balance - state.principal;
    Ok(Transition {
        state: AccountState {
            principal: balance,
            frozen_rate: state.frozen_rate,
            last_update: now,
        },
        interest,
        amount: 0,
    })
}

/// Deposit `amount` at `now`, freezing `global_rate` for the account.
///
/// Interest earned under the previous frozen rate is materialized first, so
/// the new rate applies only from `now` onwards. A zero amount is accepted
/// and still refreshes the rate and timestamp.
pub fn deposit(
    state: &AccountState,
    global_rate: u64,
    amount: u64,
    now: u64,
) -> Result<Transition, LedgerError> {
    let mut t = materialize(state, now)?;
    t.state.frozen_rate = global_rate;
    t.state.principal = t
        .state
        .principal
        .checked_add(amount)
        .ok_or(LedgerError::ArithmeticOverflow)?;
    t.amount = amount;
    Ok(t)
}

/// Withdraw `amount` at `now`.
///
/// [`WITHDRAW_ALL`] resolves to the full current balance. Interest accrued up
/// to `now` is materialized first and may be withdrawn.
///
/// # Errors
///
/// - [`LedgerError::InsufficientBalance`] if the amount exceeds the
///   materialized principal
pub fn withdraw(state: &AccountState, amount: u64, now: u64) -> Result<Transition, LedgerError> {
    let mut t = materialize(state, now)?;
    let requested = if amount == WITHDRAW_ALL {
        t.state.principal
    } else {
        amount
    };
    if requested > t.state.principal {
        return Err(LedgerError::InsufficientBalance {
            available: t.state.principal,
            requested,
        });
    }
    t.state.principal -= requested;
    t.amount = requested;
    Ok(t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const RATE: u64 = 50_000_000_000; // 5e10

    fn funded(principal: u64, frozen_rate: u64, last_update: u64) -> AccountState {
        AccountState {
            principal,
            frozen_rate,
            last_update,
        }
    }

    // --- accrued_interest ---

    #[test]
    fn interest_zero_inputs() {
        assert_eq!(accrued_interest(0, RATE, 100).unwrap(), 0);
        assert_eq!(accrued_interest(100, 0, 100).unwrap(), 0);
        assert_eq!(accrued_interest(100, RATE, 0).unwrap(), 0);
    }

    #[test]
    fn interest_at_full_precision_rate() {
        // Rate of 1.0 per second doubles principal after one second.
        assert_eq!(accrued_interest(1_000, PRECISION, 1).unwrap(), 1_000);
        assert_eq!(accrued_interest(1_000, PRECISION / 2, 3).unwrap(), 1_500);
    }

    #[test]
    fn interest_floors_fractions() {
        // 10 * 5e10 * 2 / 1e18 = 1e-6, floors to zero.
        assert_eq!(accrued_interest(10, RATE, 2).unwrap(), 0);
        // 3 * 0.5 = 1.5 -> 1
        assert_eq!(accrued_interest(3, PRECISION / 2, 1).unwrap(), 1);
    }

    #[test]
    fn interest_matches_naive_formula_when_small() {
        let principal = 123_456_789u64;
        let rate = 987_654_321_000u64;
        let secs = 31_536_000u64;
        let naive = principal as u128 * rate as u128 * secs as u128 / PRECISION as u128;
        assert_eq!(accrued_interest(principal, rate, secs).unwrap() as u128, naive);
    }

    #[test]
    fn interest_huge_elapsed_on_tiny_principal() {
        // 1 * 1 * u64::MAX / 1e18 = 18
        assert_eq!(accrued_interest(1, 1, u64::MAX).unwrap(), 18);
    }

    #[test]
    fn interest_overflow_when_result_unrepresentable() {
        assert_eq!(
            accrued_interest(u64::MAX, PRECISION, 2),
            Err(LedgerError::ArithmeticOverflow)
        );
    }

    #[test]
    fn multiplier_at_extremes() {
        assert_eq!(multiplier(0, u64::MAX), PRECISION as u128);
        let max = multiplier(u64::MAX, u64::MAX);
        assert_eq!(max, (u64::MAX as u128) * (u64::MAX as u128) + PRECISION as u128);
    }

    // --- current_balance ---

    #[test]
    fn balance_reference_scenario() {
        let state = funded(10, RATE, 0);
        let expected = (10u128 * multiplier(RATE, 2) / PRECISION as u128) as u64;
        assert_eq!(current_balance(&state, 2).unwrap(), expected);
        assert_eq!(expected, 10);
    }

    #[test]
    fn balance_of_untouched_account_is_zero() {
        let state = AccountState::default();
        assert_eq!(current_balance(&state, u64::MAX).unwrap(), 0);
    }

    #[test]
    fn balance_clock_behind_is_principal() {
        let state = funded(500, PRECISION, 1_000);
        assert_eq!(current_balance(&state, 10).unwrap(), 500);
    }

    #[test]
    fn balance_overflow_surfaces() {
        let state = funded(u64::MAX, 1, 0);
        assert_eq!(
            current_balance(&state, PRECISION),
            Err(LedgerError::ArithmeticOverflow)
        );
    }

    // --- materialize ---

    #[test]
    fn materialize_folds_interest() {
        let state = funded(1_000, PRECISION / 10, 100);
        let t = materialize(&state, 110).unwrap();
        assert_eq!(t.interest, 1_000);
        assert_eq!(t.state.principal, 2_000);
        assert_eq!(t.state.frozen_rate, PRECISION / 10);
        assert_eq!(t.state.last_update, 110);
        assert_eq!(t.amount, 0);
    }

    #[test]
    fn materialize_idempotent_at_same_instant() {
        let state = funded(1_000, PRECISION / 10, 100);
        let first = materialize(&state, 150).unwrap();
        let second = materialize(&first.state, 150).unwrap();
        assert_eq!(second.interest, 0);
        assert_eq!(second.state, first.state);
    }

    // --- deposit ---

    #[test]
    fn deposit_into_fresh_account() {
        let t = deposit(&AccountState::default(), RATE, 10, 0).unwrap();
        assert_eq!(t.state, funded(10, RATE, 0));
        assert_eq!(t.interest, 0);
        assert_eq!(t.amount, 10);
    }

    #[test]
    fn deposit_captures_old_rate_interest_first() {
        // 1000 at 0.1/s for 10s = +1000 under the old rate, then rate drops.
        let state = funded(1_000, PRECISION / 10, 0);
        let t = deposit(&state, PRECISION / 100, 500, 10).unwrap();
        assert_eq!(t.interest, 1_000);
        assert_eq!(t.state.principal, 2_500);
        assert_eq!(t.state.frozen_rate, PRECISION / 100);
        assert_eq!(t.state.last_update, 10);
    }

    #[test]
    fn zero_deposit_refreshes_rate_and_timestamp() {
        let state = funded(100, PRECISION, 0);
        let t = deposit(&state, 7, 0, 3).unwrap();
        assert_eq!(t.state.frozen_rate, 7);
        assert_eq!(t.state.last_update, 3);
        assert_eq!(t.state.principal, 400);
    }

    #[test]
    fn deposit_overflow_rejected() {
        let state = funded(u64::MAX, 0, 0);
        assert_eq!(
            deposit(&state, 0, 1, 0),
            Err(LedgerError::ArithmeticOverflow)
        );
    }

    // --- withdraw ---

    #[test]
    fn withdraw_includes_accrued_interest() {
        let state = funded(1_000, PRECISION / 10, 0);
        let t = withdraw(&state, 1_500, 10).unwrap();
        assert_eq!(t.interest, 1_000);
        assert_eq!(t.amount, 1_500);
        assert_eq!(t.state.principal, 500);
    }

    #[test]
    fn withdraw_more_than_balance_rejected() {
        let state = funded(1_000, PRECISION / 10, 0);
        assert_eq!(
            withdraw(&state, 2_001, 10),
            Err(LedgerError::InsufficientBalance {
                available: 2_000,
                requested: 2_001,
            })
        );
    }

    #[test]
    fn withdraw_all_empties_account() {
        let state = funded(1_000, PRECISION / 10, 0);
        let t = withdraw(&state, WITHDRAW_ALL, 10).unwrap();
        assert_eq!(t.amount, 2_000);
        assert_eq!(t.state.principal, 0);
        assert_eq!(current_balance(&t.state, 10).unwrap(), 0);
        // Rate and timestamp persist on the emptied account.
        assert_eq!(t.state.frozen_rate, PRECISION / 10);
        assert_eq!(t.state.last_update, 10);
    }

    #[test]
    fn withdraw_all_on_fresh_account_is_zero() {
        let t = withdraw(&AccountState::default(), WITHDRAW_ALL, 42).unwrap();
        assert_eq!(t.amount, 0);
        assert_eq!(t.state.principal, 0);
    }

    // --- proptest ---

    proptest! {
        #[test]
        fn balance_never_below_principal(
            principal in 0u64..=u64::MAX / 2,
            rate in 0u64..=PRECISION,
            last in 0u64..=1_000_000_000,
            dt in 0u64..=1_000_000,
        ) {
            let state = funded(principal, rate, last);
            if let Ok(balance) = current_balance(&state, last + dt) {
                prop_assert!(balance >= principal);
            }
        }

        #[test]
        fn interest_matches_u128_formula(
            principal in 0u64..=u32::MAX as u64,
            rate in 0u64..=1_000_000_000_000u64,
            dt in 0u64..=100_000_000u64,
        ) {
            let expected = principal as u128 * multiplier(rate, dt) / PRECISION as u128;
            let state = funded(principal, rate, 0);
            prop_assert_eq!(current_balance(&state, dt).unwrap() as u128, expected);
        }

        #[test]
        fn deposit_conserves_balance(
            principal in 0u64..=1_000_000_000_000u64,
            old_rate in 0u64..=PRECISION,
            new_rate in 0u64..=PRECISION,
            dt in 0u64..=1_000_000u64,
            amount in 0u64..=1_000_000_000_000u64,
        ) {
            let state = funded(principal, old_rate, 0);
            let before = current_balance(&state, dt).unwrap();
            let t = deposit(&state, new_rate, amount, dt).unwrap();
            prop_assert_eq!(current_balance(&t.state, dt).unwrap(), before + amount);
        }

        #[test]
        fn materialize_twice_is_noop(
            principal in 0u64..=1_000_000_000_000u64,
            rate in 0u64..=PRECISION,
            dt in 0u64..=1_000_000u64,
        ) {
            let state = funded(principal, rate, 0);
            let once = materialize(&state, dt).unwrap();
            let twice = materialize(&once.state, dt).unwrap();
            prop_assert_eq!(twice.interest, 0);
            prop_assert_eq!(twice.state, once.state);
        }

        #[test]
        fn withdraw_all_always_zeroes(
            principal in 0u64..=1_000_000_000_000u64,
            rate in 0u64..=PRECISION,
            dt in 0u64..=1_000_000u64,
        ) {
            let state = funded(principal, rate, 0);
            let t = withdraw(&state, WITHDRAW_ALL, dt).unwrap();
            prop_assert_eq!(t.state.principal, 0);
            prop_assert_eq!(current_balance(&t.state, dt).unwrap(), 0);
        }
    }
}
