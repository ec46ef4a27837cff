//! Property-based tests for balance folds.
//!
//! - Balance equals the plain signed sum of movements
//! - Splitting a ledger by a date range never loses a movement

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::balance::{balance, statement};
use super::entry::{LedgerMovement, Sign};

/// Strategy to generate non-negative cent amounts (0.00 to 10,000.00).
fn amount() -> impl Strategy<Value = Decimal> {
    (0i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn sign() -> impl Strategy<Value = Sign> {
    prop_oneof![Just(Sign::Increase), Just(Sign::Decrease)]
}

fn movement() -> impl Strategy<Value = LedgerMovement> {
    (1u32..=28, sign(), amount()).prop_map(|(day, sign, amount)| LedgerMovement {
        date: NaiveDate::from_ymd_opt(2026, 2, day).unwrap(),
        sign,
        amount,
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_balance_is_signed_sum(movements in prop::collection::vec(movement(), 0..40)) {
        let expected: Decimal = movements
            .iter()
            .map(|m| match m.sign {
                Sign::Increase => m.amount,
                Sign::Decrease => -m.amount,
            })
            .sum();
        prop_assert_eq!(balance(&movements), expected);
    }

    #[test]
    fn prop_range_partition_preserves_total(
        movements in prop::collection::vec(movement(), 0..40),
        split in 1u32..28,
    ) {
        let split_date = NaiveDate::from_ymd_opt(2026, 2, split).unwrap();
        let (before, after): (Vec<LedgerMovement>, Vec<LedgerMovement>) =
            movements.iter().copied().partition(|m| m.date <= split_date);
        prop_assert_eq!(balance(&before) + balance(&after), balance(&movements));
    }

    #[test]
    fn prop_statement_ends_at_balance(movements in prop::collection::vec(movement(), 1..40)) {
        let total = balance(&movements);
        let lines = statement(movements, |m| *m);
        prop_assert_eq!(lines.last().map(|l| l.running_balance), Some(total));
    }
}
