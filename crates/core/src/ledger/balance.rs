//! Client balance folds.
//!
//! Balance = Σ(sign × amount). Statements add a running balance per line.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ardesk_shared::types::round_currency;

use super::entry::LedgerMovement;
use super::error::LedgerError;

/// Inclusive date filter. Open ends are unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// First included date.
    pub from: Option<NaiveDate>,
    /// Last included date.
    pub to: Option<NaiveDate>,
}

impl DateRange {
    /// Builds a range, rejecting `from > to`.
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<Self, LedgerError> {
        if let (Some(f), Some(t)) = (from, to)
            && f > t
        {
            return Err(LedgerError::InvalidDateRange { from: f, to: t });
        }
        Ok(Self { from, to })
    }
}

/// Folds movements into a balance.
pub fn balance<'a, I>(movements: I) -> Decimal
where
    I: IntoIterator<Item = &'a LedgerMovement>,
{
    movements
        .into_iter()
        .fold(Decimal::ZERO, |acc, m| round_currency(acc + m.signed_amount()))
}

/// One statement line: a movement and the balance after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementLine<T> {
    /// The underlying entry.
    #[serde(flatten)]
    pub entry: T,
    /// `sign × amount` of this line.
    pub signed_amount: Decimal,
    /// Balance after applying this line.
    pub running_balance: Decimal,
}

/// Attaches running balances to entries already sorted by `(date, id)`.
pub fn statement<T, F>(entries: Vec<T>, movement_of: F) -> Vec<StatementLine<T>>
where
    F: Fn(&T) -> LedgerMovement,
{
    let mut running = Decimal::ZERO;
    entries
        .into_iter()
        .map(|entry| {
            let signed_amount = movement_of(&entry).signed_amount();
            running = round_currency(running + signed_amount);
            StatementLine {
                entry,
                signed_amount,
                running_balance: running,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Sign;
    use rust_decimal_macros::dec;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, day).unwrap()
    }

    fn mv(day: u32, sign: Sign, amount: Decimal) -> LedgerMovement {
        LedgerMovement {
            date: d(day),
            sign,
            amount,
        }
    }

    #[test]
    fn test_balance_sums_signed_amounts() {
        let movements = vec![
            mv(1, Sign::Increase, dec!(100)),
            mv(2, Sign::Increase, dec!(50)),
            mv(3, Sign::Decrease, dec!(120)),
        ];
        assert_eq!(balance(&movements), dec!(30));
    }

    #[test]
    fn test_balance_can_go_negative() {
        let movements = vec![mv(1, Sign::Decrease, dec!(20))];
        assert_eq!(balance(&movements), dec!(-20));
    }

    #[test]
    fn test_date_range_rejects_inverted() {
        assert!(matches!(
            DateRange::new(Some(d(9)), Some(d(2))),
            Err(LedgerError::InvalidDateRange { .. })
        ));
        assert!(DateRange::new(Some(d(2)), Some(d(2))).is_ok());
    }

    #[test]
    fn test_statement_running_balance() {
        let movements = vec![
            mv(1, Sign::Increase, dec!(100)),
            mv(2, Sign::Decrease, dec!(40)),
            mv(3, Sign::Increase, dec!(5.5)),
        ];
        let lines = statement(movements, |m| *m);
        let running: Vec<Decimal> = lines.iter().map(|l| l.running_balance).collect();
        assert_eq!(running, vec![dec!(100), dec!(60), dec!(65.5)]);
        assert_eq!(lines[1].signed_amount, dec!(-40));
    }
}
