//! Currency rounding and tolerance rules.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Every monetary value crossing a boundary (request parsing, loop step,
//! persistence) goes through [`round_currency`].

use rust_decimal::{Decimal, RoundingStrategy};

/// Number of decimal places kept for every amount.
pub const CURRENCY_DP: u32 = 2;

/// Rounding slack accepted when comparing an amount against a ceiling (one cent).
pub const TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Rounds an amount to two decimal places, half away from zero.
#[must_use]
pub fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(CURRENCY_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// `max(0, round(a - b))`.
#[must_use]
pub fn floored_difference(a: Decimal, b: Decimal) -> Decimal {
    round_currency(a - b).max(Decimal::ZERO)
}

/// Returns true when `requested` does not fit under `ceiling`.
///
/// The ceiling may be overshot by at most [`TOLERANCE`]. An exhausted
/// ceiling (zero or below) accepts nothing, so the tolerance cannot be used
/// to draw a cent from an empty pool.
#[must_use]
pub fn exceeds_ceiling(requested: Decimal, ceiling: Decimal) -> bool {
    if ceiling <= Decimal::ZERO {
        return requested > Decimal::ZERO;
    }
    requested > ceiling + TOLERANCE
}

/// Returns true when the amount is at or below the tolerance (nothing left to place).
#[must_use]
pub fn is_negligible(amount: Decimal) -> bool {
    amount <= TOLERANCE
}
