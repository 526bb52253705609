use rust_decimal::{Decimal, RoundingStrategy};

use crate::core::{AppError, Result};

/// Decimal places kept for stored amounts (PKR paisa)
pub const MONEY_SCALE: u32 = 2;

/// Decimal places kept for rates derived back from an edited value
pub const RATE_SCALE: u32 = 4;

/// Rounds an amount the way it is stored and printed on the voucher.
///
/// Midpoints round away from zero, so 2.345 becomes 2.35 rather than the
/// banker's 2.34.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Rounds a back-derived rate (percentage or per-unit)
pub fn round_rate(rate: Decimal) -> Decimal {
    rate.round_dp_with_strategy(RATE_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Rejects a calculation that overflowed `Decimal`
pub fn in_range(amount: Option<Decimal>) -> Result<Decimal> {
    amount.ok_or_else(|| AppError::validation("Amount out of range"))
}

/// Compares two amounts allowing `tolerance` of absolute difference
pub fn nearly_equal(a: Decimal, b: Decimal, tolerance: Decimal) -> bool {
    (a - b).abs() <= tolerance
}

/// Formats an amount with exactly two decimal places
pub fn format_amount(amount: Decimal) -> String {
    format!("{:.2}", round_money(amount))
}
