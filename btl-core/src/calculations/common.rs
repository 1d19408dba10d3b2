//! Common utility functions for property calculations.
//!
//! Engines keep full precision internally; rounding helpers here are meant
//! for display and for tests comparing against published figures.

use rust_decimal::{Decimal, RoundingStrategy};

const MONTHS_PER_YEAR: Decimal = Decimal::from_parts(12, 0, 0, false, 0);
const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Rounds a decimal value to exactly two decimal places using half-up rounding.
///
/// Values at exactly 0.005 are rounded away from zero.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use btl_core::calculations::common::round_half_up;
///
/// assert_eq!(round_half_up(dec!(123.454)), dec!(123.45));
/// assert_eq!(round_half_up(dec!(123.455)), dec!(123.46));
/// assert_eq!(round_half_up(dec!(-123.455)), dec!(-123.46));
/// ```
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Rounds to the nearest whole pound, half away from zero.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use btl_core::calculations::common::round_whole;
///
/// assert_eq!(round_whole(dec!(11499.5)), dec!(11500));
/// assert_eq!(round_whole(dec!(11499.49)), dec!(11499));
/// ```
pub fn round_whole(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// `percent` per cent of `value` (`percent_of(200, 25) == Some(50)`), or
/// `None` if the product does not fit in a `Decimal`.
pub fn percent_of(
    value: Decimal,
    percent: Decimal,
) -> Option<Decimal> {
    value.checked_mul(percent)?.checked_div(HUNDRED)
}

/// Converts an annual percentage rate into a monthly fraction.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use btl_core::calculations::common::monthly_rate;
///
/// assert_eq!(monthly_rate(dec!(6)), dec!(0.005));
/// ```
pub fn monthly_rate(annual_percent: Decimal) -> Decimal {
    annual_percent / HUNDRED / MONTHS_PER_YEAR
}

/// Number of monthly payments in a term of whole years.
pub fn months(term_years: u32) -> Decimal {
    Decimal::from(term_years) * MONTHS_PER_YEAR
}

/// `part / whole × 100`, or zero when `whole` is zero. `None` on overflow.
pub fn ratio_percent(
    part: Decimal,
    whole: Decimal,
) -> Option<Decimal> {
    if whole.is_zero() {
        return Some(Decimal::ZERO);
    }
    part.checked_div(whole)?.checked_mul(HUNDRED)
}
