//! en-GB currency and percentage rendering.
//!
//! Amounts are rounded half away from zero at display time only. Negative
//! amounts put the sign before the pound sign (`-£1,234`).

use btl_core::calculations::common::{round_half_up, round_whole};
use rust_decimal::{Decimal, RoundingStrategy};

/// Whole pounds, for totals and tables: `£1,234`.
pub fn gbp(value: Decimal) -> String {
    money(round_whole(value), 0)
}

/// Pounds and pence, for per-period amounts: `£1,234.56`.
pub fn gbp_pence(value: Decimal) -> String {
    money(round_half_up(value), 2)
}

/// A percentage with `dp` decimal places: `7.79%`.
pub fn percent(
    value: Decimal,
    dp: u32,
) -> String {
    let rounded = value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.*}%", dp as usize, rounded)
}

/// A fraction (0.05) shown as a percentage (`5%`, `7.5%`).
pub fn rate(fraction: Decimal) -> String {
    format!("{}%", (fraction * Decimal::ONE_HUNDRED).normalize())
}

/// Renders an already-rounded amount with `dp` decimal places.
fn money(
    rounded: Decimal,
    dp: u32,
) -> String {
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };

    let digits = format!("{:.*}", dp as usize, rounded.abs());
    let (whole, fraction) = match digits.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (digits.as_str(), None),
    };

    let mut out = format!("{sign}£{}", group_thousands(whole));
    if let Some(fraction) = fraction {
        out.push('.');
        out.push_str(fraction);
    }
    out
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}
