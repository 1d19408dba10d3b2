//! Stamp Duty Land Tax (England) and Land Transaction Tax (Wales).
//!
//! Tax is progressive: each band's rate applies only to the slice of the
//! price that falls inside the band.
//!
//! | Step | Description |
//! |------|-------------|
//! | 1    | Look up the rule for (country, category) in the rate table |
//! | 2    | If the rule has relief bands and price ≤ relief ceiling, use them |
//! | 3    | Otherwise use the standard bands for the whole price |
//! | 4    | Sum `(min(price, upper) − previous upper) × rate` band by band |
//!
//! No rounding happens here; amounts are rounded for display only.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use btl_core::calculations::StampDutyCalculator;
//! use btl_core::{Country, PropertyCategory, RateTable};
//!
//! let table = RateTable::pre_april_2025();
//! let calculator = StampDutyCalculator::new(&table);
//!
//! let tax = calculator
//!     .calculate(dec!(300000), Country::England, PropertyCategory::Additional)
//!     .unwrap();
//!
//! // 250,000 × 3% + 50,000 × 8%
//! assert_eq!(tax, dec!(11500));
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::{Country, PropertyCategory, RateTable, TaxBand};

/// Errors that can occur during transaction tax calculations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StampDutyError {
    /// The configured rate table does not cover the requested pair.
    #[error("rate table '{table}' has no bands for {country}/{category}")]
    MissingSchedule {
        table: String,
        country: Country,
        category: PropertyCategory,
    },
}

/// Tax charged on one band's slice of the price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandCharge {
    pub lower_bound: Decimal,
    /// `None` for the unbounded top band.
    pub upper_bound: Option<Decimal>,
    pub taxable_amount: Decimal,
    pub rate: Decimal,
    pub tax: Decimal,
}

/// Itemised result of a transaction tax calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StampDutyBreakdown {
    pub price: Decimal,
    pub country: Country,
    pub category: PropertyCategory,

    /// Whether first-time-buyer relief bands were used.
    pub relief_applied: bool,

    pub charges: Vec<BandCharge>,
    pub total: Decimal,
}

/// Calculator bound to one rate table.
#[derive(Debug, Clone, Copy)]
pub struct StampDutyCalculator<'a> {
    table: &'a RateTable,
}

impl<'a> StampDutyCalculator<'a> {
    pub fn new(table: &'a RateTable) -> Self {
        Self { table }
    }

    /// Total tax owed on `price`.
    ///
    /// # Errors
    ///
    /// [`StampDutyError::MissingSchedule`] if the table has no rule for the
    /// pair.
    pub fn calculate(
        &self,
        price: Decimal,
        country: Country,
        category: PropertyCategory,
    ) -> Result<Decimal, StampDutyError> {
        self.breakdown(price, country, category)
            .map(|breakdown| breakdown.total)
    }

    /// Tax owed on `price`, itemised per band.
    pub fn breakdown(
        &self,
        price: Decimal,
        country: Country,
        category: PropertyCategory,
    ) -> Result<StampDutyBreakdown, StampDutyError> {
        let rule = self.table.rule(country, category).ok_or_else(|| {
            StampDutyError::MissingSchedule {
                table: self.table.name.clone(),
                country,
                category,
            }
        })?;

        let (bands, relief_applied) = match (&rule.relief, rule.relief_ceiling()) {
            (Some(relief), Some(ceiling)) if price <= ceiling => (relief.as_slice(), true),
            _ => (rule.bands.as_slice(), false),
        };

        let charges = band_charges(price, bands);
        let total = charges.iter().map(|charge| charge.tax).sum();

        debug!(
            table = %self.table.name,
            %country,
            %category,
            %price,
            %total,
            relief_applied,
            "computed transaction tax"
        );

        Ok(StampDutyBreakdown {
            price,
            country,
            category,
            relief_applied,
            charges,
            total,
        })
    }
}

/// Convenience wrapper around [`StampDutyCalculator::calculate`].
pub fn compute_transaction_tax(
    table: &RateTable,
    price: Decimal,
    country: Country,
    category: PropertyCategory,
) -> Result<Decimal, StampDutyError> {
    StampDutyCalculator::new(table).calculate(price, country, category)
}

/// Sum of marginal band charges for `price`.
pub fn banded_tax(
    price: Decimal,
    bands: &[TaxBand],
) -> Decimal {
    band_charges(price, bands)
        .iter()
        .map(|charge| charge.tax)
        .sum()
}

fn band_charges(
    price: Decimal,
    bands: &[TaxBand],
) -> Vec<BandCharge> {
    let mut charges = Vec::new();
    let mut previous = Decimal::ZERO;

    for band in bands {
        if price <= previous {
            break;
        }
        let slice_top = band.upper_bound.map_or(price, |upper| upper.min(price));
        let taxable_amount = slice_top - previous;
        charges.push(BandCharge {
            lower_bound: previous,
            upper_bound: band.upper_bound,
            taxable_amount,
            rate: band.rate,
            tax: taxable_amount * band.rate,
        });
        match band.upper_bound {
            Some(upper) => previous = upper,
            None => break,
        }
    }

    charges
}
