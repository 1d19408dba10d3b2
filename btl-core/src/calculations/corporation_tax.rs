//! UK corporation tax on the annual rental profit of a property company.
//!
//! | Profit                         | Tax |
//! |--------------------------------|-----|
//! | ≤ 0                            | 0 |
//! | ≤ lower limit (50,000)         | profit × small profits rate (19%) |
//! | ≤ upper limit (250,000)        | profit × main rate (25%) − (upper − profit) × 3/200 |
//! | above upper limit              | profit × main rate |
//!
//! The marginal relief fraction makes the two schedules meet exactly at the
//! lower limit.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calculations::common::ratio_percent;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CorporationTaxConfigError {
    #[error("small profits rate must be between 0 and 1, got {0}")]
    InvalidSmallProfitsRate(Decimal),

    #[error("main rate must be between 0 and 1, got {0}")]
    InvalidMainRate(Decimal),

    #[error("marginal relief fraction must be between 0 and 1, got {0}")]
    InvalidMarginalReliefFraction(Decimal),

    #[error("lower limit {lower} must not exceed upper limit {upper}")]
    InvertedLimits { lower: Decimal, upper: Decimal },
}

/// Rates and thresholds for one financial year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorporationTaxConfig {
    pub small_profits_rate: Decimal,
    pub main_rate: Decimal,
    pub lower_limit: Decimal,
    pub upper_limit: Decimal,
    pub marginal_relief_fraction: Decimal,
}

impl Default for CorporationTaxConfig {
    fn default() -> Self {
        Self {
            small_profits_rate: Decimal::new(19, 2),
            main_rate: Decimal::new(25, 2),
            lower_limit: Decimal::from(50_000),
            upper_limit: Decimal::from(250_000),
            marginal_relief_fraction: Decimal::new(15, 3),
        }
    }
}

impl CorporationTaxConfig {
    pub fn validate(&self) -> Result<(), CorporationTaxConfigError> {
        let unit = Decimal::ZERO..=Decimal::ONE;
        if !unit.contains(&self.small_profits_rate) {
            return Err(CorporationTaxConfigError::InvalidSmallProfitsRate(
                self.small_profits_rate,
            ));
        }
        if !unit.contains(&self.main_rate) {
            return Err(CorporationTaxConfigError::InvalidMainRate(self.main_rate));
        }
        if !unit.contains(&self.marginal_relief_fraction) {
            return Err(CorporationTaxConfigError::InvalidMarginalReliefFraction(
                self.marginal_relief_fraction,
            ));
        }
        if self.lower_limit > self.upper_limit {
            return Err(CorporationTaxConfigError::InvertedLimits {
                lower: self.lower_limit,
                upper: self.upper_limit,
            });
        }
        Ok(())
    }
}

/// Which part of the schedule a profit fell into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CorporationTaxBand {
    NoProfit,
    SmallProfits,
    MarginalRelief,
    Main,
}

impl CorporationTaxBand {
    pub fn label(&self) -> &'static str {
        match self {
            Self::NoProfit => "No taxable profit",
            Self::SmallProfits => "Small profits rate",
            Self::MarginalRelief => "Marginal relief",
            Self::Main => "Main rate",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorporationTaxResult {
    pub tax: Decimal,
    /// Tax as a percentage of profit; zero when there is no profit.
    pub effective_rate: Decimal,
    pub band: CorporationTaxBand,
}

/// Corporation tax owed on `annual_profit`.
pub fn corporation_tax(
    annual_profit: Decimal,
    config: &CorporationTaxConfig,
) -> CorporationTaxResult {
    if annual_profit <= Decimal::ZERO {
        return CorporationTaxResult {
            tax: Decimal::ZERO,
            effective_rate: Decimal::ZERO,
            band: CorporationTaxBand::NoProfit,
        };
    }

    let (tax, band) = if annual_profit <= config.lower_limit {
        (
            annual_profit * config.small_profits_rate,
            CorporationTaxBand::SmallProfits,
        )
    } else if annual_profit <= config.upper_limit {
        let relief = (config.upper_limit - annual_profit) * config.marginal_relief_fraction;
        (
            annual_profit * config.main_rate - relief,
            CorporationTaxBand::MarginalRelief,
        )
    } else {
        (annual_profit * config.main_rate, CorporationTaxBand::Main)
    };

    CorporationTaxResult {
        tax,
        // Tax never exceeds profit, so the ratio stays within 0..=100.
        effective_rate: ratio_percent(tax, annual_profit).unwrap_or_default(),
        band,
    }
}
