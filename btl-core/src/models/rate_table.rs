//! Stamp Duty Land Tax / Land Transaction Tax band tables.
//!
//! A [`RateTable`] maps every (country, category) pair to a [`CategoryRule`]:
//! an ordered list of marginal bands plus optional first-time-buyer relief
//! bands. Two historical tables are embedded; callers pick one through
//! [`RateSchedule`] or load their own (see the `btl-data` crate).

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Country, PropertyCategory};

/// Errors raised when a band list is not a valid progressive schedule.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RateTableError {
    #[error("{country}/{category}: band list is empty")]
    EmptyBands {
        country: Country,
        category: PropertyCategory,
    },

    #[error("{country}/{category}: band upper bounds must be strictly increasing")]
    NonIncreasingBounds {
        country: Country,
        category: PropertyCategory,
    },

    #[error("{country}/{category}: only the final band may be unbounded")]
    UnboundedBeforeEnd {
        country: Country,
        category: PropertyCategory,
    },

    #[error("{country}/{category}: relief bands must end at a finite ceiling")]
    UnboundedRelief {
        country: Country,
        category: PropertyCategory,
    },

    #[error("{country}/{category}: rate {rate} is outside 0..=1")]
    InvalidRate {
        country: Country,
        category: PropertyCategory,
        rate: Decimal,
    },
}

/// One marginal band: `rate` applies to the slice of the price between the
/// previous band's upper bound and this one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBand {
    /// `None` for the final, unbounded band.
    pub upper_bound: Option<Decimal>,
    /// Marginal rate as a fraction (0.05 means 5%).
    pub rate: Decimal,
}

impl TaxBand {
    pub fn new(
        upper_bound: Decimal,
        rate: Decimal,
    ) -> Self {
        Self {
            upper_bound: Some(upper_bound),
            rate,
        }
    }

    pub fn unbounded(rate: Decimal) -> Self {
        Self {
            upper_bound: None,
            rate,
        }
    }
}

/// Bands for one (country, category) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRule {
    pub bands: Vec<TaxBand>,

    /// Reduced bands used while the price does not exceed the final relief
    /// upper bound. Above that ceiling the standard `bands` apply to the
    /// whole price.
    pub relief: Option<Vec<TaxBand>>,
}

impl CategoryRule {
    pub fn standard(bands: Vec<TaxBand>) -> Self {
        Self {
            bands,
            relief: None,
        }
    }

    pub fn with_relief(
        bands: Vec<TaxBand>,
        relief: Vec<TaxBand>,
    ) -> Self {
        Self {
            bands,
            relief: Some(relief),
        }
    }

    /// Highest price at which relief still applies.
    pub fn relief_ceiling(&self) -> Option<Decimal> {
        self.relief.as_ref()?.last()?.upper_bound
    }

    /// Checks that both band lists are well-formed progressive schedules.
    pub fn validate(
        &self,
        country: Country,
        category: PropertyCategory,
    ) -> Result<(), RateTableError> {
        validate_bands(&self.bands, country, category)?;
        if let Some(relief) = &self.relief {
            validate_bands(relief, country, category)?;
            if relief.iter().any(|band| band.upper_bound.is_none()) {
                return Err(RateTableError::UnboundedRelief { country, category });
            }
        }
        Ok(())
    }
}

fn validate_bands(
    bands: &[TaxBand],
    country: Country,
    category: PropertyCategory,
) -> Result<(), RateTableError> {
    if bands.is_empty() {
        return Err(RateTableError::EmptyBands { country, category });
    }

    let mut previous = Decimal::ZERO;
    for (index, band) in bands.iter().enumerate() {
        if band.rate < Decimal::ZERO || band.rate > Decimal::ONE {
            return Err(RateTableError::InvalidRate {
                country,
                category,
                rate: band.rate,
            });
        }
        match band.upper_bound {
            Some(upper) if upper <= previous => {
                return Err(RateTableError::NonIncreasingBounds { country, category });
            }
            Some(upper) => previous = upper,
            None if index + 1 != bands.len() => {
                return Err(RateTableError::UnboundedBeforeEnd { country, category });
            }
            None => {}
        }
    }
    Ok(())
}

/// A complete set of band rules in force from a given date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateTable {
    pub name: String,
    pub effective_from: NaiveDate,
    rules: BTreeMap<(Country, PropertyCategory), CategoryRule>,
}

impl RateTable {
    /// Creates an empty table. Rules are added with [`RateTable::insert`].
    pub fn new(
        name: impl Into<String>,
        effective_from: NaiveDate,
    ) -> Self {
        Self {
            name: name.into(),
            effective_from,
            rules: BTreeMap::new(),
        }
    }

    /// Validates and stores the rule for one (country, category) pair,
    /// replacing any previous rule.
    pub fn insert(
        &mut self,
        country: Country,
        category: PropertyCategory,
        rule: CategoryRule,
    ) -> Result<(), RateTableError> {
        rule.validate(country, category)?;
        self.rules.insert((country, category), rule);
        Ok(())
    }

    pub fn rule(
        &self,
        country: Country,
        category: PropertyCategory,
    ) -> Option<&CategoryRule> {
        self.rules.get(&(country, category))
    }

    /// Rules in (country, category) order.
    pub fn iter(&self) -> impl Iterator<Item = (Country, PropertyCategory, &CategoryRule)> {
        self.rules
            .iter()
            .map(|((country, category), rule)| (*country, *category, rule))
    }

    /// Every (country, category) pair without a rule.
    pub fn missing_rules(&self) -> Vec<(Country, PropertyCategory)> {
        Country::ALL
            .into_iter()
            .flat_map(|country| {
                PropertyCategory::ALL
                    .into_iter()
                    .map(move |category| (country, category))
            })
            .filter(|key| !self.rules.contains_key(key))
            .collect()
    }

    /// Bands in force before 1 April 2025, with the 3% higher-rates
    /// surcharge in England.
    pub fn pre_april_2025() -> Self {
        let england_next = vec![
            band(250_000, 0, 0),
            band(925_000, 5, 2),
            band(1_500_000, 10, 2),
            TaxBand::unbounded(Decimal::new(12, 2)),
        ];
        let england_additional = vec![
            band(250_000, 3, 2),
            band(925_000, 8, 2),
            band(1_500_000, 13, 2),
            TaxBand::unbounded(Decimal::new(15, 2)),
        ];
        let england_first_relief = vec![band(425_000, 0, 0), band(625_000, 5, 2)];
        let wales_additional = vec![
            band(180_000, 4, 2),
            band(250_000, 75, 3),
            band(400_000, 9, 2),
            band(750_000, 115, 3),
            band(1_500_000, 14, 2),
            TaxBand::unbounded(Decimal::new(16, 2)),
        ];

        Self::embedded(
            "pre-april-2025",
            date(2024, 4, 1),
            england_next,
            england_additional,
            england_first_relief,
            wales_additional,
        )
    }

    /// Bands in force from 1 April 2025: lower nil-rate band and relief
    /// ceiling in England, 5% higher-rates surcharge.
    pub fn from_april_2025() -> Self {
        let england_next = vec![
            band(125_000, 0, 0),
            band(250_000, 2, 2),
            band(925_000, 5, 2),
            band(1_500_000, 10, 2),
            TaxBand::unbounded(Decimal::new(12, 2)),
        ];
        let england_additional = vec![
            band(125_000, 5, 2),
            band(250_000, 7, 2),
            band(925_000, 10, 2),
            band(1_500_000, 15, 2),
            TaxBand::unbounded(Decimal::new(17, 2)),
        ];
        let england_first_relief = vec![band(300_000, 0, 0), band(500_000, 5, 2)];
        let wales_additional = vec![
            band(180_000, 5, 2),
            band(250_000, 85, 3),
            band(400_000, 10, 2),
            band(750_000, 125, 3),
            band(1_500_000, 15, 2),
            TaxBand::unbounded(Decimal::new(17, 2)),
        ];

        Self::embedded(
            "from-april-2025",
            date(2025, 4, 1),
            england_next,
            england_additional,
            england_first_relief,
            wales_additional,
        )
    }

    fn embedded(
        name: &str,
        effective_from: NaiveDate,
        england_next: Vec<TaxBand>,
        england_additional: Vec<TaxBand>,
        england_first_relief: Vec<TaxBand>,
        wales_additional: Vec<TaxBand>,
    ) -> Self {
        // Wales has no first-time buyer relief; main residence bands apply.
        let wales_main = vec![
            band(225_000, 0, 0),
            band(400_000, 6, 2),
            band(750_000, 75, 3),
            band(1_500_000, 10, 2),
            TaxBand::unbounded(Decimal::new(12, 2)),
        ];

        let mut rules = BTreeMap::new();
        rules.insert(
            (Country::England, PropertyCategory::First),
            CategoryRule::with_relief(england_next.clone(), england_first_relief),
        );
        rules.insert(
            (Country::England, PropertyCategory::Next),
            CategoryRule::standard(england_next),
        );
        rules.insert(
            (Country::England, PropertyCategory::Additional),
            CategoryRule::standard(england_additional),
        );
        rules.insert(
            (Country::Wales, PropertyCategory::First),
            CategoryRule::standard(wales_main.clone()),
        );
        rules.insert(
            (Country::Wales, PropertyCategory::Next),
            CategoryRule::standard(wales_main),
        );
        rules.insert(
            (Country::Wales, PropertyCategory::Additional),
            CategoryRule::standard(wales_additional),
        );

        Self {
            name: name.to_string(),
            effective_from,
            rules,
        }
    }
}

fn band(
    upper_bound: i64,
    rate: i64,
    rate_scale: u32,
) -> TaxBand {
    TaxBand::new(Decimal::from(upper_bound), Decimal::new(rate, rate_scale))
}

fn date(
    year: i32,
    month: u32,
    day: u32,
) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
}

/// Which embedded table to use. Chosen once by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RateSchedule {
    #[serde(rename = "pre-april-2025")]
    PreApril2025,
    #[default]
    #[serde(rename = "from-april-2025")]
    FromApril2025,
}

impl RateSchedule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreApril2025 => "pre-april-2025",
            Self::FromApril2025 => "from-april-2025",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pre-april-2025" => Some(Self::PreApril2025),
            "from-april-2025" => Some(Self::FromApril2025),
            _ => None,
        }
    }

    pub fn table(&self) -> RateTable {
        match self {
            Self::PreApril2025 => RateTable::pre_april_2025(),
            Self::FromApril2025 => RateTable::from_april_2025(),
        }
    }

    /// The schedule in force on a completion date.
    pub fn for_completion_date(date: NaiveDate) -> Self {
        if date < RateTable::from_april_2025().effective_from {
            Self::PreApril2025
        } else {
            Self::FromApril2025
        }
    }
}

impl fmt::Display for RateSchedule {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
