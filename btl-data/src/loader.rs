use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use btl_core::{CategoryRule, Country, PropertyCategory, RateTable, RateTableError, TaxBand};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur when loading a rate table.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RateTableLoaderError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("Failed to read rate table: {0}")]
    Io(String),

    #[error("Unknown country '{0}'")]
    UnknownCountry(String),

    #[error("Unknown property category '{0}'")]
    UnknownCategory(String),

    #[error("Unknown row kind '{0}' (expected 'bands' or 'relief')")]
    UnknownKind(String),

    #[error("{country}/{category}: relief rows without standard bands")]
    ReliefWithoutBands {
        country: Country,
        category: PropertyCategory,
    },

    #[error("Invalid rate table: {0}")]
    InvalidTable(#[from] RateTableError),
}

impl From<csv::Error> for RateTableLoaderError {
    fn from(err: csv::Error) -> Self {
        RateTableLoaderError::CsvParse(err.to_string())
    }
}

/// Whether a row belongs to the standard bands or the relief bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Bands,
    Relief,
}

impl RecordKind {
    pub fn parse(s: &str) -> Result<Self, RateTableLoaderError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bands" => Ok(Self::Bands),
            "relief" => Ok(Self::Relief),
            _ => Err(RateTableLoaderError::UnknownKind(s.to_string())),
        }
    }
}

/// A single row of a rate table CSV file.
///
/// - `country`: `england` or `wales`
/// - `category`: `first`, `next` or `additional`
/// - `kind`: `bands` or `relief`
/// - `upper_bound`: the band's upper price bound (empty for unbounded)
/// - `rate`: the marginal rate as a fraction (e.g. 0.05 for 5%)
///
/// Rows of one (country, category, kind) are read in file order, lowest
/// band first.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RateBandRecord {
    pub country: String,
    pub category: String,
    pub kind: String,
    #[serde(deserialize_with = "deserialize_optional_decimal")]
    pub upper_bound: Option<Decimal>,
    pub rate: Decimal,
}

fn deserialize_optional_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s
            .trim()
            .parse::<Decimal>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

#[derive(Default)]
struct PendingRule {
    bands: Vec<TaxBand>,
    relief: Vec<TaxBand>,
}

/// Loader for stamp-duty rate tables from CSV files.
pub struct RateTableLoader;

impl RateTableLoader {
    /// Parse rate band records from a CSV reader.
    pub fn parse<R: Read>(reader: R) -> Result<Vec<RateBandRecord>, RateTableLoaderError> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut records = Vec::new();

        for result in csv_reader.deserialize() {
            let record: RateBandRecord = result?;
            records.push(record);
        }

        Ok(records)
    }

    /// Group records per (country, category) and build a validated table.
    ///
    /// Pairs that never appear in `records` are left out of the table;
    /// [`RateTable::missing_rules`] reports them.
    pub fn build(
        name: &str,
        effective_from: NaiveDate,
        records: &[RateBandRecord],
    ) -> Result<RateTable, RateTableLoaderError> {
        let mut pending: BTreeMap<(Country, PropertyCategory), PendingRule> = BTreeMap::new();

        for record in records {
            let country = Country::parse(&record.country)
                .ok_or_else(|| RateTableLoaderError::UnknownCountry(record.country.clone()))?;
            let category = PropertyCategory::parse(&record.category)
                .ok_or_else(|| RateTableLoaderError::UnknownCategory(record.category.clone()))?;
            let band = TaxBand {
                upper_bound: record.upper_bound,
                rate: record.rate,
            };

            let rule = pending.entry((country, category)).or_default();
            match RecordKind::parse(&record.kind)? {
                RecordKind::Bands => rule.bands.push(band),
                RecordKind::Relief => rule.relief.push(band),
            }
        }

        let mut table = RateTable::new(name, effective_from);
        for ((country, category), rule) in pending {
            if rule.bands.is_empty() {
                return Err(RateTableLoaderError::ReliefWithoutBands { country, category });
            }
            let rule = if rule.relief.is_empty() {
                CategoryRule::standard(rule.bands)
            } else {
                CategoryRule::with_relief(rule.bands, rule.relief)
            };
            table.insert(country, category, rule)?;
        }

        debug!(
            name,
            %effective_from,
            missing = table.missing_rules().len(),
            "built rate table"
        );
        Ok(table)
    }

    /// Parse and build in one step from a file on disk.
    pub fn load_from_path(
        path: &Path,
        name: &str,
        effective_from: NaiveDate,
    ) -> Result<RateTable, RateTableLoaderError> {
        let file = File::open(path)
            .map_err(|e| RateTableLoaderError::Io(format!("{}: {e}", path.display())))?;
        let records = Self::parse(file)?;
        Self::build(name, effective_from, &records)
    }
}
