//! `btl.toml` configuration.
//!
//! Every section and key is optional; anything missing falls back to the
//! built-in defaults. Command-line flags are applied on top afterwards with
//! the `override_*` methods.
//!
//! ```toml
//! [database]
//! backend = "sqlite"
//! connection_string = "btl.db"
//!
//! [rates]
//! schedule = "pre-april-2025"
//! csv = "rates/custom.csv"
//! effective_from = "2024-10-30"
//!
//! [calculator]
//! stress_rate = 6.0
//!
//! [corporation_tax]
//! main_rate = 0.25
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use btl_core::RateSchedule;
use btl_core::calculations::{CorporationTaxConfig, ViabilityConfig, ViabilityConfigError};
use btl_core::store::{Backend, DbConfig};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error(transparent)]
    Invalid(#[from] ViabilityConfigError),
}

/// Where stamp-duty bands come from. A `csv` path takes precedence over the
/// embedded `schedule`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct RatesSection {
    pub schedule: RateSchedule,
    pub csv: Option<PathBuf>,
    /// Start date recorded on a CSV-loaded table. Defaults to the start of
    /// the embedded schedule.
    pub effective_from: Option<NaiveDate>,
}

/// Partial overrides of the viability calculator's assumptions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct CalculatorSection {
    pub short_let_management_surcharge: Option<Decimal>,
    pub stress_rate: Option<Decimal>,
    pub stress_multiplier: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DbConfig,
    pub rates: RatesSection,
    pub calculator: CalculatorSection,
    pub corporation_tax: CorporationTaxConfig,
}

impl AppConfig {
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn override_database(
        &mut self,
        backend: Option<Backend>,
        connection_string: Option<String>,
    ) {
        if let Some(backend) = backend {
            self.database.backend = backend;
        }
        if let Some(connection_string) = connection_string {
            self.database.connection_string = connection_string;
        }
    }

    pub fn override_rates(
        &mut self,
        schedule: Option<RateSchedule>,
        csv: Option<PathBuf>,
    ) {
        if let Some(schedule) = schedule {
            self.rates.schedule = schedule;
        }
        if csv.is_some() {
            self.rates.csv = csv;
        }
    }

    /// Defaults with the `[calculator]` and `[corporation_tax]` sections
    /// applied, validated.
    pub fn viability_config(&self) -> Result<ViabilityConfig, ConfigError> {
        let defaults = ViabilityConfig::default();
        let config = ViabilityConfig {
            short_let_management_surcharge: self
                .calculator
                .short_let_management_surcharge
                .unwrap_or(defaults.short_let_management_surcharge),
            stress_rate: self.calculator.stress_rate.unwrap_or(defaults.stress_rate),
            stress_multiplier: self
                .calculator
                .stress_multiplier
                .unwrap_or(defaults.stress_multiplier),
            corporation_tax: self.corporation_tax.clone(),
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use btl_core::calculations::CorporationTaxConfigError;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = AppConfig::from_toml("").unwrap();

        assert_eq!(config, AppConfig::default());
        assert_eq!(config.database, DbConfig::default());
        assert_eq!(config.viability_config().unwrap(), ViabilityConfig::default());
    }

    #[test]
    fn sections_are_read() {
        let config = AppConfig::from_toml(
            r#"
            [database]
            backend = "memory"

            [rates]
            schedule = "pre-april-2025"
            csv = "rates.csv"
            effective_from = "2024-10-30"

            [calculator]
            stress_rate = 6.0

            [corporation_tax]
            main_rate = 0.26
            "#,
        )
        .unwrap();

        assert_eq!(config.database.backend, Backend::Memory);
        assert_eq!(config.database.connection_string, "btl.db");
        assert_eq!(config.rates.schedule, RateSchedule::PreApril2025);
        assert_eq!(config.rates.csv, Some(PathBuf::from("rates.csv")));
        assert_eq!(
            config.rates.effective_from,
            NaiveDate::from_ymd_opt(2024, 10, 30)
        );

        let viability = config.viability_config().unwrap();
        assert_eq!(viability.stress_rate, dec!(6.0));
        assert_eq!(viability.stress_multiplier, dec!(1.25));
        assert_eq!(viability.corporation_tax.main_rate, dec!(0.26));
        assert_eq!(viability.corporation_tax.small_profits_rate, dec!(0.19));
    }

    #[test]
    fn flags_override_file() {
        let mut config = AppConfig::from_toml(
            r#"
            [database]
            backend = "memory"
            connection_string = "file.db"
            "#,
        )
        .unwrap();

        config.override_database(Some(Backend::Sqlite), None);
        config.override_rates(Some(RateSchedule::PreApril2025), None);

        assert_eq!(config.database, DbConfig::sqlite("file.db"));
        assert_eq!(config.rates.schedule, RateSchedule::PreApril2025);
        assert_eq!(config.rates.csv, None);
    }

    #[test]
    fn unknown_backend_is_a_parse_error() {
        let result = AppConfig::from_toml("[database]\nbackend = \"postgres\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_schedule_is_a_parse_error() {
        let result = AppConfig::from_toml("[rates]\nschedule = \"next-year\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn invalid_overrides_are_rejected() {
        let config = AppConfig::from_toml("[calculator]\nstress_multiplier = 0\n").unwrap();
        assert!(matches!(
            config.viability_config(),
            Err(ConfigError::Invalid(
                ViabilityConfigError::InvalidStressMultiplier(_)
            ))
        ));

        let config = AppConfig::from_toml(
            "[corporation_tax]\nlower_limit = 300000\nupper_limit = 250000\n",
        )
        .unwrap();
        assert!(matches!(
            config.viability_config(),
            Err(ConfigError::Invalid(ViabilityConfigError::CorporationTax(
                CorporationTaxConfigError::InvertedLimits { .. }
            )))
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = AppConfig::load(Path::new("/nonexistent/btl.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/btl.toml"));
    }
}
