use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::{DEFAULT_LOAN_AMOUNT, MortgageOffer, ViabilityInputs};

/// Storage key of the viability inputs record.
pub const VIABILITY_KEY: &str = "viability";

/// Storage key of the mortgage offers record.
pub const OFFERS_KEY: &str = "mortgage_offers";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Viability inputs together with the mortgage amount derived from them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedViability {
    pub inputs: ViabilityInputs,
    pub mortgage_amount: Decimal,
    pub saved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedOffers {
    pub offers: Vec<MortgageOffer>,
    pub saved_at: DateTime<Utc>,
}

/// Persistence for the two tools' inputs. Each save replaces the previous
/// record under the same key.
#[async_trait]
pub trait InputRepository: Send + Sync {
    // Viability calculator
    async fn save_viability(
        &self,
        inputs: &ViabilityInputs,
        mortgage_amount: Decimal,
    ) -> Result<SavedViability, RepositoryError>;
    async fn load_viability(&self) -> Result<SavedViability, RepositoryError>;

    // Mortgage comparison
    async fn save_offers(
        &self,
        offers: &[MortgageOffer],
    ) -> Result<SavedOffers, RepositoryError>;
    async fn load_offers(&self) -> Result<SavedOffers, RepositoryError>;

    /// Removes both records.
    async fn clear(&self) -> Result<(), RepositoryError>;
}

/// The saved offers, or the default set when none are saved.
pub async fn load_offers_or_default(
    repo: &dyn InputRepository,
) -> Result<Vec<MortgageOffer>, RepositoryError> {
    match repo.load_offers().await {
        Ok(saved) => Ok(saved.offers),
        Err(RepositoryError::NotFound) => Ok(MortgageOffer::default_set(DEFAULT_LOAN_AMOUNT)),
        Err(e) => Err(e),
    }
}

/// The mortgage amount saved with the viability inputs, if any.
pub async fn saved_mortgage_amount(
    repo: &dyn InputRepository,
) -> Result<Option<Decimal>, RepositoryError> {
    match repo.load_viability().await {
        Ok(saved) => {
            debug!(amount = %saved.mortgage_amount, "found saved mortgage amount");
            Ok(Some(saved.mortgage_amount))
        }
        Err(RepositoryError::NotFound) => Ok(None),
        Err(e) => Err(e),
    }
}
