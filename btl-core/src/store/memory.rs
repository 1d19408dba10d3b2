//! In-process backend. Nothing survives the process; used for `--no-save`
//! style runs and tests.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use super::backend::{Backend, RepositoryFactory};
use super::repository::{InputRepository, RepositoryError, SavedOffers, SavedViability};
use crate::{MortgageOffer, ViabilityInputs};

#[derive(Debug, Default)]
pub struct MemoryRepository {
    viability: RwLock<Option<SavedViability>>,
    offers: RwLock<Option<SavedOffers>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InputRepository for MemoryRepository {
    async fn save_viability(
        &self,
        inputs: &ViabilityInputs,
        mortgage_amount: Decimal,
    ) -> Result<SavedViability, RepositoryError> {
        let saved = SavedViability {
            inputs: inputs.clone(),
            mortgage_amount,
            saved_at: Utc::now(),
        };
        *self.viability.write().await = Some(saved.clone());
        Ok(saved)
    }

    async fn load_viability(&self) -> Result<SavedViability, RepositoryError> {
        self.viability
            .read()
            .await
            .clone()
            .ok_or(RepositoryError::NotFound)
    }

    async fn save_offers(
        &self,
        offers: &[MortgageOffer],
    ) -> Result<SavedOffers, RepositoryError> {
        let saved = SavedOffers {
            offers: offers.to_vec(),
            saved_at: Utc::now(),
        };
        *self.offers.write().await = Some(saved.clone());
        Ok(saved)
    }

    async fn load_offers(&self) -> Result<SavedOffers, RepositoryError> {
        self.offers
            .read()
            .await
            .clone()
            .ok_or(RepositoryError::NotFound)
    }

    async fn clear(&self) -> Result<(), RepositoryError> {
        *self.viability.write().await = None;
        *self.offers.write().await = None;
        Ok(())
    }
}

/// Opens an empty [`MemoryRepository`]; the connection string is ignored.
pub struct MemoryRepositoryFactory;

#[async_trait]
impl RepositoryFactory for MemoryRepositoryFactory {
    fn backend(&self) -> Backend {
        Backend::Memory
    }

    async fn open(
        &self,
        _connection_string: &str,
    ) -> Result<Box<dyn InputRepository>, RepositoryError> {
        Ok(Box::new(MemoryRepository::new()))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::store::{load_offers_or_default, saved_mortgage_amount};
    use crate::{DEFAULT_LOAN_AMOUNT, InputField};

    #[tokio::test]
    async fn empty_repository_reports_not_found() {
        let repo = MemoryRepository::new();

        assert_eq!(repo.load_viability().await, Err(RepositoryError::NotFound));
        assert_eq!(repo.load_offers().await, Err(RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn viability_round_trip() {
        let repo = MemoryRepository::new();
        let inputs = ViabilityInputs::default()
            .with_field(InputField::NightlyRate, "210")
            .unwrap();

        let saved = repo.save_viability(&inputs, dec!(315000)).await.unwrap();
        let loaded = repo.load_viability().await.unwrap();

        assert_eq!(loaded, saved);
        assert_eq!(loaded.inputs.rental.nightly_rate, dec!(210));
    }

    #[tokio::test]
    async fn save_replaces_previous_record() {
        let repo = MemoryRepository::new();
        let offers = MortgageOffer::default_set(dec!(100000));

        repo.save_offers(&offers).await.unwrap();
        repo.save_offers(&offers[..1]).await.unwrap();

        assert_eq!(repo.load_offers().await.unwrap().offers.len(), 1);
    }

    #[tokio::test]
    async fn clear_removes_both_records() {
        let repo = MemoryRepository::new();
        repo.save_viability(&ViabilityInputs::default(), dec!(1))
            .await
            .unwrap();
        repo.save_offers(&MortgageOffer::default_set(dec!(1)))
            .await
            .unwrap();

        repo.clear().await.unwrap();

        assert_eq!(repo.load_viability().await, Err(RepositoryError::NotFound));
        assert_eq!(repo.load_offers().await, Err(RepositoryError::NotFound));
    }

    // ── comparison start-up helpers ──────────────────────────────────────
    #[tokio::test]
    async fn nothing_saved_gives_default_offers_and_no_amount() {
        let repo = MemoryRepository::new();

        assert_eq!(
            load_offers_or_default(&repo).await.unwrap(),
            MortgageOffer::default_set(DEFAULT_LOAN_AMOUNT)
        );
        assert_eq!(saved_mortgage_amount(&repo).await, Ok(None));
    }

    #[tokio::test]
    async fn saved_offers_are_returned_as_saved() {
        let repo = MemoryRepository::new();
        let mut offers = MortgageOffer::default_set(dec!(100000));
        offers[0].name = "Bank A".to_string();
        repo.save_offers(&offers).await.unwrap();
        repo.save_viability(&ViabilityInputs::default(), dec!(275000))
            .await
            .unwrap();

        assert_eq!(load_offers_or_default(&repo).await.unwrap(), offers);
        assert_eq!(saved_mortgage_amount(&repo).await, Ok(Some(dec!(275000))));
    }

    #[tokio::test]
    async fn factory_ignores_connection_string() {
        let repo = MemoryRepositoryFactory.open("anything").await.unwrap();

        assert_eq!(repo.load_offers().await, Err(RepositoryError::NotFound));
    }
}
