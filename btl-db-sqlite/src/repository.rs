use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use btl_core::store::{OFFERS_KEY, SavedOffers, SavedViability, VIABILITY_KEY};
use btl_core::{InputRepository, MortgageOffer, RepositoryError, ViabilityInputs};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::debug;

/// Stored JSON of the `viability` row.
#[derive(Serialize, Deserialize)]
struct ViabilityPayload {
    inputs: ViabilityInputs,
    mortgage_amount: Decimal,
}

/// Stored JSON of the `mortgage_offers` row.
#[derive(Serialize, Deserialize)]
struct OffersPayload {
    offers: Vec<MortgageOffer>,
}

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Connect to a sqlx-style URL (`sqlite:btl.db?mode=rwc`,
    /// `sqlite::memory:`).
    ///
    /// An in-memory database lives only as long as its connection, so it is
    /// held on a single connection that never expires.
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
        } else {
            SqlitePoolOptions::new()
        };

        let pool = options
            .connect(database_url)
            .await
            .with_context(|| format!("Failed to connect to database: {}", database_url))?;
        Ok(Self { pool })
    }

    pub async fn new_with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn upsert<T: Serialize>(
        &self,
        key: &str,
        payload: &T,
    ) -> Result<DateTime<Utc>, RepositoryError> {
        let json = serde_json::to_string(payload)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO saved_inputs (key, payload, saved_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET payload = excluded.payload, saved_at = excluded.saved_at",
        )
        .bind(key)
        .bind(&json)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        debug!(key, bytes = json.len(), "saved inputs");
        Ok(now)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<(T, DateTime<Utc>), RepositoryError> {
        let row = sqlx::query("SELECT payload, saved_at FROM saved_inputs WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?
            .ok_or(RepositoryError::NotFound)?;

        let json: String = row
            .try_get("payload")
            .map_err(|e| RepositoryError::Database(format!("Failed to get payload: {}", e)))?;
        let saved_at: DateTime<Utc> = row
            .try_get("saved_at")
            .map_err(|e| RepositoryError::Database(format!("Failed to get saved_at: {}", e)))?;
        let payload = serde_json::from_str(&json)
            .map_err(|e| RepositoryError::Serialization(format!("{key}: {e}")))?;

        Ok((payload, saved_at))
    }
}

#[async_trait]
impl InputRepository for SqliteRepository {
    async fn save_viability(
        &self,
        inputs: &ViabilityInputs,
        mortgage_amount: Decimal,
    ) -> Result<SavedViability, RepositoryError> {
        let payload = ViabilityPayload {
            inputs: inputs.clone(),
            mortgage_amount,
        };
        let saved_at = self.upsert(VIABILITY_KEY, &payload).await?;

        Ok(SavedViability {
            inputs: payload.inputs,
            mortgage_amount,
            saved_at,
        })
    }

    async fn load_viability(&self) -> Result<SavedViability, RepositoryError> {
        let (payload, saved_at): (ViabilityPayload, _) = self.fetch(VIABILITY_KEY).await?;

        Ok(SavedViability {
            inputs: payload.inputs,
            mortgage_amount: payload.mortgage_amount,
            saved_at,
        })
    }

    async fn save_offers(
        &self,
        offers: &[MortgageOffer],
    ) -> Result<SavedOffers, RepositoryError> {
        let payload = OffersPayload {
            offers: offers.to_vec(),
        };
        let saved_at = self.upsert(OFFERS_KEY, &payload).await?;

        Ok(SavedOffers {
            offers: payload.offers,
            saved_at,
        })
    }

    async fn load_offers(&self) -> Result<SavedOffers, RepositoryError> {
        let (payload, saved_at): (OffersPayload, _) = self.fetch(OFFERS_KEY).await?;

        Ok(SavedOffers {
            offers: payload.offers,
            saved_at,
        })
    }

    async fn clear(&self) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM saved_inputs")
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use btl_core::{InputField, OfferField, PaymentType};
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use sqlx::sqlite::SqlitePoolOptions;

    use super::*;

    async fn setup_test_db() -> SqliteRepository {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");

        let repo = SqliteRepository::new_with_pool(pool).await;
        repo.run_migrations()
            .await
            .expect("Failed to run migrations");
        repo
    }

    #[tokio::test]
    async fn test_load_viability_not_found() {
        let repo = setup_test_db().await;

        assert_eq!(repo.load_viability().await, Err(RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_load_offers_not_found() {
        let repo = setup_test_db().await;

        assert_eq!(repo.load_offers().await, Err(RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_save_and_load_viability() {
        let repo = setup_test_db().await;
        let inputs = ViabilityInputs::default()
            .with_field(InputField::Country, "wales")
            .unwrap()
            .with_field(InputField::OccupancyPercent, "65.5")
            .unwrap();

        let saved = repo.save_viability(&inputs, dec!(301500.50)).await.unwrap();
        let loaded = repo.load_viability().await.unwrap();

        assert_eq!(loaded.inputs, inputs);
        assert_eq!(loaded.mortgage_amount, dec!(301500.50));
        assert_eq!(loaded.saved_at.timestamp(), saved.saved_at.timestamp());
    }

    #[tokio::test]
    async fn test_save_and_load_offers() {
        let repo = setup_test_db().await;
        let mut offers = MortgageOffer::default_set(dec!(315000));
        offers[1] = offers[1]
            .with_field(OfferField::PaymentType, "interestOnly")
            .unwrap()
            .with_field(OfferField::MonthlyFee, "12.50")
            .unwrap();

        repo.save_offers(&offers).await.unwrap();
        let loaded = repo.load_offers().await.unwrap();

        assert_eq!(loaded.offers, offers);
        assert_eq!(loaded.offers[1].payment_type, PaymentType::InterestOnly);
    }

    #[tokio::test]
    async fn test_save_replaces_existing_row() {
        let repo = setup_test_db().await;

        repo.save_viability(&ViabilityInputs::default(), dec!(1))
            .await
            .unwrap();
        repo.save_viability(&ViabilityInputs::default(), dec!(2))
            .await
            .unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM saved_inputs")
            .fetch_one(repo.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(
            repo.load_viability().await.unwrap().mortgage_amount,
            dec!(2)
        );
    }

    #[tokio::test]
    async fn test_clear_removes_everything() {
        let repo = setup_test_db().await;
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

    #[tokio::test]
    async fn test_corrupt_payload_is_a_serialization_error() {
        let repo = setup_test_db().await;
        sqlx::query("INSERT INTO saved_inputs (key, payload, saved_at) VALUES (?, ?, ?)")
            .bind(OFFERS_KEY)
            .bind("{not json")
            .bind(Utc::now())
            .execute(repo.pool())
            .await
            .unwrap();

        assert!(matches!(
            repo.load_offers().await,
            Err(RepositoryError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_key_is_rejected_by_schema() {
        let repo = setup_test_db().await;

        let result = sqlx::query("INSERT INTO saved_inputs (key, payload, saved_at) VALUES (?, ?, ?)")
            .bind("history")
            .bind("{}")
            .bind(Utc::now())
            .execute(repo.pool())
            .await;

        assert!(result.is_err());
    }
}
