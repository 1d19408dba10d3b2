use async_trait::async_trait;
use btl_core::store::{Backend, RepositoryFactory};
use btl_core::{InputRepository, RepositoryError};

use crate::repository::SqliteRepository;

/// Turns the configured connection string into a sqlx URL.
///
/// * `":memory:"` becomes `sqlite::memory:`.
/// * Anything already starting with `sqlite:` is passed through.
/// * A bare path becomes `sqlite:<path>?mode=rwc` so the file is created if
///   missing.
fn database_url(connection_string: &str) -> String {
    let trimmed = connection_string.trim();
    if trimmed == ":memory:" {
        "sqlite::memory:".to_string()
    } else if trimmed.starts_with("sqlite:") {
        trimmed.to_string()
    } else {
        format!("sqlite:{}?mode=rwc", trimmed)
    }
}

/// Opens [`Backend::Sqlite`] repositories and migrates them.
///
/// ```rust,no_run
/// use btl_core::store::{DbConfig, RepositoryRegistry};
/// use btl_db_sqlite::SqliteRepositoryFactory;
///
/// # async fn open() -> Result<(), btl_core::RepositoryError> {
/// let mut registry = RepositoryRegistry::new();
/// registry.register(Box::new(SqliteRepositoryFactory));
/// let _repo = registry.create(&DbConfig::sqlite("btl.db")).await?;
/// # Ok(())
/// # }
/// ```
pub struct SqliteRepositoryFactory;

#[async_trait]
impl RepositoryFactory for SqliteRepositoryFactory {
    fn backend(&self) -> Backend {
        Backend::Sqlite
    }

    async fn open(
        &self,
        connection_string: &str,
    ) -> Result<Box<dyn InputRepository>, RepositoryError> {
        let url = database_url(connection_string);
        let repo = SqliteRepository::new(&url)
            .await
            .map_err(|e| RepositoryError::Connection(format!("{e:#}")))?;
        repo.run_migrations()
            .await
            .map_err(|e| RepositoryError::Database(format!("{e:#}")))?;
        Ok(Box::new(repo))
    }
}

#[cfg(test)]
mod tests {
    use btl_core::RepositoryError;
    use btl_core::store::{Backend, RepositoryFactory};
    use pretty_assertions::assert_eq;

    use super::{SqliteRepositoryFactory, database_url};

    #[test]
    fn serves_sqlite_backend() {
        assert_eq!(SqliteRepositoryFactory.backend(), Backend::Sqlite);
    }

    #[test]
    fn database_url_maps_memory_and_paths() {
        assert_eq!(database_url(":memory:"), "sqlite::memory:");
        assert_eq!(database_url("btl.db"), "sqlite:btl.db?mode=rwc");
        assert_eq!(database_url("sqlite:other.db"), "sqlite:other.db");
    }

    #[tokio::test]
    async fn opens_migrated_in_memory_database() {
        let repo = SqliteRepositoryFactory.open(":memory:").await.unwrap();

        assert_eq!(repo.load_viability().await, Err(RepositoryError::NotFound));
    }
}
