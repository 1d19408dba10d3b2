//! Choosing and opening a storage backend.
//!
//! The memory backend lives in this crate and is always available. Other
//! backends live in their own crates and are registered by the binary.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::memory::MemoryRepositoryFactory;
use super::repository::{InputRepository, RepositoryError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Held in the process only.
    Memory,
    /// A SQLite file, or `:memory:`.
    #[default]
    Sqlite,
}

impl Backend {
    pub const ALL: [Backend; 2] = [Backend::Memory, Backend::Sqlite];

    pub fn as_str(self) -> &'static str {
        match self {
            Backend::Memory => "memory",
            Backend::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = RepositoryError;

    /// Case-insensitive; an unknown name is a configuration error.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|backend| backend.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                RepositoryError::Configuration(format!(
                    "unknown backend '{wanted}' (expected memory or sqlite)"
                ))
            })
    }
}

/// The `[database]` section of the configuration file.
///
/// `connection_string` means whatever the backend makes of it: a file path
/// or `:memory:` for SQLite, nothing for the memory backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    pub backend: Backend,
    pub connection_string: String,
}

impl DbConfig {
    pub fn memory() -> Self {
        Self {
            backend: Backend::Memory,
            connection_string: String::new(),
        }
    }

    pub fn sqlite(connection_string: impl Into<String>) -> Self {
        Self {
            backend: Backend::Sqlite,
            connection_string: connection_string.into(),
        }
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self::sqlite("btl.db")
    }
}

/// Opens repositories for one [`Backend`].
#[async_trait]
pub trait RepositoryFactory: Send + Sync {
    fn backend(&self) -> Backend;

    /// Opens (or creates) the store, running any migrations it needs.
    async fn open(
        &self,
        connection_string: &str,
    ) -> Result<Box<dyn InputRepository>, RepositoryError>;
}

/// The backends compiled into a binary.
pub struct RepositoryRegistry {
    factories: HashMap<Backend, Box<dyn RepositoryFactory>>,
}

impl RepositoryRegistry {
    /// A registry with only the memory backend.
    pub fn new() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };
        registry.register(Box::new(MemoryRepositoryFactory));
        registry
    }

    /// Adds a backend, replacing any factory already registered for it.
    pub fn register(
        &mut self,
        factory: Box<dyn RepositoryFactory>,
    ) {
        self.factories.insert(factory.backend(), factory);
    }

    /// Opens the configured backend.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::Configuration`] when the backend was not
    /// registered, otherwise whatever the backend's factory reports.
    pub async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn InputRepository>, RepositoryError> {
        let factory = self.factories.get(&config.backend).ok_or_else(|| {
            RepositoryError::Configuration(format!(
                "the {} backend is not available in this build",
                config.backend
            ))
        })?;
        debug!(backend = %config.backend, "opening repository");
        factory.open(&config.connection_string).await
    }
}

impl Default for RepositoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}
