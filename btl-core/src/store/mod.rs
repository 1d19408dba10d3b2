pub mod backend;
pub mod memory;
pub mod repository;

pub use backend::{Backend, DbConfig, RepositoryFactory, RepositoryRegistry};
pub use memory::{MemoryRepository, MemoryRepositoryFactory};
pub use repository::{
    InputRepository, OFFERS_KEY, RepositoryError, SavedOffers, SavedViability, VIABILITY_KEY,
    load_offers_or_default, saved_mortgage_amount,
};
