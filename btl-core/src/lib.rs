pub mod calculations;
pub mod models;
pub mod session;
pub mod shared;
pub mod store;

pub use models::*;
pub use session::{ComparisonSession, SessionError, ViabilitySession};
pub use shared::{MortgageAmountWatcher, SharedMortgageAmount};
pub use store::{InputRepository, RepositoryError};
