mod loader;

pub use loader::{RateBandRecord, RateTableLoader, RateTableLoaderError, RecordKind};
