//! Data module - CSV loading, cleaning and session caching

mod cleaner;
mod loader;
mod record;
mod session;

pub use cleaner::{DataCleaner, ImputationError, ImputationReport, ImputationRules, NullReport};
pub use loader::{ColumnInfo, Dataset, LoadError, LoadOptions};
pub use record::{Field, Record};
pub use session::{DatasetCache, SourceIdentity};

#[cfg(test)]
pub(crate) use record::sample_record;
