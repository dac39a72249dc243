//! Configuration module for the series cache.

// Can all be private now because we have a public re-export.
mod debug;
mod persistence;
mod settings;

// Re-export commonly used items
pub use debug::{DF, LogFlags};
pub use persistence::{FileStoreConfig, PERSISTENCE, PersistenceConfig, SeriesCacheConfig};
pub use settings::CacheSettings;
