//! Cache persistence configuration
use std::time::Duration;

/// Configuration for the canonical series cache
pub struct SeriesCacheConfig {
    /// Entries older than this are treated as absent
    pub expiry_horizon: Duration,
    /// Per-dataset entry cap, enforced oldest-first before a new entry is admitted
    pub max_entries_per_dataset: usize,
    /// Share of the globally oldest entries dropped when the store reports it is full
    pub quota_eviction_fraction: f64,
    /// Current version of the cached payload shape. Bump it whenever `CanonicalSeries` changes.
    pub schema_version: &'static str,
    /// Namespace prefix for every key the cache owns
    pub key_prefix: &'static str,
}

/// Configuration for the native file-backed store
pub struct FileStoreConfig {
    /// Directory holding one file per cache entry
    pub directory: &'static str,
    /// Byte budget across all entry files (mirrors a browser storage quota)
    pub capacity_bytes: u64,
    /// Extension of entry files
    pub extension: &'static str,
}

/// The Master Persistence Configuration
pub struct PersistenceConfig {
    pub cache: SeriesCacheConfig,
    pub file_store: FileStoreConfig,
}

pub const PERSISTENCE: PersistenceConfig = PersistenceConfig {
    cache: SeriesCacheConfig {
        expiry_horizon: Duration::from_secs(24 * 60 * 60),
        max_entries_per_dataset: 10,
        quota_eviction_fraction: 0.25,
        schema_version: "3.0",
        key_prefix: "series_cache:",
    },
    file_store: FileStoreConfig {
        directory: "series_cache_data",
        capacity_bytes: 5 * 1024 * 1024, // Same order as a browser localStorage quota
        extension: "json",
    },
};
