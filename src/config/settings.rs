use std::time::Duration;

use crate::config::PERSISTENCE;

/// Runtime cache settings. `Default` takes the compiled-in blueprint from `PERSISTENCE.cache`.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSettings {
    pub expiry_horizon: Duration,
    pub max_entries_per_dataset: usize,
    pub quota_eviction_fraction: f64,
    pub schema_version: String,
    pub key_prefix: String,
}

impl Default for CacheSettings {
    fn default() -> Self {
        let blueprint = &PERSISTENCE.cache;
        Self {
            expiry_horizon: blueprint.expiry_horizon,
            max_entries_per_dataset: blueprint.max_entries_per_dataset,
            quota_eviction_fraction: blueprint.quota_eviction_fraction,
            schema_version: blueprint.schema_version.to_string(),
            key_prefix: blueprint.key_prefix.to_string(),
        }
    }
}

impl CacheSettings {
    pub fn with_expiry_horizon(mut self, horizon: Duration) -> Self {
        self.expiry_horizon = horizon;
        self
    }

    pub fn with_max_entries_per_dataset(mut self, max_entries: usize) -> Self {
        self.max_entries_per_dataset = max_entries.max(1);
        self
    }

    pub fn with_quota_eviction_fraction(mut self, fraction: f64) -> Self {
        self.quota_eviction_fraction = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };
        self
    }

    pub fn with_schema_version(mut self, version: impl Into<String>) -> Self {
        self.schema_version = version.into();
        self
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub(crate) fn expiry_horizon_ms(&self) -> i64 {
        i64::try_from(self.expiry_horizon.as_millis()).unwrap_or(i64::MAX)
    }
}
