use {
    crate::{
        cache::{
            CacheEnvelope, CacheKey, Clock, EnvelopeHeader, KeyValueStore, StoreError,
            SystemClock,
            key::{dataset_of_key, dataset_prefix},
        },
        config::CacheSettings,
        domain::{DatasetType, ParamBag},
    },
    serde::{Serialize, de::DeserializeOwned},
    thiserror::Error,
};

#[cfg(debug_assertions)]
use crate::config::DF;

/// A cache write did not happen. Never fatal: the caller still has its data.
#[derive(Debug, Error)]
pub enum CacheWriteError {
    #[error("failed to encode cache entry {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("storage still full for {key} after evicting {evicted} entries")]
    CapacityExhausted { key: String, evicted: usize },
    #[error("cache write for {key} failed: {source}")]
    Store {
        key: String,
        #[source]
        source: StoreError,
    },
}

/// One stored entry as seen by diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryInfo {
    pub key: String,
    /// `None` when the key sits under the prefix but has no valid dataset part
    pub dataset: Option<DatasetType>,
    /// UTF-8 length of key plus stored value
    pub bytes: usize,
    /// `None` when the envelope is unreadable
    pub written_at: Option<i64>,
    pub version: Option<String>,
}

/// Key plus write time, the unit every eviction routine sorts on.
/// Unreadable entries get `i64::MIN` so they always go first.
struct Stamp {
    key: String,
    written_at: i64,
}

/// Capacity and time bounded cache of canonical series over a [`KeyValueStore`].
///
/// Only keys under `settings.key_prefix` are ever read, counted or removed, so the
/// cache can share a store (e.g. the page's localStorage) with other code.
pub struct SeriesCache<S, C = SystemClock> {
    store: S,
    clock: C,
    settings: CacheSettings,
}

impl<S: KeyValueStore> SeriesCache<S, SystemClock> {
    pub fn new(store: S, settings: CacheSettings) -> Self {
        Self::with_clock(store, SystemClock, settings)
    }
}

impl<S: KeyValueStore, C: Clock> SeriesCache<S, C> {
    pub fn with_clock(store: S, clock: C, settings: CacheSettings) -> Self {
        Self {
            store,
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    pub fn key(&self, dataset: &DatasetType, params: &ParamBag) -> CacheKey {
        CacheKey::new(&self.settings.key_prefix, dataset, params)
    }

    // --- READ ---

    /// Live payload under `key`.
    ///
    /// Absent when nothing is stored, or when the entry is expired, from another schema
    /// version or unreadable. Those three cases also delete the entry.
    pub fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let raw = self.read_raw(key.as_str())?;
        self.live_header(key.as_str(), &raw)?;

        match serde_json::from_str::<CacheEnvelope<T>>(&raw) {
            Ok(envelope) => {
                #[cfg(debug_assertions)]
                if DF.log_cache_hits {
                    log::info!("Cache HIT for {}", key);
                }
                Some(envelope.data)
            }
            Err(e) => {
                log::warn!("Corrupt cache entry {} ({}). Discarding.", key, e);
                self.discard(key.as_str(), "corrupt");
                None
            }
        }
    }

    /// Whether a live entry exists, without decoding its payload.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.read_raw(key.as_str())
            .and_then(|raw| self.live_header(key.as_str(), &raw))
            .is_some()
    }

    fn read_raw(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("Cache read for {} failed: {}", key, e);
                None
            }
        }
    }

    /// Header of a stored entry if it is current, deleting it otherwise.
    fn live_header(&self, key: &str, raw: &str) -> Option<EnvelopeHeader> {
        let header = match serde_json::from_str::<EnvelopeHeader>(raw) {
            Ok(header) => header,
            Err(e) => {
                log::warn!("Corrupt cache entry {} ({}). Discarding.", key, e);
                self.discard(key, "corrupt");
                return None;
            }
        };
        if header.version != self.settings.schema_version {
            self.discard(key, "schema version mismatch");
            return None;
        }
        if self.is_expired(header.timestamp) {
            self.discard(key, "expired");
            return None;
        }
        Some(header)
    }

    fn is_expired(&self, written_at: i64) -> bool {
        self.now_ms().saturating_sub(written_at) > self.settings.expiry_horizon_ms()
    }

    // --- WRITE ---

    /// Stores `payload` under `key` stamped with the current time and schema version.
    ///
    /// A new key first makes room under the per-dataset cap. If the backend reports it
    /// is full, the globally oldest share of entries is evicted and the write is tried
    /// exactly once more.
    pub fn set<T: Serialize>(&self, key: &CacheKey, payload: &T) -> Result<(), CacheWriteError> {
        let envelope = CacheEnvelope {
            data: payload,
            timestamp: self.now_ms(),
            version: self.settings.schema_version.clone(),
        };
        let value = serde_json::to_string(&envelope).map_err(|source| CacheWriteError::Encode {
            key: key.to_string(),
            source,
        })?;

        if !self.holds_key(key.as_str()) {
            self.evict_oldest(key.dataset(), self.settings.max_entries_per_dataset);
        }

        match self.try_set(key.as_str(), &value) {
            Ok(()) => return Ok(()),
            Err(e) if e.is_capacity_exceeded() => {
                log::warn!("Storage full writing {}. Evicting oldest entries and retrying.", key);
            }
            Err(source) => {
                return Err(CacheWriteError::Store {
                    key: key.to_string(),
                    source,
                });
            }
        }

        let evicted = self.evict_fraction_globally(self.settings.quota_eviction_fraction);

        match self.try_set(key.as_str(), &value) {
            Ok(()) => Ok(()),
            Err(e) if e.is_capacity_exceeded() => Err(CacheWriteError::CapacityExhausted {
                key: key.to_string(),
                evicted,
            }),
            Err(source) => Err(CacheWriteError::Store {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn try_set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.store.set(key, value)
    }

    fn holds_key(&self, key: &str) -> bool {
        matches!(self.store.get(key), Ok(Some(_)))
    }

    // --- EVICTION ---
    // Each routine re-lists keys on every call and skips entries that vanished mid-scan.

    /// Deletes the oldest entries of `dataset` until fewer than `max_entries` remain,
    /// leaving a slot for one new entry. Returns how many were removed.
    pub fn evict_oldest(&self, dataset: &DatasetType, max_entries: usize) -> usize {
        let prefix = dataset_prefix(&self.settings.key_prefix, dataset);
        let stamps = self.sorted_stamps(|key| key.starts_with(&prefix));
        let excess = (stamps.len() + 1).saturating_sub(max_entries);

        stamps
            .iter()
            .take(excess)
            .filter(|stamp| self.discard(&stamp.key, "per-dataset cap"))
            .count()
    }

    /// Deletes every owned entry that is expired, unreadable or from another schema version.
    pub fn evict_expired(&self) -> usize {
        self.owned_keys(|_| true)
            .into_iter()
            .filter(|key| {
                let Some(raw) = self.read_raw(key) else {
                    return false;
                };
                let reason = match serde_json::from_str::<EnvelopeHeader>(&raw) {
                    Err(_) => "corrupt",
                    Ok(header) if header.version != self.settings.schema_version => {
                        "schema version mismatch"
                    }
                    Ok(header) if self.is_expired(header.timestamp) => "expired",
                    Ok(_) => return false,
                };
                self.discard(key, reason)
            })
            .count()
    }

    /// Deletes the globally oldest `ceil(len * fraction)` owned entries, at least one when
    /// `fraction` is positive and anything is stored. Ties go by key order.
    pub fn evict_fraction_globally(&self, fraction: f64) -> usize {
        if fraction.is_nan() || fraction <= 0.0 {
            return 0;
        }
        let stamps = self.sorted_stamps(|_| true);
        if stamps.is_empty() {
            return 0;
        }
        let share = (stamps.len() as f64 * fraction.min(1.0)).ceil() as usize;
        let count = share.clamp(1, stamps.len());

        let evicted = stamps
            .iter()
            .take(count)
            .filter(|stamp| self.discard(&stamp.key, "quota recovery"))
            .count();
        log::warn!(
            "Quota recovery evicted {} of {} cache entries",
            evicted,
            stamps.len()
        );
        evicted
    }

    // --- CLEAR ---

    pub fn clear_dataset(&self, dataset: &DatasetType) -> usize {
        let prefix = dataset_prefix(&self.settings.key_prefix, dataset);
        self.owned_keys(|key| key.starts_with(&prefix))
            .iter()
            .filter(|key| self.discard(key, "cleared"))
            .count()
    }

    pub fn clear_all(&self) -> usize {
        self.owned_keys(|_| true)
            .iter()
            .filter(|key| self.discard(key, "cleared"))
            .count()
    }

    // --- ENUMERATION ---

    /// Every owned entry with its size and header, in key order.
    pub fn entries(&self) -> Vec<EntryInfo> {
        self.owned_keys(|_| true)
            .into_iter()
            .filter_map(|key| {
                let raw = self.read_raw(&key)?;
                let header = serde_json::from_str::<EnvelopeHeader>(&raw).ok();
                Some(EntryInfo {
                    dataset: dataset_of_key(&self.settings.key_prefix, &key),
                    bytes: key.len() + raw.len(),
                    written_at: header.as_ref().map(|h| h.timestamp),
                    version: header.map(|h| h.version),
                    key,
                })
            })
            .collect()
    }

    fn owned_keys(&self, filter: impl Fn(&str) -> bool) -> Vec<String> {
        match self.store.keys() {
            Ok(keys) => {
                let mut owned: Vec<String> = keys
                    .into_iter()
                    .filter(|key| key.starts_with(&self.settings.key_prefix) && filter(key))
                    .collect();
                owned.sort();
                owned
            }
            Err(e) => {
                log::warn!("Failed to list cache keys: {}", e);
                Vec::new()
            }
        }
    }

    /// Owned keys matching `filter`, oldest first, ties by key.
    fn sorted_stamps(&self, filter: impl Fn(&str) -> bool) -> Vec<Stamp> {
        let mut stamps: Vec<Stamp> = self
            .owned_keys(filter)
            .into_iter()
            .filter_map(|key| {
                // Vanished between listing and reading: nothing to evict
                let raw = self.read_raw(&key)?;
                let written_at = serde_json::from_str::<EnvelopeHeader>(&raw)
                    .map_or(i64::MIN, |header| header.timestamp);
                Some(Stamp { key, written_at })
            })
            .collect();
        stamps.sort_by(|a, b| a.written_at.cmp(&b.written_at).then_with(|| a.key.cmp(&b.key)));
        stamps
    }

    /// Removes one entry. Returns false when the backend refused.
    fn discard(&self, key: &str, reason: &str) -> bool {
        match self.store.remove(key) {
            Ok(()) => {
                #[cfg(debug_assertions)]
                if DF.log_evictions {
                    log::info!("Evicted {} ({})", key, reason);
                }
                #[cfg(not(debug_assertions))]
                let _ = reason;
                true
            }
            Err(e) => {
                log::warn!("Failed to remove cache entry {}: {}", key, e);
                false
            }
        }
    }
}
