// Cache Store: persistence backends plus the expiring, evicting series cache on top
mod clock;
mod envelope;
#[cfg(not(target_arch = "wasm32"))]
mod file_store;
pub(crate) mod key;
#[cfg(target_arch = "wasm32")]
mod local_storage;
mod memory;
mod series_cache;
mod store;

pub use {
    clock::{Clock, ManualClock, SystemClock},
    envelope::{CacheEnvelope, EnvelopeHeader},
    key::CacheKey,
    memory::MemoryStore,
    series_cache::{CacheWriteError, EntryInfo, SeriesCache},
    store::{KeyValueStore, StoreError},
};

#[cfg(not(target_arch = "wasm32"))]
pub use file_store::FileStore;

#[cfg(target_arch = "wasm32")]
pub use local_storage::LocalStorageStore;
