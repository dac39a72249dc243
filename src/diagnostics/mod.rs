// Diagnostics surface: read-only inventory plus destructive operators. Not on the request path.
mod inventory;
mod reporter;

use crate::{
    cache::{Clock, KeyValueStore, SeriesCache},
    domain::DatasetType,
};

pub use {
    inventory::{CacheInventory, DatasetUsage, UNKNOWN_DATASET, take_inventory},
    reporter::{format_bytes, render_inventory},
};

/// Deletes every entry of one dataset. Returns how many went.
pub fn clear_dataset<S: KeyValueStore, C: Clock>(cache: &SeriesCache<S, C>, dataset: &DatasetType) -> usize {
    let removed = cache.clear_dataset(dataset);
    log::info!("Cleared {} cache entries of {}", removed, dataset);
    removed
}

/// Deletes every entry the cache owns. Foreign keys in a shared store survive.
pub fn clear_all<S: KeyValueStore, C: Clock>(cache: &SeriesCache<S, C>) -> usize {
    let removed = cache.clear_all();
    log::info!("Cleared all {} cache entries", removed);
    removed
}
