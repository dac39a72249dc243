use {
    crate::{
        cache::{Clock, EntryInfo, KeyValueStore, SeriesCache},
        domain::DatasetType,
    },
    itertools::Itertools,
    std::collections::BTreeMap,
};

/// Group name for owned keys whose dataset part does not parse.
pub const UNKNOWN_DATASET: &str = "(unknown)";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetUsage {
    pub entries: usize,
    pub bytes: usize,
    /// `None` when no entry of the group has a readable write time
    pub oldest_written_at: Option<i64>,
    pub newest_written_at: Option<i64>,
}

impl DatasetUsage {
    fn from_entries<'a>(entries: impl IntoIterator<Item = &'a EntryInfo> + Clone) -> Self {
        let (oldest_written_at, newest_written_at) = entries
            .clone()
            .into_iter()
            .filter_map(|entry| entry.written_at)
            .minmax()
            .into_option()
            .map_or((None, None), |(oldest, newest)| (Some(oldest), Some(newest)));

        let (entries, bytes) = entries
            .into_iter()
            .fold((0, 0), |(count, bytes), entry| (count + 1, bytes + entry.bytes));

        Self {
            entries,
            bytes,
            oldest_written_at,
            newest_written_at,
        }
    }
}

/// Snapshot of what the cache holds, per dataset and in total.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheInventory {
    pub datasets: BTreeMap<String, DatasetUsage>,
    pub total: DatasetUsage,
}

impl CacheInventory {
    pub fn dataset(&self, dataset: &DatasetType) -> Option<&DatasetUsage> {
        self.datasets.get(dataset.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.total.entries == 0
    }
}

/// Read-only walk over every owned entry.
pub fn take_inventory<S: KeyValueStore, C: Clock>(cache: &SeriesCache<S, C>) -> CacheInventory {
    let entries = cache.entries();

    let datasets = entries
        .iter()
        .into_group_map_by(|entry| {
            entry
                .dataset
                .as_ref()
                .map_or_else(|| UNKNOWN_DATASET.to_string(), |dataset| dataset.to_string())
        })
        .into_iter()
        .map(|(name, group)| (name, DatasetUsage::from_entries(group.iter().copied())))
        .collect();

    CacheInventory {
        datasets,
        total: DatasetUsage::from_entries(entries.iter()),
    }
}
