use {
    crate::domain::{DatasetType, ParamBag},
    std::fmt,
};

/// Deterministic store key for one `(dataset type, parameter bag)` pair:
/// `{prefix}{dataset}:{canonical params}`.
///
/// The dataset name cannot contain `:`, so the first separator after the prefix
/// always splits dataset from parameters and distinct pairs never share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    dataset: DatasetType,
    raw: String,
}

impl CacheKey {
    pub fn new(prefix: &str, dataset: &DatasetType, params: &ParamBag) -> Self {
        let raw = format!(
            "{}{}",
            dataset_prefix(prefix, dataset),
            params.canonical()
        );
        Self {
            dataset: dataset.clone(),
            raw,
        }
    }

    pub fn dataset(&self) -> &DatasetType {
        &self.dataset
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Every key of `dataset` starts with this.
pub(crate) fn dataset_prefix(prefix: &str, dataset: &DatasetType) -> String {
    format!("{}{}{}", prefix, dataset, DatasetType::SEPARATOR)
}

/// Dataset a stored key belongs to. `None` for keys outside `prefix` or without a valid dataset part.
pub(crate) fn dataset_of_key(prefix: &str, key: &str) -> Option<DatasetType> {
    let rest = key.strip_prefix(prefix)?;
    let (dataset, _params) = rest.split_once(DatasetType::SEPARATOR)?;
    DatasetType::new(dataset).ok()
}
