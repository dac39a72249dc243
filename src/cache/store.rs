use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend refused the write because it is full. The only recoverable failure.
    #[error("storage capacity exceeded writing {key} ({needed} bytes)")]
    CapacityExceeded { key: String, needed: usize },
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn is_capacity_exceeded(&self) -> bool {
        matches!(self, StoreError::CapacityExceeded { .. })
    }
}

/// Synchronous string key/value persistence with finite capacity.
///
/// Every method takes `&self`; backends synchronise internally, like a browser storage
/// object shared by every caller on the page. Removing an absent key is not an error.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
    fn keys(&self) -> Result<Vec<String>, StoreError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        (**self).keys()
    }
}
