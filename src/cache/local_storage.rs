use {
    crate::cache::{KeyValueStore, StoreError},
    wasm_bindgen::{JsCast, JsValue},
    web_sys::{DomException, Storage},
};

/// `window.localStorage` as a key/value store.
#[derive(Debug, Clone)]
pub struct LocalStorageStore {
    storage: Storage,
}

impl LocalStorageStore {
    pub fn open() -> Result<Self, StoreError> {
        let window = web_sys::window()
            .ok_or_else(|| StoreError::Unavailable("no window object".to_string()))?;
        let storage = window
            .local_storage()
            .map_err(|e| unavailable(&e))?
            .ok_or_else(|| StoreError::Unavailable("localStorage is disabled".to_string()))?;
        Ok(Self { storage })
    }
}

fn unavailable(error: &JsValue) -> StoreError {
    StoreError::Unavailable(format!("{:?}", error))
}

// Browsers disagree on how a full quota is reported.
fn is_quota_exceeded(error: &JsValue) -> bool {
    error.dyn_ref::<DomException>().is_some_and(|exception| {
        let name = exception.name();
        name == "QuotaExceededError" || name == "NS_ERROR_DOM_QUOTA_REACHED" || exception.code() == 22
    })
}

impl KeyValueStore for LocalStorageStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.storage.get_item(key).map_err(|e| unavailable(&e))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.storage.set_item(key, value).map_err(|e| {
            if is_quota_exceeded(&e) {
                StoreError::CapacityExceeded {
                    key: key.to_string(),
                    needed: key.len() + value.len(),
                }
            } else {
                unavailable(&e)
            }
        })
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.storage.remove_item(key).map_err(|e| unavailable(&e))
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        let length = self.storage.length().map_err(|e| unavailable(&e))?;
        let mut keys = Vec::with_capacity(length as usize);
        for index in 0..length {
            if let Some(key) = self.storage.key(index).map_err(|e| unavailable(&e))? {
                keys.push(key);
            }
        }
        Ok(keys)
    }
}
