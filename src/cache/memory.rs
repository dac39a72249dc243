use {
    crate::cache::{KeyValueStore, StoreError},
    std::{
        collections::BTreeMap,
        sync::{Arc, Mutex, MutexGuard, PoisonError},
    },
};

#[derive(Debug, Default)]
struct MemoryInner {
    entries: BTreeMap<String, String>,
    capacity_bytes: Option<usize>,
    used_bytes: usize,
    forced_failures: usize,
}

/// In-process store. Clones share the same map, so a test can keep a handle
/// to inspect what the cache wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

fn entry_bytes(key: &str, value: &str) -> usize {
    key.len() + value.len()
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bounded store: a write that would push key + value bytes past `capacity_bytes` fails.
    pub fn with_capacity(capacity_bytes: usize) -> Self {
        let store = Self::default();
        store.lock().capacity_bytes = Some(capacity_bytes);
        store
    }

    /// Makes the next `count` writes fail with `CapacityExceeded` regardless of size.
    pub fn fail_next_sets(&self, count: usize) {
        self.lock().forced_failures = count;
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn used_bytes(&self) -> usize {
        self.lock().used_bytes
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.lock().entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let needed = entry_bytes(key, value);

        if inner.forced_failures > 0 {
            inner.forced_failures -= 1;
            return Err(StoreError::CapacityExceeded {
                key: key.to_string(),
                needed,
            });
        }

        let replaced = inner
            .entries
            .get(key)
            .map_or(0, |old| entry_bytes(key, old));
        let after = inner.used_bytes - replaced + needed;
        if inner.capacity_bytes.is_some_and(|capacity| after > capacity) {
            return Err(StoreError::CapacityExceeded {
                key: key.to_string(),
                needed,
            });
        }

        inner.entries.insert(key.to_string(), value.to_string());
        inner.used_bytes = after;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if let Some(old) = inner.entries.remove(key) {
            inner.used_bytes -= entry_bytes(key, &old);
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.lock().entries.keys().cloned().collect())
    }
}
