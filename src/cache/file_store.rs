use {
    crate::{
        cache::{KeyValueStore, StoreError},
        config::PERSISTENCE,
    },
    std::{
        fs,
        io::{self, ErrorKind},
        path::{Path, PathBuf},
    },
};

/// One file per key under a directory. Filenames are the hex form of the key, so any
/// key is a valid filename and the directory listing recovers the keys exactly.
#[derive(Debug, Clone)]
pub struct FileStore {
    directory: PathBuf,
    capacity_bytes: Option<u64>,
}

impl FileStore {
    pub fn open(directory: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let directory = directory.into();
        fs::create_dir_all(&directory)?;
        Ok(Self {
            directory,
            capacity_bytes: None,
        })
    }

    /// Store at the configured default location and capacity.
    pub fn open_default() -> Result<Self, StoreError> {
        Ok(Self::open(PERSISTENCE.file_store.directory)?
            .with_capacity(PERSISTENCE.file_store.capacity_bytes))
    }

    pub fn with_capacity(mut self, capacity_bytes: u64) -> Self {
        self.capacity_bytes = Some(capacity_bytes);
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.directory.join(format!(
            "{}.{}",
            hex::encode(key),
            PERSISTENCE.file_store.extension
        ))
    }

    fn key_for(path: &Path) -> Option<String> {
        if path.extension()?.to_str()? != PERSISTENCE.file_store.extension {
            return None;
        }
        let bytes = hex::decode(path.file_stem()?.to_str()?).ok()?;
        String::from_utf8(bytes).ok()
    }

    /// Key + value bytes across every entry, minus the entry at `skip`.
    fn used_bytes_excluding(&self, skip: &Path) -> Result<u64, StoreError> {
        let mut used = 0;
        for entry in fs::read_dir(&self.directory)? {
            let path = entry?.path();
            if path == skip {
                continue;
            }
            if let Some(key) = Self::key_for(&path) {
                used += key.len() as u64 + fs::metadata(&path)?.len();
            }
        }
        Ok(used)
    }
}

fn is_storage_full(error: &io::Error) -> bool {
    matches!(error.kind(), ErrorKind::StorageFull | ErrorKind::FileTooLarge)
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        let needed = key.len() + value.len();

        if let Some(capacity) = self.capacity_bytes {
            if self.used_bytes_excluding(&path)? + needed as u64 > capacity {
                return Err(StoreError::CapacityExceeded {
                    key: key.to_string(),
                    needed,
                });
            }
        }

        // Whole-entry replace: write aside, then rename over the old file
        let temp = path.with_extension("tmp");
        let written = fs::write(&temp, value).and_then(|_| fs::rename(&temp, &path));
        match written {
            Ok(()) => Ok(()),
            Err(e) => {
                let _ = fs::remove_file(&temp);
                if is_storage_full(&e) {
                    Err(StoreError::CapacityExceeded {
                        key: key.to_string(),
                        needed,
                    })
                } else {
                    Err(e.into())
                }
            }
        }
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.directory)? {
            if let Some(key) = Self::key_for(&entry?.path()) {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_and_key_recovery() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("cache")).unwrap();

        let key = r#"series_cache:spot_price:{"category":"gold/24k"}"#;
        store.set(key, "[1,2,3]").unwrap();
        assert_eq!(store.get(key).unwrap().as_deref(), Some("[1,2,3]"));
        assert_eq!(store.keys().unwrap(), vec![key.to_string()]);

        store.set(key, "[4]").unwrap();
        assert_eq!(store.get(key).unwrap().as_deref(), Some("[4]"));

        store.remove(key).unwrap();
        store.remove(key).unwrap();
        assert_eq!(store.get(key).unwrap(), None);
        assert!(store.keys().unwrap().is_empty());
    }

    #[test]
    fn test_foreign_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        fs::write(dir.path().join("notes.txt"), "hello").unwrap();
        fs::write(dir.path().join("zz-not-hex.json"), "{}").unwrap();
        store.set("k", "v").unwrap();
        assert_eq!(store.keys().unwrap(), vec!["k".to_string()]);
    }

    #[test]
    fn test_capacity_exceeded_is_distinguishable() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap().with_capacity(20);
        store.set("a", "0123456789").unwrap();

        let err = store.set("b", "0123456789").unwrap_err();
        assert!(err.is_capacity_exceeded());

        // Overwriting does not count the old value twice
        store.set("a", "0123456789abcdefg").unwrap();
        store.remove("a").unwrap();
        store.set("b", "0123456789").unwrap();
    }
}
