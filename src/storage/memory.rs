use super::{KeyValueStore, StorageError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory key-value store.
///
/// Clones share the same items, so a test can keep a handle on the store it
/// handed to a session and inspect what was persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    items: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn unavailable() -> StorageError {
        StorageError::Unavailable {
            reason: "memory store lock poisoned".to_string(),
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let items = self.items.lock().map_err(|_| Self::unavailable())?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        let mut items = self.items.lock().map_err(|_| Self::unavailable())?;
        items.insert(key.to_string(), value);
        Ok(())
    }
}
