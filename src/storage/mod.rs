//! Storage module for durable player state
//!
//! Affection levels, unlocks and preferences survive between sessions.
//! Values are stored as JSON strings under fixed keys in a key-value
//! backend, mirroring how a browser's local storage would hold them.

use crate::unlocks::UnlockLedger;
use std::collections::BTreeMap;

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Affection level per character
pub type AffectionLevels = BTreeMap<String, f64>;

pub const AFFECTION_STORAGE_KEY: &str = "affectionLevels";
pub const UNLOCKS_STORAGE_KEY: &str = "unlocks";
pub const AUTOPLAY_PREFERENCE: &str = "autoplay";

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error for '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Stored value for '{key}' is malformed: {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Storage unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Raw string key-value backend
pub trait KeyValueStore: Send {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set_item(&mut self, key: &str, value: String) -> Result<(), StorageError>;
}

/// Durable state the interpreter reads at start and writes after every mutation
pub trait Persistence: Send {
    fn load_affection(&self) -> Result<AffectionLevels, StorageError>;

    fn save_affection(&mut self, levels: &AffectionLevels) -> Result<(), StorageError>;

    fn load_unlocks(&self) -> Result<UnlockLedger, StorageError>;

    fn save_unlocks(&mut self, ledger: &UnlockLedger) -> Result<(), StorageError>;

    /// Boolean preference; absent means `false`
    fn preference(&self, key: &str) -> Result<bool, StorageError>;
}

/// JSON-encoded persistence over any key-value backend
#[derive(Debug, Clone, Default)]
pub struct LocalStorage<S> {
    store: S,
}

impl<S: KeyValueStore> LocalStorage<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn set_preference(&mut self, key: &str, enabled: bool) -> Result<(), StorageError> {
        self.store.set_item(key, enabled.to_string())
    }

    fn read_json<T: serde::de::DeserializeOwned + Default>(
        &self,
        key: &str,
    ) -> Result<T, StorageError> {
        match self.store.get_item(key)? {
            Some(raw) => serde_json::from_str(&raw).map_err(|source| StorageError::Serialization {
                key: key.to_string(),
                source,
            }),
            None => Ok(T::default()),
        }
    }

    fn write_json<T: serde::Serialize>(&mut self, key: &str, value: &T) -> Result<(), StorageError> {
        let raw = serde_json::to_string(value).map_err(|source| StorageError::Serialization {
            key: key.to_string(),
            source,
        })?;
        self.store.set_item(key, raw)
    }
}

impl<S: KeyValueStore> Persistence for LocalStorage<S> {
    fn load_affection(&self) -> Result<AffectionLevels, StorageError> {
        self.read_json(AFFECTION_STORAGE_KEY)
    }

    fn save_affection(&mut self, levels: &AffectionLevels) -> Result<(), StorageError> {
        log::debug!("Saving affection levels: {levels:?}");
        self.write_json(AFFECTION_STORAGE_KEY, levels)
    }

    fn load_unlocks(&self) -> Result<UnlockLedger, StorageError> {
        self.read_json(UNLOCKS_STORAGE_KEY)
    }

    fn save_unlocks(&mut self, ledger: &UnlockLedger) -> Result<(), StorageError> {
        self.write_json(UNLOCKS_STORAGE_KEY, ledger)
    }

    fn preference(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.store.get_item(key)?.as_deref() == Some("true"))
    }
}
