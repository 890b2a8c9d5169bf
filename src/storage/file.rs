use super::{KeyValueStore, StorageError};
use std::path::{Path, PathBuf};

/// Key-value store keeping one `<key>.json` file per key in a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    base_path: PathBuf,
}

impl FileStore {
    pub fn new<P: Into<PathBuf>>(base_path: P) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn item_path(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{key}.json"))
    }

    fn io_error(key: &str, source: std::io::Error) -> StorageError {
        StorageError::Io {
            key: key.to_string(),
            source,
        }
    }
}

impl KeyValueStore for FileStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.item_path(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::io_error(key, e)),
        }
    }

    fn set_item(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.base_path).map_err(|e| Self::io_error(key, e))?;
        std::fs::write(self.item_path(key), value).map_err(|e| Self::io_error(key, e))
    }
}
