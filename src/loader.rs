//! Story loading
//!
//! Fetches a story document and the shared constants document it points
//! to, then seeds a [`VariableStore`] from both. Loading fails as a whole:
//! playback never starts on a partially loaded story.

use crate::storage::AffectionLevels;
use crate::store::VariableStore;
use crate::types::StoryDocument;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::PathBuf;

/// Loader errors
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Invalid document name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("Document not found: {path}")]
    NotFound { path: String },

    #[error("Failed to read {path}: {message}")]
    Io { path: String, message: String },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Constants document {path} is not a JSON object")]
    InvalidConstants { path: String },
}

impl LoadError {
    fn invalid_name(name: &str, reason: &'static str) -> Self {
        Self::InvalidName {
            name: name.to_string(),
            reason,
        }
    }
}

/// Which player a story is written for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StoryKind {
    /// Scene script under the events directory
    #[default]
    Event,
    /// Texting chain under the texting directory
    Texting,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoaderConfig {
    pub events_dir: String,
    pub texting_dir: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            events_dir: "scripts/events".to_string(),
            texting_dir: "scripts/texting".to_string(),
        }
    }
}

impl LoaderConfig {
    pub fn story_path(&self, kind: StoryKind, name: &str) -> String {
        let dir = match kind {
            StoryKind::Event => &self.events_dir,
            StoryKind::Texting => &self.texting_dir,
        };
        format!("{}/{}", dir.trim_end_matches('/'), name)
    }
}

/// Where documents are fetched from
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Fetch the raw bytes of a document, addressed relative to the game root
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, LoadError>;
}

/// Documents read from a game directory on disk
#[derive(Debug, Clone)]
pub struct FileSystemSource {
    base_path: PathBuf,
}

impl FileSystemSource {
    pub fn new<P: Into<PathBuf>>(base_path: P) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }
}

#[async_trait]
impl DocumentSource for FileSystemSource {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, LoadError> {
        let full_path = self.base_path.join(path);
        match tokio::fs::read(&full_path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(LoadError::NotFound {
                path: full_path.display().to_string(),
            }),
            Err(e) => Err(LoadError::Io {
                path: full_path.display().to_string(),
                message: e.to_string(),
            }),
        }
    }
}

/// In-memory implementation for testing
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    documents: HashMap<String, Vec<u8>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.documents.insert(path.into(), bytes.into());
    }

    pub fn with_json(mut self, path: impl Into<String>, document: &Value) -> Self {
        self.insert(path, document.to_string());
        self
    }
}

#[async_trait]
impl DocumentSource for InMemorySource {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, LoadError> {
        self.documents
            .get(path)
            .cloned()
            .ok_or_else(|| LoadError::NotFound {
                path: path.to_string(),
            })
    }
}

/// A story document together with its shared constants
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedStory {
    pub kind: StoryKind,
    pub document: StoryDocument,
    pub predefined: Option<Map<String, Value>>,
}

impl LoadedStory {
    pub fn story_name(&self) -> Option<&str> {
        self.document.story_name()
    }

    /// Variable store for a new playthrough.
    ///
    /// Event stories merge their own constants first and the shared ones
    /// over them. Texting chains keep the shared constants under a
    /// `constants` key and merge their own at the top level.
    pub fn prepare_store(&self, affection: &AffectionLevels) -> VariableStore {
        let mut store = VariableStore::with_affection(affection);
        let own = self.document.constants.as_ref().map(|c| c.as_map());

        match self.kind {
            StoryKind::Event => {
                if let Some(own) = own {
                    store.merge_constants(own);
                }
                if let Some(predefined) = &self.predefined {
                    store.merge_constants(predefined);
                }
            }
            StoryKind::Texting => {
                if let Some(predefined) = &self.predefined {
                    store.merge_into("constants", predefined);
                }
                if let Some(own) = own {
                    store.merge_constants(own);
                }
            }
        }

        store
    }
}

/// Reject names that are empty or would escape their base directory
pub fn validate_name(name: &str) -> Result<(), LoadError> {
    if name.trim().is_empty() {
        return Err(LoadError::invalid_name(name, "name is empty"));
    }
    if name.starts_with('/') || name.starts_with('\\') {
        return Err(LoadError::invalid_name(name, "name must be relative"));
    }
    if name.split(['/', '\\']).any(|part| part == "..") {
        return Err(LoadError::invalid_name(
            name,
            "name must not leave its base directory",
        ));
    }
    Ok(())
}

pub async fn load_story(
    source: &dyn DocumentSource,
    config: &LoaderConfig,
    kind: StoryKind,
    name: &str,
) -> Result<LoadedStory, LoadError> {
    validate_name(name)?;

    let path = config.story_path(kind, name);
    let bytes = source.fetch(&path).await?;
    let document =
        StoryDocument::from_slice(&bytes).map_err(|source| LoadError::Parse {
            path: path.clone(),
            source,
        })?;
    log::debug!("Loaded {path} with {} entries", document.story.len());

    let predefined = match document.predefined_constants_path() {
        Some(constants_path) => {
            validate_name(constants_path)?;
            Some(load_constants(source, constants_path).await?)
        }
        None => None,
    };

    Ok(LoadedStory {
        kind,
        document,
        predefined,
    })
}

async fn load_constants(
    source: &dyn DocumentSource,
    path: &str,
) -> Result<Map<String, Value>, LoadError> {
    let bytes = source.fetch(path).await?;
    let value: Value = serde_json::from_slice(&bytes).map_err(|source| LoadError::Parse {
        path: path.to_string(),
        source,
    })?;

    match value {
        Value::Object(constants) => {
            log::debug!("Loaded {} predefined constants from {path}", constants.len());
            Ok(constants)
        }
        _ => Err(LoadError::InvalidConstants {
            path: path.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn source() -> InMemorySource {
        InMemorySource::new()
            .with_json(
                "scripts/events/date.json",
                &json!({
                    "metadata": {"storyName": "First Date"},
                    "constants": {
                        "paths": {"predefinedConstants": "scripts/constants.json"},
                        "defaultColors": {"Alice": "#f0a"}
                    },
                    "story": [{"dialogue": "Hello"}]
                }),
            )
            .with_json(
                "scripts/constants.json",
                &json!({"defaultColors": {"Alice": "#fff"}, "chapter": 2}),
            )
            .with_json("scripts/texting/bare.json", &json!([{"dialogue": "hey"}]))
    }

    #[tokio::test]
    async fn loads_story_with_predefined_constants() {
        let loaded = load_story(&source(), &LoaderConfig::default(), StoryKind::Event, "date.json")
            .await
            .unwrap();
        assert_eq!(loaded.story_name(), Some("First Date"));
        assert_eq!(loaded.document.story.len(), 1);
        assert_eq!(loaded.predefined.as_ref().unwrap()["chapter"], 2);
    }

    #[tokio::test]
    async fn event_store_lets_shared_constants_win() {
        let loaded = load_story(&source(), &LoaderConfig::default(), StoryKind::Event, "date.json")
            .await
            .unwrap();
        let store = loaded.prepare_store(&AffectionLevels::new());
        assert_eq!(store.speaker_color("Alice"), Some("#fff"));
        assert_eq!(store.get("chapter"), Some(&json!(2)));
        assert!(store.get("paths").is_some());
    }

    #[tokio::test]
    async fn texting_store_nests_shared_constants() {
        let mut loaded = load_story(&source(), &LoaderConfig::default(), StoryKind::Event, "date.json")
            .await
            .unwrap();
        loaded.kind = StoryKind::Texting;

        let mut levels = AffectionLevels::new();
        levels.insert("Alice".to_string(), 3.0);
        let store = loaded.prepare_store(&levels);

        assert_eq!(store.get("constants").unwrap()["chapter"], 2);
        assert_eq!(store.get("chapter"), None);
        // Story colours sit at the top level and are checked first
        assert_eq!(store.speaker_color("Alice"), Some("#f0a"));
        assert_eq!(store.affection_of("Alice"), 3.0);
    }

    #[tokio::test]
    async fn bare_array_document_is_the_story() {
        let loaded = load_story(&source(), &LoaderConfig::default(), StoryKind::Texting, "bare.json")
            .await
            .unwrap();
        assert_eq!(loaded.story_name(), None);
        assert_eq!(loaded.document.story.len(), 1);
        assert!(loaded.predefined.is_none());
    }

    #[tokio::test]
    async fn invalid_names_are_rejected_before_fetching() {
        for name in ["", "  ", "../save/unlocks.json", "/etc/passwd", "a/../../b.json"] {
            let err = load_story(&source(), &LoaderConfig::default(), StoryKind::Event, name)
                .await
                .unwrap_err();
            assert!(matches!(err, LoadError::InvalidName { .. }), "{name}: {err}");
        }
    }

    #[tokio::test]
    async fn predefined_constants_path_is_validated() {
        for escape in ["../secrets.json", "/etc/passwd", "scripts/../../x.json"] {
            let source = InMemorySource::new()
                .with_json(
                    "scripts/events/sneaky.json",
                    &json!({"constants": {"paths": {"predefinedConstants": escape}}, "story": []}),
                )
                .with_json(escape, &json!({"chapter": 1}));
            let err = load_story(&source, &LoaderConfig::default(), StoryKind::Event, "sneaky.json")
                .await
                .unwrap_err();
            assert!(
                matches!(err, LoadError::InvalidName { ref name, .. } if name == escape),
                "{escape}: {err}"
            );
        }
    }

    #[tokio::test]
    async fn missing_and_malformed_documents_fail() {
        let source = source()
            .with_json("scripts/events/broken.json", &json!("not a story"))
            .with_json(
                "scripts/events/bad_constants.json",
                &json!({"constants": {"paths": {"predefinedConstants": "scripts/list.json"}}, "story": []}),
            )
            .with_json("scripts/list.json", &json!([1, 2]));
        let config = LoaderConfig::default();

        let err = load_story(&source, &config, StoryKind::Event, "nope.json").await.unwrap_err();
        assert!(matches!(err, LoadError::NotFound { ref path } if path == "scripts/events/nope.json"));

        let err = load_story(&source, &config, StoryKind::Event, "broken.json").await.unwrap_err();
        assert!(matches!(err, LoadError::Parse { .. }));

        let err = load_story(&source, &config, StoryKind::Event, "bad_constants.json")
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::InvalidConstants { .. }));
    }

    #[tokio::test]
    async fn file_system_source_reads_relative_to_base() {
        let dir = std::env::temp_dir().join(format!("tokimeki-loader-{}", std::process::id()));
        tokio::fs::create_dir_all(dir.join("scripts/events")).await.unwrap();
        tokio::fs::write(dir.join("scripts/events/intro.json"), r#"[{"dialogue": "Hi"}]"#)
            .await
            .unwrap();

        let source = FileSystemSource::new(&dir);
        let loaded = load_story(&source, &LoaderConfig::default(), StoryKind::Event, "intro.json")
            .await
            .unwrap();
        assert_eq!(loaded.document.story[0].dialogue(), Some("Hi"));

        let err = source.fetch("scripts/events/missing.json").await.unwrap_err();
        assert!(matches!(err, LoadError::NotFound { .. }));

        let _ = tokio::fs::remove_dir_all(dir).await;
    }
}
