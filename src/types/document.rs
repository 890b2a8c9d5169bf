//! Story documents as fetched from the script directories

use super::entry::EntrySequence;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A complete story script
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoryDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constants: Option<Constants>,
    #[serde(default)]
    pub story: EntrySequence,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DocumentShape {
    Bare(EntrySequence),
    Full(StoryDocument),
}

impl StoryDocument {
    /// Parse a document; a bare entry array is accepted as the story itself.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let shape: DocumentShape = serde_json::from_slice(bytes)?;
        Ok(match shape {
            DocumentShape::Full(document) => document,
            DocumentShape::Bare(story) => StoryDocument {
                story,
                ..Default::default()
            },
        })
    }

    pub fn story_name(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.story_name.as_deref())
            .filter(|name| !name.is_empty())
    }

    /// Location of the shared constants document, if any
    pub fn predefined_constants_path(&self) -> Option<&str> {
        self.constants.as_ref()?.predefined_constants_path()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub story_name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Free-form constants merged into the variable store.
///
/// Well-known keys are `affection`, `defaultColors` and `paths`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Constants(pub Map<String, Value>);

impl Constants {
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn predefined_constants_path(&self) -> Option<&str> {
        self.0
            .get("paths")?
            .get("predefinedConstants")?
            .as_str()
            .filter(|path| !path.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_document_parses() {
        let doc = StoryDocument::from_slice(
            br#"{
                "metadata": {"storyName": "First Date", "author": "x"},
                "constants": {"paths": {"predefinedConstants": "scripts/constants.json"}},
                "story": [{"dialogue": "Hi"}]
            }"#,
        )
        .unwrap();

        assert_eq!(doc.story_name(), Some("First Date"));
        assert_eq!(
            doc.predefined_constants_path(),
            Some("scripts/constants.json")
        );
        assert_eq!(doc.story.len(), 1);
        assert_eq!(doc.metadata.unwrap().extra["author"], "x");
    }

    #[test]
    fn bare_array_is_the_story() {
        let doc = StoryDocument::from_slice(br#"[{"dialogue": "a"}, {"dialogue": "b"}]"#).unwrap();
        assert_eq!(doc.story.len(), 2);
        assert!(doc.metadata.is_none());
        assert!(doc.predefined_constants_path().is_none());
    }

    #[test]
    fn document_without_story_is_empty() {
        let doc = StoryDocument::from_slice(br#"{"metadata": {"storyName": ""}}"#).unwrap();
        assert!(doc.story.is_empty());
        assert_eq!(doc.story_name(), None);
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(StoryDocument::from_slice(b"{not json").is_err());
        assert!(StoryDocument::from_slice(br#"{"story": [{"position": 3}]}"#).is_err());
    }
}
