//! Narrative entries as they appear in story scripts

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// An ordered, immutable sequence of entries.
///
/// Sequences are shared between the loaded document and the execution
/// contexts walking them, so pushing a branch never copies its entries.
/// An entry is identified by its index inside the sequence that owns it.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntrySequence(Arc<[Entry]>);

impl EntrySequence {
    pub fn new(entries: Vec<Entry>) -> Self {
        Self(Arc::from(entries))
    }

    /// Whether both handles point at the same underlying sequence
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for EntrySequence {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl From<Vec<Entry>> for EntrySequence {
    fn from(entries: Vec<Entry>) -> Self {
        Self::new(entries)
    }
}

impl Deref for EntrySequence {
    type Target = [Entry];

    fn deref(&self) -> &[Entry] {
        &self.0
    }
}

impl fmt::Debug for EntrySequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}

/// Sprite placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Position {
    Left,
    Right,
    /// Any value other than left/right/exit
    #[default]
    Center,
    /// Remove the character from the scene
    Exit,
}

impl From<String> for Position {
    fn from(value: String) -> Self {
        match value.as_str() {
            "left" => Position::Left,
            "right" => Position::Right,
            "exit" => Position::Exit,
            _ => Position::Center,
        }
    }
}

impl From<Position> for String {
    fn from(position: Position) -> Self {
        position.as_str().to_string()
    }
}

impl Position {
    pub fn as_str(&self) -> &'static str {
        match self {
            Position::Left => "left",
            Position::Right => "right",
            Position::Center => "center",
            Position::Exit => "exit",
        }
    }
}

/// One node of a narrative sequence
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outfit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialogue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sfx: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vfx: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responses: Option<Vec<Choice>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<Branch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlocks: Option<Unlocks>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

impl Entry {
    pub fn character(&self) -> Option<&str> {
        present(&self.character)
    }

    pub fn dialogue(&self) -> Option<&str> {
        present(&self.dialogue)
    }

    pub fn background(&self) -> Option<&str> {
        present(&self.background)
    }

    pub fn sfx(&self) -> Option<&str> {
        present(&self.sfx)
    }

    pub fn vfx(&self) -> Option<&str> {
        present(&self.vfx)
    }

    /// The choice set, if the entry has at least one choice
    pub fn responses(&self) -> Option<&[Choice]> {
        self.responses.as_deref().filter(|choices| !choices.is_empty())
    }

    pub fn position(&self) -> Position {
        self.position.unwrap_or_default()
    }

    pub fn dialogue_line(speaker: Option<&str>, text: &str) -> Self {
        Self {
            character: speaker.map(str::to_string),
            dialogue: Some(text.to_string()),
            ..Default::default()
        }
    }
}

/// Conditional subroutine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub condition: String,
    #[serde(default)]
    pub story: EntrySequence,
}

/// A selectable option of a choice step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effects: Option<EffectSet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toast: Option<String>,
}

impl Choice {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            effects: None,
            toast: None,
        }
    }

    /// Toast text with the first `{{char}}` replaced by the affected characters
    pub fn toast_message(&self) -> Option<String> {
        let toast = self.toast.as_deref().filter(|t| !t.is_empty())?;
        let names: Vec<&str> = self
            .effects
            .as_ref()
            .map(|effects| effects.affected_characters())
            .unwrap_or_default();

        let replacement = match names.as_slice() {
            [one] => one.to_string(),
            [first, second] => format!("{first} and {second}"),
            _ => "They".to_string(),
        };
        Some(toast.replacen("{{char}}", &replacement, 1))
    }
}

/// Variable effects attached to a choice.
///
/// The reserved key `affection` maps character names to signed deltas that
/// are added to the current level; every other key replaces the store value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EffectSet(Map<String, Value>);

pub const AFFECTION_KEY: &str = "affection";

impl EffectSet {
    pub fn new(effects: Map<String, Value>) -> Self {
        Self(effects)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Character names listed under `affection`, in script order
    pub fn affected_characters(&self) -> Vec<&str> {
        match self.0.get(AFFECTION_KEY) {
            Some(Value::Object(deltas)) => deltas.keys().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }
}

impl From<Value> for EffectSet {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }
}

/// Unlock records carried by an entry: category → slot → unlock id
pub type Unlocks = BTreeMap<String, Map<String, Value>>;
