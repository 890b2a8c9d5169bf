//! Story-scoped variable store
//!
//! Holds the constants merged in at load time plus every variable written
//! by choice effects. Top-level keys are the identifiers visible to branch
//! conditions.

use crate::storage::{AffectionLevels, Persistence, StorageError};
use crate::types::entry::{AFFECTION_KEY, EffectSet};
use serde_json::{Map, Number, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct VariableStore {
    vars: Map<String, Value>,
}

impl Default for VariableStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VariableStore {
    /// Empty store with an empty affection map
    pub fn new() -> Self {
        let mut vars = Map::new();
        vars.insert(AFFECTION_KEY.to_string(), Value::Object(Map::new()));
        Self { vars }
    }

    /// Store seeded with persisted affection levels
    pub fn with_affection(levels: &AffectionLevels) -> Self {
        let mut store = Self::new();
        let affection = levels
            .iter()
            .map(|(name, level)| (name.clone(), number(*level)))
            .collect();
        store
            .vars
            .insert(AFFECTION_KEY.to_string(), Value::Object(affection));
        store
    }

    /// All bindings visible to conditions
    pub fn bindings(&self) -> &Map<String, Value> {
        &self.vars
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.vars.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.vars.insert(key.into(), value);
    }

    /// Shallow merge: top-level keys of `constants` replace existing ones.
    pub fn merge_constants(&mut self, constants: &Map<String, Value>) {
        for (key, value) in constants {
            self.vars.insert(key.clone(), value.clone());
        }
    }

    /// Shallow merge into the object stored under `key`, creating it if needed
    pub fn merge_into(&mut self, key: &str, constants: &Map<String, Value>) {
        let slot = self
            .vars
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        if let Value::Object(target) = slot {
            for (k, v) in constants {
                target.insert(k.clone(), v.clone());
            }
        }
    }

    /// Numeric affection levels; non-numeric entries are left out
    pub fn affection(&self) -> AffectionLevels {
        match self.vars.get(AFFECTION_KEY) {
            Some(Value::Object(levels)) => levels
                .iter()
                .filter_map(|(name, level)| level.as_f64().map(|l| (name.clone(), l)))
                .collect(),
            _ => AffectionLevels::new(),
        }
    }

    pub fn affection_of(&self, character: &str) -> f64 {
        self.vars
            .get(AFFECTION_KEY)
            .and_then(|levels| levels.get(character))
            .and_then(Value::as_f64)
            .unwrap_or(0.0)
    }

    /// Apply a choice's effects.
    ///
    /// Affection deltas are added and the whole affection map is persisted
    /// after each one. Every other key replaces the stored value and lives
    /// only as long as this store. All effects are applied even if a write
    /// fails; the first failure is returned.
    pub fn apply_effects(
        &mut self,
        effects: &EffectSet,
        persistence: &mut dyn Persistence,
    ) -> Result<(), StorageError> {
        let mut first_error = None;

        for (key, value) in effects.iter() {
            if key != AFFECTION_KEY {
                log::debug!("Setting story variable {key} = {value}");
                self.vars.insert(key.clone(), value.clone());
                continue;
            }

            let Value::Object(deltas) = value else {
                log::warn!("Ignoring affection effect that is not an object: {value}");
                continue;
            };

            for (character, delta) in deltas {
                let Some(delta) = delta.as_f64() else {
                    log::warn!("Ignoring non-numeric affection delta for {character}: {delta}");
                    continue;
                };
                let level = self.affection_of(character) + delta;
                self.set_affection(character, level);
                log::debug!("Affection for {character} is now {level}");

                if let Err(err) = persistence.save_affection(&self.affection()) {
                    log::error!("Failed to persist affection levels: {err}");
                    first_error.get_or_insert(err);
                }
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    /// Dialogue colour configured for a speaker
    pub fn speaker_color(&self, character: &str) -> Option<&str> {
        fn lookup<'a>(colors: Option<&'a Value>, character: &str) -> Option<&'a str> {
            colors?.get(character)?.as_str()
        }

        let nested = self.vars.get("constants").and_then(|c| c.get("defaultColors"));
        lookup(self.vars.get("defaultColors"), character).or_else(|| lookup(nested, character))
    }

    fn set_affection(&mut self, character: &str, level: f64) {
        match self.vars.get_mut(AFFECTION_KEY) {
            Some(Value::Object(levels)) => {
                levels.insert(character.to_string(), number(level));
            }
            _ => {
                let mut levels = Map::new();
                levels.insert(character.to_string(), number(level));
                self.vars
                    .insert(AFFECTION_KEY.to_string(), Value::Object(levels));
            }
        }
    }
}

/// JSON number, integral when the value has no fractional part
fn number(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Value::Number(Number::from(value as i64))
    } else {
        Number::from_f64(value).map_or(Value::Null, Value::Number)
    }
}
