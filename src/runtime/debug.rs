//! Debug tracing for story execution
//!
//! Tracing is off unless the host turns it on, either with the page-style
//! query flag (`debug=1`) or the `TOKIMEKI_DEBUG` environment variable.
//! The interpreter only talks to a [`DebugSink`], so hosts and tests can
//! swap the destination.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Environment variable that enables tracing for the terminal host
pub const DEBUG_ENV_VAR: &str = "TOKIMEKI_DEBUG";

/// Debug log category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DebugCategory {
    /// Interpreter lifecycle and suspension
    Engine,
    /// Context pushes/pops and branch decisions
    Flow,
    /// Effects and constant merges
    Variables,
    /// Condition evaluation failures
    Conditions,
    /// Persistence reads and writes
    Storage,
}

impl DebugCategory {
    pub const ALL: [DebugCategory; 5] = [
        DebugCategory::Engine,
        DebugCategory::Flow,
        DebugCategory::Variables,
        DebugCategory::Conditions,
        DebugCategory::Storage,
    ];
}

/// Debug output destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DebugOutput {
    /// Through the `log` facade
    #[default]
    Log,
    /// Straight to stderr
    Stderr,
}

/// Debug configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugConfig {
    pub enabled: bool,
    pub categories: HashSet<DebugCategory>,
    pub output: DebugOutput,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            categories: DebugCategory::ALL.into_iter().collect(),
            output: DebugOutput::Log,
        }
    }
}

impl DebugConfig {
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    /// Read the flag from a URL query string such as `?story=a.json&debug=1`
    pub fn from_query(query: &str) -> Self {
        let enabled = query
            .trim_start_matches('?')
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .any(|(key, value)| key == "debug" && matches!(value, "1" | "true"));

        Self {
            enabled,
            ..Self::default()
        }
    }

    /// Read `TOKIMEKI_DEBUG`; traces go to stderr since no logger may be installed
    pub fn from_env() -> Self {
        Self::from_env_value(std::env::var(DEBUG_ENV_VAR).ok().as_deref())
    }

    fn from_env_value(value: Option<&str>) -> Self {
        Self {
            enabled: value.is_some_and(|value| value != "0"),
            output: DebugOutput::Stderr,
            ..Self::default()
        }
    }

    pub fn is_enabled_for(&self, category: DebugCategory) -> bool {
        self.enabled && self.categories.contains(&category)
    }
}

/// Observability hook the interpreter reports to
pub trait DebugSink: Send {
    fn record(&self, category: DebugCategory, message: &str, data: &Value);
}

/// Sink that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl DebugSink for NoopSink {
    fn record(&self, _category: DebugCategory, _message: &str, _data: &Value) {}
}

/// Sink gated by a [`DebugConfig`]
#[derive(Debug, Clone, Default)]
pub struct LogSink {
    config: DebugConfig,
}

impl LogSink {
    pub fn new(config: DebugConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DebugConfig {
        &self.config
    }
}

impl DebugSink for LogSink {
    fn record(&self, category: DebugCategory, message: &str, data: &Value) {
        if !self.config.is_enabled_for(category) {
            return;
        }

        let category_str = format!("{category:?}");
        match self.config.output {
            DebugOutput::Log if data.is_null() => {
                log::debug!(target: "tokimeki::debug", "[{category_str}] {message}");
            }
            DebugOutput::Log => {
                log::debug!(target: "tokimeki::debug", "[{category_str}] {message} {data}");
            }
            DebugOutput::Stderr if data.is_null() => {
                eprintln!("[DEBUG] {category_str:10} {message}");
            }
            DebugOutput::Stderr => {
                eprintln!("[DEBUG] {category_str:10} {message} {data}");
            }
        }
    }
}

/// One captured debug record
#[derive(Debug, Clone, PartialEq)]
pub struct DebugRecord {
    pub category: DebugCategory,
    pub message: String,
    pub data: Value,
}

/// Sink that keeps every record; clones share the same buffer
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<DebugRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<DebugRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    pub fn records_in(&self, category: DebugCategory) -> Vec<DebugRecord> {
        self.records()
            .into_iter()
            .filter(|record| record.category == category)
            .collect()
    }
}

impl DebugSink for MemorySink {
    fn record(&self, category: DebugCategory, message: &str, data: &Value) {
        if let Ok(mut records) = self.records.lock() {
            records.push(DebugRecord {
                category,
                message: message.to_string(),
                data: data.clone(),
            });
        }
    }
}
