//! Core types for the tokimeki library
//!
//! - Entry: one node of a story script (dialogue, staging, branch, choices)
//! - StoryDocument: a whole script with metadata and constants
//! - Instruction: primitive rendering instruction for the presentation layer
//! - Event: external signal resuming a suspended interpreter

pub mod document;
pub mod entry;
pub mod event;
pub mod instruction;

pub use document::{Constants, Metadata, StoryDocument};
pub use entry::{Branch, Choice, EffectSet, Entry, EntrySequence, Position, Unlocks};
pub use event::{Event, TimerToken};
pub use instruction::{ChoiceView, Instruction};
