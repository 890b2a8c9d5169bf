//! # tokimeki
//!
//! A story interpreter for branching dating-sim scripts. Stories are JSON
//! documents: ordered entries that show dialogue, stage characters, offer
//! choices and nest conditional sub-stories. Choices move affection levels
//! that persist between playthroughs and gate later branches.
//!
//! The interpreter is a pure state machine. It emits [`Instruction`]s as
//! data and suspends on a [`Wait`]; a host feeds it [`Event`]s back. A
//! [`Session`] wires it to a [`Presentation`] and to persisted player state.
//!
//! ## Quick Start
//!
//! ```rust
//! use tokimeki::loader::{InMemorySource, StoryKind};
//! use tokimeki::presentation::{DialogueLine, Presentation, PresentationError};
//! use tokimeki::storage::{LocalStorage, MemoryStore};
//! use tokimeki::types::ChoiceView;
//! use tokimeki::{Session, Wait};
//!
//! struct Printer;
//!
//! impl Presentation for Printer {
//!     fn show_dialogue(&mut self, line: DialogueLine<'_>) -> Result<(), PresentationError> {
//!         match line.speaker {
//!             Some(speaker) => println!("{speaker}: {}", line.text),
//!             None => println!("{}", line.text),
//!         }
//!         Ok(())
//!     }
//!
//!     fn show_choices(&mut self, choices: &[ChoiceView]) -> Result<(), PresentationError> {
//!         for choice in choices {
//!             println!("{}) {}", choice.index + 1, choice.text);
//!         }
//!         Ok(())
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let source = InMemorySource::new().with_json(
//!     "scripts/events/cafe.json",
//!     &serde_json::json!({
//!         "metadata": {"storyName": "Cafe"},
//!         "story": [
//!             {"character": "Alice", "dialogue": "Coffee?",
//!              "responses": [
//!                  {"text": "Sure", "effects": {"affection": {"Alice": 1}}},
//!                  {"text": "No thanks"}
//!              ]},
//!             {"branch": {"condition": "affection.Alice >= 1",
//!                         "story": [{"character": "Alice", "dialogue": "Yay!"}]}}
//!         ]
//!     }),
//! );
//!
//! let storage = LocalStorage::new(MemoryStore::new());
//! let mut session = Session::builder(Printer, Box::new(storage))
//!     .load(&source, StoryKind::Event, "cafe.json")
//!     .await?;
//!
//! let mut wait = session.start()?;
//! while wait != Wait::Ended {
//!     wait = match wait {
//!         Wait::Choice => session.choose(0)?,
//!         _ => session.advance()?,
//!     };
//! }
//! assert_eq!(session.interpreter().store().affection_of("Alice"), 1.0);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod condition;
pub mod loader;
pub mod presentation;
pub mod resolve;
pub mod runtime;
pub mod session;
pub mod storage;
pub mod store;
pub mod types;
pub mod unlocks;

pub use loader::{DocumentSource, FileSystemSource, InMemorySource, LoadError, StoryKind};
pub use presentation::{Presentation, PresentationError};
pub use runtime::{Interpreter, InterpreterOptions, PlaybackMode, RuntimeError, StepOutcome, Wait};
pub use session::{Session, SessionError};
pub use storage::{LocalStorage, Persistence, StorageError};
pub use store::VariableStore;
pub use types::{Entry, Event, Instruction, StoryDocument};
pub use unlocks::UnlockLedger;
