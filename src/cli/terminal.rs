//! Terminal presentation for the player
//!
//! Tracks which characters are on stage so only changes are printed.

use crate::presentation::{DialogueLine, Presentation, PresentationError};
use crate::runtime::PlaybackMode;
use crate::types::{ChoiceView, Position};
use std::collections::BTreeMap;
use std::io::Write;

#[derive(Debug, Clone, PartialEq)]
struct OnStage {
    image: String,
    position: Position,
}

pub struct TerminalPresentation<W: Write> {
    out: W,
    mode: PlaybackMode,
    stage: BTreeMap<String, OnStage>,
    background: Option<String>,
}

impl<W: Write> TerminalPresentation<W> {
    pub fn new(out: W, mode: PlaybackMode) -> Self {
        Self {
            out,
            mode,
            stage: BTreeMap::new(),
            background: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Characters currently on stage, by name
    pub fn on_stage(&self) -> impl Iterator<Item = &str> {
        self.stage.keys().map(String::as_str)
    }

    fn line(&mut self, text: &str) -> Result<(), PresentationError> {
        writeln!(self.out, "{text}")
            .and_then(|_| self.out.flush())
            .map_err(|e| PresentationError::other(format!("terminal write failed: {e}")))
    }
}

impl<W: Write> Presentation for TerminalPresentation<W> {
    fn show_dialogue(&mut self, line: DialogueLine<'_>) -> Result<(), PresentationError> {
        let rendered = match (self.mode, line.speaker) {
            (PlaybackMode::Scene, Some(speaker)) => format!("{speaker}: {}", line.text),
            (PlaybackMode::Scene, None) => line.text.to_string(),
            (PlaybackMode::Texting, Some(speaker)) => format!("[{speaker}] {}", line.text),
            (PlaybackMode::Texting, None) => format!("{:>40}", format!("{} [you]", line.text)),
        };
        self.line(&rendered)
    }

    fn show_choices(&mut self, choices: &[ChoiceView]) -> Result<(), PresentationError> {
        self.line("")?;
        for choice in choices {
            self.line(&format!("  {}) {}", choice.index + 1, choice.text))?;
        }
        Ok(())
    }

    fn set_title(&mut self, title: &str) -> Result<(), PresentationError> {
        self.line(&format!("=== {title} ==="))
    }

    fn show_background(&mut self, key: &str, _path: &str) -> Result<(), PresentationError> {
        if self.background.as_deref() == Some(key) {
            return Ok(());
        }
        self.background = Some(key.to_string());
        self.line(&format!("[Background: {key}]"))
    }

    fn show_character(
        &mut self,
        name: &str,
        image: &str,
        position: Position,
    ) -> Result<(), PresentationError> {
        let next = OnStage {
            image: image.to_string(),
            position,
        };
        let message = match self.stage.insert(name.to_string(), next.clone()) {
            None => format!("[{name} enters ({})]", position.as_str()),
            Some(previous) if previous.position != position => {
                format!("[{name} moves {}]", position.as_str())
            }
            Some(previous) if previous.image != next.image => format!("[{name}: {image}]"),
            Some(_) => return Ok(()),
        };
        self.line(&message)
    }

    fn exit_character(&mut self, name: &str) -> Result<(), PresentationError> {
        if self.stage.remove(name).is_none() {
            return Ok(());
        }
        self.line(&format!("[{name} leaves]"))
    }

    fn play_sfx(&mut self, key: &str, _path: &str) -> Result<(), PresentationError> {
        self.line(&format!("[Sound: {key}]"))
    }

    fn play_vfx(&mut self, key: &str) -> Result<(), PresentationError> {
        self.line(&format!("[Effect: {key}]"))
    }

    fn choice_selected(&mut self, _index: usize, text: &str) -> Result<(), PresentationError> {
        self.line(&format!("> {text}"))
    }

    fn show_toast(&mut self, text: &str) -> Result<(), PresentationError> {
        self.line(&format!("* {text} *"))
    }

    fn show_typing_indicator(&mut self, from_player: bool) -> Result<(), PresentationError> {
        let who = if from_player { "you" } else { "they" };
        self.line(&format!("  ... ({who} typing)"))
    }

    fn end_story(&mut self) -> Result<(), PresentationError> {
        self.stage.clear();
        self.background = None;
        self.line("")
    }
}
