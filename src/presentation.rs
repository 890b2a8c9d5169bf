//! Presentation layer contract
//!
//! A presentation renders the instructions the interpreter emits. Only
//! dialogue and choices are mandatory; everything else defaults to a no-op
//! so a minimal front end (a log, a test recorder) stays small.

use crate::types::{ChoiceView, Instruction, Position};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PresentationError {
    /// The element an operation renders into does not exist
    #[error("Presentation target '{target}' is missing")]
    MissingTarget { target: String },

    #[error("Presentation failed: {message}")]
    Other { message: String },
}

impl PresentationError {
    pub fn missing_target(target: impl Into<String>) -> Self {
        Self::MissingTarget {
            target: target.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

/// A dialogue line ready to render
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DialogueLine<'a> {
    pub text: &'a str,
    pub speaker: Option<&'a str>,
    pub position: Position,
    pub color: Option<&'a str>,
    pub avatar: Option<&'a str>,
}

pub trait Presentation {
    fn show_dialogue(&mut self, line: DialogueLine<'_>) -> Result<(), PresentationError>;

    fn show_choices(&mut self, choices: &[ChoiceView]) -> Result<(), PresentationError>;

    fn set_title(&mut self, title: &str) -> Result<(), PresentationError> {
        let _ = title;
        Ok(())
    }

    fn show_background(&mut self, key: &str, path: &str) -> Result<(), PresentationError> {
        let _ = (key, path);
        Ok(())
    }

    /// Show a character, or move/re-pose one already on stage
    fn show_character(
        &mut self,
        name: &str,
        image: &str,
        position: Position,
    ) -> Result<(), PresentationError> {
        let _ = (name, image, position);
        Ok(())
    }

    fn exit_character(&mut self, name: &str) -> Result<(), PresentationError> {
        let _ = name;
        Ok(())
    }

    fn play_sfx(&mut self, key: &str, path: &str) -> Result<(), PresentationError> {
        let _ = (key, path);
        Ok(())
    }

    fn play_vfx(&mut self, key: &str) -> Result<(), PresentationError> {
        let _ = key;
        Ok(())
    }

    /// Replace the open choice set with the picked one
    fn choice_selected(&mut self, index: usize, text: &str) -> Result<(), PresentationError> {
        let _ = (index, text);
        Ok(())
    }

    fn show_toast(&mut self, text: &str) -> Result<(), PresentationError> {
        let _ = text;
        Ok(())
    }

    fn show_typing_indicator(&mut self, from_player: bool) -> Result<(), PresentationError> {
        let _ = from_player;
        Ok(())
    }

    fn hide_typing_indicator(&mut self) -> Result<(), PresentationError> {
        Ok(())
    }

    /// Tear down the playback surface
    fn end_story(&mut self) -> Result<(), PresentationError> {
        Ok(())
    }
}

/// Render a single instruction
pub fn render(
    presentation: &mut dyn Presentation,
    instruction: &Instruction,
) -> Result<(), PresentationError> {
    match instruction {
        Instruction::SetTitle { title } => presentation.set_title(title),
        Instruction::ShowBackground { key, path } => presentation.show_background(key, path),
        Instruction::ShowCharacter {
            name,
            image,
            position,
        } => presentation.show_character(name, image, *position),
        Instruction::ExitCharacter { name } => presentation.exit_character(name),
        Instruction::ShowDialogue {
            text,
            speaker,
            position,
            color,
            avatar,
        } => presentation.show_dialogue(DialogueLine {
            text,
            speaker: speaker.as_deref(),
            position: *position,
            color: color.as_deref(),
            avatar: avatar.as_deref(),
        }),
        Instruction::PlaySfx { key, path } => presentation.play_sfx(key, path),
        Instruction::PlayVfx { key } => presentation.play_vfx(key),
        Instruction::ShowChoices { choices } => presentation.show_choices(choices),
        Instruction::ChoiceSelected { index, text } => presentation.choice_selected(*index, text),
        Instruction::ShowToast { text } => presentation.show_toast(text),
        Instruction::ShowTypingIndicator { from_player } => {
            presentation.show_typing_indicator(*from_player)
        }
        Instruction::HideTypingIndicator => presentation.hide_typing_indicator(),
        Instruction::EndStory => presentation.end_story(),
    }
}

/// Render every instruction in order.
///
/// A failing instruction does not stop the ones after it; all failures are
/// logged and returned.
pub fn dispatch(
    presentation: &mut dyn Presentation,
    instructions: &[Instruction],
) -> Vec<PresentationError> {
    let mut failures = Vec::new();
    for instruction in instructions {
        if let Err(err) = render(presentation, instruction) {
            log::error!("Failed to render {}: {err}", instruction.tag());
            failures.push(err);
        }
    }
    failures
}
