//! Rendering instructions emitted by the interpreter
//!
//! Instructions describe what the presentation layer should do; the
//! interpreter never renders anything itself.

use super::entry::Position;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "args", rename_all = "camelCase")]
pub enum Instruction {
    /// Update the window/page title
    SetTitle { title: String },
    /// Transition to a new background
    ShowBackground { key: String, path: String },
    /// Show, move or re-pose a character sprite
    ShowCharacter {
        name: String,
        image: String,
        position: Position,
    },
    /// Remove a character sprite
    ExitCharacter { name: String },
    /// Display a dialogue line (or a message in the texting list)
    ShowDialogue {
        text: String,
        speaker: Option<String>,
        position: Position,
        color: Option<String>,
        avatar: Option<String>,
    },
    PlaySfx { key: String, path: String },
    PlayVfx { key: String },
    /// Present a choice set; the interpreter waits for a selection
    ShowChoices { choices: Vec<ChoiceView> },
    /// The player picked this choice
    ChoiceSelected { index: usize, text: String },
    ShowToast { text: String },
    ShowTypingIndicator { from_player: bool },
    HideTypingIndicator,
    /// The story is over; tear down the playback surface
    EndStory,
}

/// A choice as presented to the player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceView {
    pub index: usize,
    pub text: String,
}

impl Instruction {
    /// Short tag naming the instruction kind
    pub fn tag(&self) -> &'static str {
        match self {
            Instruction::SetTitle { .. } => "set_title",
            Instruction::ShowBackground { .. } => "show_background",
            Instruction::ShowCharacter { .. } => "show_character",
            Instruction::ExitCharacter { .. } => "exit_character",
            Instruction::ShowDialogue { .. } => "show_dialogue",
            Instruction::PlaySfx { .. } => "play_sfx",
            Instruction::PlayVfx { .. } => "play_vfx",
            Instruction::ShowChoices { .. } => "show_choices",
            Instruction::ChoiceSelected { .. } => "choice_selected",
            Instruction::ShowToast { .. } => "show_toast",
            Instruction::ShowTypingIndicator { .. } => "show_typing_indicator",
            Instruction::HideTypingIndicator => "hide_typing_indicator",
            Instruction::EndStory => "end_story",
        }
    }
}
