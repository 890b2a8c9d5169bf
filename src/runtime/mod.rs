//! Story interpreter
//!
//! Walks a tree of entries with a stack of execution contexts and emits
//! [`Instruction`]s for the presentation layer. The interpreter never waits
//! on anything itself: each call runs until the next suspension point and
//! returns the instructions produced plus what it is now waiting for.
//!
//! Suspension points are a dialogue line (user input, or an autoplay timer
//! racing it), a choice set, and optionally a root-level branch. Every
//! other step runs straight through.

use crate::condition;
use crate::resolve::{AssetResolver, BasicResolver};
use crate::storage::Persistence;
use crate::store::VariableStore;
use crate::types::{
    Choice, ChoiceView, Entry, EntrySequence, Event, Instruction, Position, TimerToken, Unlocks,
};
use crate::unlocks::UnlockLedger;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;

mod context;
pub mod debug;
mod pacing;


pub use context::{ContextStack, ExecutionContext, PeekNext};
pub use debug::{
    DebugCategory, DebugConfig, DebugOutput, DebugRecord, DebugSink, LogSink, MemorySink, NoopSink,
};
pub use pacing::{AutoplayTimer, PacingConfig};

/// Application title shown when no story is playing
pub const APP_TITLE: &str = "Tokimeki";

/// Which player variant drives the story
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlaybackMode {
    /// Visual-novel scene: sprites, backgrounds, effects
    #[default]
    Scene,
    /// Message list: speakers and avatars only
    Texting,
}

/// How a branch entry at the root of the story is paced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BranchPacing {
    /// Descend into (or skip) the branch without waiting
    #[default]
    Immediate,
    /// A skipped root-level branch waits for user input; a taken one shows
    /// its content straight away
    AwaitInputAtRoot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InterpreterOptions {
    pub mode: PlaybackMode,
    pub pacing: PacingConfig,
    pub branch_pacing: BranchPacing,
}

impl Default for InterpreterOptions {
    fn default() -> Self {
        Self::scene()
    }
}

impl InterpreterOptions {
    pub fn scene() -> Self {
        Self {
            mode: PlaybackMode::Scene,
            pacing: PacingConfig::scene(),
            branch_pacing: BranchPacing::Immediate,
        }
    }

    pub fn texting() -> Self {
        Self {
            mode: PlaybackMode::Texting,
            pacing: PacingConfig::texting(),
            branch_pacing: BranchPacing::Immediate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlaybackState {
    Idle,
    Running,
    AwaitingInput,
    /// Waiting for input or the armed autoplay timer, whichever comes first
    AwaitingTimer,
    AwaitingChoice,
    Ended,
}

/// What a suspended interpreter is waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    Input,
    /// Input, or the timer identified by `token` after `delay`
    Timer { token: TimerToken, delay: Duration },
    Choice,
    Ended,
}

/// Result of driving the interpreter to its next suspension point
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub instructions: Vec<Instruction>,
    pub wait: Wait,
}

impl StepOutcome {
    pub fn is_finished(&self) -> bool {
        self.wait == Wait::Ended
    }
}

/// Runtime errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
    #[error("Story has not been started")]
    NotStarted,

    #[error("Story has already been started")]
    AlreadyStarted,

    #[error("Story has finished")]
    Finished,

    #[error("No choice is pending")]
    NotAwaitingChoice,

    #[error("Choice {index} is out of range ({available} available)")]
    InvalidChoice { index: usize, available: usize },
}

pub struct Interpreter {
    options: InterpreterOptions,
    stack: ContextStack,
    store: VariableStore,
    ledger: UnlockLedger,
    persistence: Box<dyn Persistence>,
    resolver: Box<dyn AssetResolver>,
    sink: Box<dyn DebugSink>,
    clock: fn() -> DateTime<Utc>,
    story_name: Option<String>,
    autoplay: bool,
    state: PlaybackState,
    wait: Wait,
    timer: AutoplayTimer,
    pending_choices: Vec<Choice>,
    typing_indicator: bool,
}

impl Interpreter {
    pub fn new(story: EntrySequence, store: VariableStore, persistence: Box<dyn Persistence>) -> Self {
        Self {
            options: InterpreterOptions::default(),
            stack: ContextStack::new(story),
            store,
            ledger: UnlockLedger::default(),
            persistence,
            resolver: Box::new(BasicResolver::default()),
            sink: Box::new(NoopSink),
            clock: Utc::now,
            story_name: None,
            autoplay: false,
            state: PlaybackState::Idle,
            wait: Wait::Input,
            timer: AutoplayTimer::default(),
            pending_choices: Vec::new(),
            typing_indicator: false,
        }
    }

    pub fn with_options(mut self, options: InterpreterOptions) -> Self {
        self.options = options;
        self
    }

    /// Previously persisted unlocks to merge new ones into
    pub fn with_ledger(mut self, ledger: UnlockLedger) -> Self {
        self.ledger = ledger;
        self
    }

    pub fn with_autoplay(mut self, autoplay: bool) -> Self {
        self.autoplay = autoplay;
        self
    }

    pub fn with_story_name(mut self, name: Option<String>) -> Self {
        self.story_name = name;
        self
    }

    pub fn with_resolver(mut self, resolver: Box<dyn AssetResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_debug_sink(mut self, sink: Box<dyn DebugSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Clock used to timestamp unlocks
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn options(&self) -> &InterpreterOptions {
        &self.options
    }

    pub fn store(&self) -> &VariableStore {
        &self.store
    }

    pub fn ledger(&self) -> &UnlockLedger {
        &self.ledger
    }

    /// Number of active contexts; zero once the story has ended
    pub fn depth(&self) -> usize {
        self.stack.depth()
    }

    pub fn pending_choices(&self) -> &[Choice] {
        &self.pending_choices
    }

    pub fn autoplay(&self) -> bool {
        self.autoplay
    }

    /// Toggle autoplay; takes effect at the next dialogue line
    pub fn set_autoplay(&mut self, autoplay: bool) {
        self.autoplay = autoplay;
    }

    /// The entry the next advance would consume, without consuming it
    pub fn peek_next(&self) -> Option<PeekNext> {
        self.stack.peek()
    }

    /// Begin playback and run to the first suspension point
    pub fn start(&mut self) -> Result<StepOutcome, RuntimeError> {
        if self.state != PlaybackState::Idle {
            return Err(RuntimeError::AlreadyStarted);
        }

        log::info!(
            "Starting story {:?} in {:?} mode",
            self.story_name.as_deref().unwrap_or("untitled"),
            self.options.mode
        );
        self.trace(
            DebugCategory::Engine,
            "Story started",
            json!({ "autoplay": self.autoplay, "depth": self.stack.depth() }),
        );

        let mut out = Vec::new();
        if let Some(name) = &self.story_name {
            out.push(Instruction::SetTitle {
                title: format!("{name} - {APP_TITLE}"),
            });
        }
        Ok(self.resume(out))
    }

    pub fn handle(&mut self, event: Event) -> Result<StepOutcome, RuntimeError> {
        match event {
            Event::Advance => self.advance_requested(),
            Event::TimerElapsed { token } => self.timer_elapsed(token),
            Event::Choose { index } => self.choose(index),
        }
    }

    /// User input: resume a dialogue wait, cancelling any autoplay timer
    pub fn advance_requested(&mut self) -> Result<StepOutcome, RuntimeError> {
        match self.state {
            PlaybackState::Idle => Err(RuntimeError::NotStarted),
            PlaybackState::Ended => Err(RuntimeError::Finished),
            PlaybackState::AwaitingChoice => {
                self.trace(DebugCategory::Flow, "Ignoring advance while a choice is pending", Value::Null);
                Ok(self.unchanged())
            }
            PlaybackState::Running | PlaybackState::AwaitingInput | PlaybackState::AwaitingTimer => {
                if let Some(token) = self.timer.cancel() {
                    self.trace(
                        DebugCategory::Engine,
                        "Cancelled autoplay timer",
                        json!({ "token": token.0 }),
                    );
                }
                let mut out = Vec::new();
                self.hide_typing_indicator(&mut out);
                Ok(self.resume(out))
            }
        }
    }

    /// Autoplay timer fired. Tokens that are no longer current are ignored.
    pub fn timer_elapsed(&mut self, token: TimerToken) -> Result<StepOutcome, RuntimeError> {
        match self.state {
            PlaybackState::Idle => Err(RuntimeError::NotStarted),
            PlaybackState::AwaitingTimer if self.timer.fire(token) => {
                let mut out = Vec::new();
                self.hide_typing_indicator(&mut out);
                Ok(self.resume(out))
            }
            _ => {
                self.trace(
                    DebugCategory::Engine,
                    "Ignoring stale autoplay timer",
                    json!({ "token": token.0 }),
                );
                Ok(self.unchanged())
            }
        }
    }

    /// Select one of the pending choices
    pub fn choose(&mut self, index: usize) -> Result<StepOutcome, RuntimeError> {
        match self.state {
            PlaybackState::Idle => return Err(RuntimeError::NotStarted),
            PlaybackState::Ended => return Err(RuntimeError::Finished),
            PlaybackState::AwaitingChoice => {}
            _ => return Err(RuntimeError::NotAwaitingChoice),
        }

        let available = self.pending_choices.len();
        if index >= available {
            return Err(RuntimeError::InvalidChoice { index, available });
        }

        let choices = std::mem::take(&mut self.pending_choices);
        let choice = &choices[index];
        let mut out = vec![Instruction::ChoiceSelected {
            index,
            text: choice.text.clone(),
        }];

        if let Some(effects) = choice.effects.as_ref().filter(|e| !e.is_empty()) {
            if let Err(err) = self.store.apply_effects(effects, &mut *self.persistence) {
                self.trace(
                    DebugCategory::Storage,
                    "Failed to persist choice effects",
                    json!({ "error": err.to_string() }),
                );
            }
            self.trace(
                DebugCategory::Variables,
                "Applied choice effects",
                json!({ "choice": choice.text, "affection": self.store.get("affection") }),
            );
        }

        if let Some(text) = choice.toast_message() {
            out.push(Instruction::ShowToast { text });
        }

        Ok(self.resume(out))
    }

    fn resume(&mut self, mut out: Vec<Instruction>) -> StepOutcome {
        self.state = PlaybackState::Running;
        let wait = self.run(&mut out);
        StepOutcome {
            instructions: out,
            wait,
        }
    }

    fn unchanged(&self) -> StepOutcome {
        StepOutcome {
            instructions: Vec::new(),
            wait: self.wait,
        }
    }

    fn run(&mut self, out: &mut Vec<Instruction>) -> Wait {
        loop {
            let depth = self.stack.depth();
            let Some(context) = self.stack.current_mut() else {
                return self.finish(out);
            };

            let Some(index) = context.next_unprocessed() else {
                self.stack.pop();
                self.trace(DebugCategory::Flow, "Context exhausted", json!({ "depth": depth }));
                continue;
            };

            context.mark_processed(index);
            let entries = context.entries().clone();
            if let Some(wait) = self.process(&entries[index], depth, out) {
                return wait;
            }
        }
    }

    /// Process one entry; `Some` means the interpreter suspended
    fn process(&mut self, entry: &Entry, depth: usize, out: &mut Vec<Instruction>) -> Option<Wait> {
        let scene = self.options.mode == PlaybackMode::Scene;

        if let Some(unlocks) = entry.unlocks.as_ref().filter(|u| !u.is_empty()) {
            self.commit_unlocks(unlocks);
        }

        if let Some(key) = entry.background().filter(|_| scene) {
            out.push(Instruction::ShowBackground {
                key: key.to_string(),
                path: self.resolver.background(key),
            });
        }

        if let Some(branch) = &entry.branch {
            let taken = condition::evaluate(&branch.condition, &self.store, &*self.sink);
            self.trace(
                DebugCategory::Flow,
                if taken { "Branch taken" } else { "Branch skipped" },
                json!({ "condition": branch.condition, "depth": depth }),
            );
            if taken {
                self.stack.push(branch.story.clone());
                return None;
            }
            // A skipped root branch still takes one click
            if depth == 1 && self.options.branch_pacing == BranchPacing::AwaitInputAtRoot {
                return Some(self.suspend(Wait::Input));
            }
            return None;
        }

        if let Some(name) = entry.character().filter(|_| scene) {
            out.push(self.stage_character(name, entry));
        }

        let dialogue = entry.dialogue();
        if let Some(text) = dialogue {
            let speaker = entry.character();
            out.push(Instruction::ShowDialogue {
                text: text.to_string(),
                speaker: speaker.map(str::to_string),
                position: entry.position(),
                color: speaker
                    .and_then(|name| self.store.speaker_color(name))
                    .map(str::to_string),
                avatar: speaker
                    .filter(|_| !scene)
                    .map(|name| self.resolver.texting_avatar(name)),
            });
        }

        if scene {
            if let Some(key) = entry.sfx() {
                out.push(Instruction::PlaySfx {
                    key: key.to_string(),
                    path: self.resolver.sfx(key),
                });
            }
            if let Some(key) = entry.vfx() {
                out.push(Instruction::PlayVfx {
                    key: key.to_string(),
                });
            }
        }

        if let Some(choices) = entry.responses() {
            self.pending_choices = choices.to_vec();
            out.push(Instruction::ShowChoices {
                choices: choices
                    .iter()
                    .enumerate()
                    .map(|(index, choice)| ChoiceView {
                        index,
                        text: choice.text.clone(),
                    })
                    .collect(),
            });
            return Some(self.suspend(Wait::Choice));
        }

        dialogue.map(|text| self.suspend_after_dialogue(text, out))
    }

    fn stage_character(&self, name: &str, entry: &Entry) -> Instruction {
        match entry.position() {
            Position::Exit => Instruction::ExitCharacter {
                name: name.to_string(),
            },
            position => Instruction::ShowCharacter {
                name: name.to_string(),
                image: self.resolver.character_image(
                    name,
                    entry.outfit.as_deref(),
                    entry.state.as_deref(),
                ),
                position,
            },
        }
    }

    fn suspend_after_dialogue(&mut self, text: &str, out: &mut Vec<Instruction>) -> Wait {
        let next = self.stack.peek();

        if self.options.mode == PlaybackMode::Texting {
            if let Some(next) = &next {
                out.push(Instruction::ShowTypingIndicator {
                    from_player: next.next_character.is_none(),
                });
                self.typing_indicator = true;
            }
        }

        let arm = self.autoplay
            && match self.options.mode {
                PlaybackMode::Scene => next.is_some(),
                PlaybackMode::Texting => true,
            };
        if !arm {
            return self.suspend(Wait::Input);
        }

        let token = self.timer.arm();
        let delay = self.options.pacing.autoplay_delay(text);
        self.trace(
            DebugCategory::Engine,
            "Armed autoplay timer",
            json!({ "token": token.0, "delayMs": delay.as_millis() as u64 }),
        );
        self.suspend(Wait::Timer { token, delay })
    }

    fn suspend(&mut self, wait: Wait) -> Wait {
        self.state = match wait {
            Wait::Input => PlaybackState::AwaitingInput,
            Wait::Timer { .. } => PlaybackState::AwaitingTimer,
            Wait::Choice => PlaybackState::AwaitingChoice,
            Wait::Ended => PlaybackState::Ended,
        };
        self.wait = wait;
        wait
    }

    fn finish(&mut self, out: &mut Vec<Instruction>) -> Wait {
        self.timer.cancel();
        self.hide_typing_indicator(out);
        out.push(Instruction::SetTitle {
            title: APP_TITLE.to_string(),
        });
        out.push(Instruction::EndStory);

        log::info!("Story finished");
        self.trace(DebugCategory::Engine, "Story ended", Value::Null);
        self.suspend(Wait::Ended)
    }

    fn hide_typing_indicator(&mut self, out: &mut Vec<Instruction>) {
        if std::mem::take(&mut self.typing_indicator) {
            out.push(Instruction::HideTypingIndicator);
        }
    }

    fn commit_unlocks(&mut self, unlocks: &Unlocks) {
        if !self.ledger.commit(unlocks, (self.clock)()) {
            return;
        }

        self.trace(
            DebugCategory::Storage,
            "Saving unlocks",
            json!({ "categories": unlocks.keys().collect::<Vec<_>>() }),
        );
        if let Err(err) = self.persistence.save_unlocks(&self.ledger) {
            log::error!("Failed to persist unlocks: {err}");
            self.trace(
                DebugCategory::Storage,
                "Failed to persist unlocks",
                json!({ "error": err.to_string() }),
            );
        }
    }

    fn trace(&self, category: DebugCategory, message: &str, data: Value) {
        self.sink.record(category, message, &data);
    }
}
