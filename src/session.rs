//! Playthrough session
//!
//! Ties a loaded story, persisted player state, the interpreter and a
//! presentation together. A session is created per playthrough and
//! discarded when the story ends; only affection and unlocks outlive it.

use crate::loader::{self, DocumentSource, LoadError, LoadedStory, LoaderConfig, StoryKind};
use crate::presentation::{self, Presentation, PresentationError};
use crate::resolve::{AssetResolver, BasicResolver};
use crate::runtime::{
    DebugConfig, DebugSink, Interpreter, InterpreterOptions, LogSink, NoopSink, RuntimeError,
    StepOutcome, Wait,
};
use crate::storage::{AUTOPLAY_PREFERENCE, Persistence, StorageError};
use crate::types::{Event, TimerToken};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// Some instructions could not be rendered. Playback itself moved on
    /// and is now waiting as described by `wait`.
    #[error("{} presentation operation(s) failed", failures.len())]
    Presentation {
        wait: Wait,
        failures: Vec<PresentationError>,
    },
}

impl SessionError {
    /// The wait state to continue from, if playback is still usable
    pub fn wait(&self) -> Option<Wait> {
        match self {
            SessionError::Presentation { wait, .. } => Some(*wait),
            _ => None,
        }
    }
}

pub struct SessionBuilder<P> {
    presentation: P,
    persistence: Box<dyn Persistence>,
    loader: LoaderConfig,
    options: Option<InterpreterOptions>,
    resolver: Box<dyn AssetResolver>,
    sink: Box<dyn DebugSink>,
}

impl<P: Presentation> SessionBuilder<P> {
    pub fn loader_config(mut self, loader: LoaderConfig) -> Self {
        self.loader = loader;
        self
    }

    /// Interpreter options; defaults follow the story kind
    pub fn options(mut self, options: InterpreterOptions) -> Self {
        self.options = Some(options);
        self
    }

    pub fn resolver(mut self, resolver: Box<dyn AssetResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn debug_sink(mut self, sink: Box<dyn DebugSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn debug(self, config: DebugConfig) -> Self {
        self.debug_sink(Box::new(LogSink::new(config)))
    }

    /// Load a story by name and build the session
    pub async fn load(
        self,
        source: &dyn DocumentSource,
        kind: StoryKind,
        name: &str,
    ) -> Result<Session<P>, SessionError> {
        let story = loader::load_story(source, &self.loader, kind, name)
            .await
            .inspect_err(|err| log::error!("Failed to load story '{name}': {err}"))?;
        self.build(story)
    }

    /// Build a session from an already loaded story
    pub fn build(self, story: LoadedStory) -> Result<Session<P>, SessionError> {
        let affection = self.persistence.load_affection()?;
        let ledger = self.persistence.load_unlocks()?;
        let autoplay = self.persistence.preference(AUTOPLAY_PREFERENCE)?;

        let store = story.prepare_store(&affection);
        let options = self.options.unwrap_or_else(|| match story.kind {
            StoryKind::Event => InterpreterOptions::scene(),
            StoryKind::Texting => InterpreterOptions::texting(),
        });

        let interpreter = Interpreter::new(story.document.story.clone(), store, self.persistence)
            .with_options(options)
            .with_ledger(ledger)
            .with_autoplay(autoplay)
            .with_story_name(story.story_name().map(str::to_string))
            .with_resolver(self.resolver)
            .with_debug_sink(self.sink);

        Ok(Session {
            interpreter,
            presentation: self.presentation,
            on_finished: None,
        })
    }
}

pub struct Session<P> {
    interpreter: Interpreter,
    presentation: P,
    on_finished: Option<Box<dyn FnOnce() + Send>>,
}

impl<P: Presentation> Session<P> {
    pub fn builder(presentation: P, persistence: Box<dyn Persistence>) -> SessionBuilder<P> {
        SessionBuilder {
            presentation,
            persistence,
            loader: LoaderConfig::default(),
            options: None,
            resolver: Box::new(BasicResolver::default()),
            sink: Box::new(NoopSink),
        }
    }

    /// Called once when the story reaches its end
    pub fn on_finished(mut self, callback: impl FnOnce() + Send + 'static) -> Self {
        self.on_finished = Some(Box::new(callback));
        self
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    pub fn interpreter_mut(&mut self) -> &mut Interpreter {
        &mut self.interpreter
    }

    pub fn presentation(&self) -> &P {
        &self.presentation
    }

    pub fn presentation_mut(&mut self) -> &mut P {
        &mut self.presentation
    }

    pub fn into_presentation(self) -> P {
        self.presentation
    }

    pub fn start(&mut self) -> Result<Wait, SessionError> {
        let outcome = self.interpreter.start()?;
        self.present(outcome)
    }

    pub fn handle(&mut self, event: Event) -> Result<Wait, SessionError> {
        let outcome = self.interpreter.handle(event)?;
        self.present(outcome)
    }

    pub fn advance(&mut self) -> Result<Wait, SessionError> {
        self.handle(Event::Advance)
    }

    pub fn timer_elapsed(&mut self, token: TimerToken) -> Result<Wait, SessionError> {
        self.handle(Event::TimerElapsed { token })
    }

    pub fn choose(&mut self, index: usize) -> Result<Wait, SessionError> {
        self.handle(Event::Choose { index })
    }

    fn present(&mut self, outcome: StepOutcome) -> Result<Wait, SessionError> {
        let failures = presentation::dispatch(&mut self.presentation, &outcome.instructions);

        if outcome.is_finished() {
            if let Some(callback) = self.on_finished.take() {
                callback();
            }
        }

        if failures.is_empty() {
            Ok(outcome.wait)
        } else {
            Err(SessionError::Presentation {
                wait: outcome.wait,
                failures,
            })
        }
    }
}
