//! Autoplay pacing
//!
//! The delay before an automatic advance depends only on the dialogue
//! length. The timer itself lives in the host; the interpreter hands out a
//! token per arming and ignores any token that is no longer current, so a
//! timer and a manual advance can never both resume the same wait.

use crate::types::TimerToken;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PacingConfig {
    pub per_character_ms: u64,
    pub floor_ms: u64,
}

impl PacingConfig {
    pub const fn scene() -> Self {
        Self {
            per_character_ms: 85,
            floor_ms: 1000,
        }
    }

    pub const fn texting() -> Self {
        Self {
            per_character_ms: 70,
            floor_ms: 1000,
        }
    }

    /// `max(chars × per_character_ms, floor_ms)`
    pub fn autoplay_delay(&self, text: &str) -> Duration {
        let chars = text.chars().count() as u64;
        Duration::from_millis(
            chars
                .saturating_mul(self.per_character_ms)
                .max(self.floor_ms),
        )
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self::scene()
    }
}

/// Guard for the single outstanding autoplay timer
#[derive(Debug, Clone, Default)]
pub struct AutoplayTimer {
    generation: u64,
    armed: Option<TimerToken>,
}

impl AutoplayTimer {
    /// Arm a new timer, invalidating any previous token
    pub fn arm(&mut self) -> TimerToken {
        self.generation += 1;
        let token = TimerToken(self.generation);
        self.armed = Some(token);
        token
    }

    pub fn cancel(&mut self) -> Option<TimerToken> {
        self.armed.take()
    }

    /// Consume the armed timer if `token` is the current one
    pub fn fire(&mut self, token: TimerToken) -> bool {
        if self.armed == Some(token) {
            self.armed = None;
            true
        } else {
            false
        }
    }

    pub fn armed(&self) -> Option<TimerToken> {
        self.armed
    }
}
