//! External signals that resume a suspended interpreter

use serde::{Deserialize, Serialize};

/// Opaque handle identifying one armed autoplay timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerToken(pub u64);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// User clicked/tapped/pressed Enter
    Advance,
    /// An autoplay timer fired
    TimerElapsed { token: TimerToken },
    /// User picked the choice at this index
    Choose { index: usize },
}
