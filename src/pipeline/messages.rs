//! Message types passed between pipeline stages.

use tokio::time::Instant;

/// One recognized unit of speech input.
#[derive(Debug, Clone)]
pub struct Utterance {
    /// The recognized text.
    pub text: String,
    /// When the recognizer produced this utterance.
    pub captured_at: Instant,
}

impl Utterance {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            captured_at: Instant::now(),
        }
    }
}

/// Who spoke a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Assistant,
}

impl Speaker {
    /// Chat-completions role name.
    pub fn role(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single entry in the session history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
    /// True when the assistant's reply was cut short by barge-in.
    pub interrupted: bool,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
            interrupted: false,
        }
    }

    pub fn assistant(text: impl Into<String>, interrupted: bool) -> Self {
        Self {
            speaker: Speaker::Assistant,
            text: text.into(),
            interrupted,
        }
    }
}
