//! Speech-to-text contract consumed by the capture worker.
//!
//! The recognizer is blocking: the capture worker owns its own OS thread and
//! calls [`SpeechRecognizer::listen`] in a loop, so implementations are free to
//! block on audio devices or network calls for up to `timeout`.

mod console;

pub use console::ConsoleRecognizer;

use crate::pipeline::messages::Utterance;
use std::time::Duration;

/// Why a listen cycle produced no utterance.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecognitionError {
    /// Nothing intelligible was heard before the timeout.
    #[error("no speech detected")]
    NoSpeech,
    /// The recognition service failed or is unreachable.
    #[error("recognizer unavailable: {0}")]
    Unavailable(String),
}

/// Blocking speech recognizer.
pub trait SpeechRecognizer: Send {
    /// Listen for a single utterance, waiting at most `timeout`.
    ///
    /// # Errors
    ///
    /// [`RecognitionError::NoSpeech`] when nothing was understood,
    /// [`RecognitionError::Unavailable`] when the service failed.
    fn listen(&mut self, timeout: Duration) -> Result<Utterance, RecognitionError>;
}
