//! Text-to-speech contract consumed by the speech output stage.
//!
//! Rendering is cooperative: the synthesizer calls the progress callback
//! before each word and halts as soon as the callback answers
//! [`RenderControl::Stop`].

mod console;

pub use console::ConsoleSynthesizer;

use crate::error::Result;
use async_trait::async_trait;

/// Answer from a progress callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderControl {
    Continue,
    Stop,
}

/// Per-word progress callback.
pub type Progress<'a> = dyn FnMut(&str) -> RenderControl + Send + 'a;

/// Speech synthesizer with word-level cancellation.
#[async_trait]
pub trait SpeechSynthesizer: Send {
    /// Render `text` as speech.
    ///
    /// `progress` is invoked with each word immediately before it is rendered.
    /// Returns the number of words actually rendered.
    ///
    /// # Errors
    ///
    /// Returns an error if the output device or engine fails.
    async fn render(&mut self, text: &str, progress: &mut Progress<'_>) -> Result<usize>;
}
