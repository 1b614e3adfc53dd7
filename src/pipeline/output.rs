//! Speech output stage: renders replies and honors barge-in.

use crate::pipeline::signal::OutputSignal;
use crate::tts::{RenderControl, SpeechSynthesizer};
use tracing::{debug, error, info};

/// Result of one `speak` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeechOutcome {
    /// A stop was requested while the text was being rendered.
    pub interrupted: bool,
    /// Words rendered before completion or cancellation.
    pub words_rendered: usize,
}

/// Serializes speech output and polls the shared [`OutputSignal`] per word.
///
/// The main loop is the only caller, so at most one `speak` is in flight.
pub struct SpeechOutput {
    synth: Box<dyn SpeechSynthesizer>,
    signal: OutputSignal,
}

impl SpeechOutput {
    pub fn new(synth: Box<dyn SpeechSynthesizer>, signal: OutputSignal) -> Self {
        Self { synth, signal }
    }

    /// Speak `text`, returning early if a stop is requested.
    ///
    /// The signal is cleared before returning, whether the text completed,
    /// was cancelled, or the synthesizer failed.
    pub async fn speak(&mut self, text: &str) -> SpeechOutcome {
        self.signal.begin();

        let signal = self.signal.clone();
        let mut progress = move |_word: &str| {
            if signal.stop_requested() {
                RenderControl::Stop
            } else {
                RenderControl::Continue
            }
        };

        let rendered = self.synth.render(text, &mut progress).await;
        let interrupted = self.signal.finish();

        let words_rendered = match rendered {
            Ok(n) => n,
            Err(e) => {
                error!("TTS error: {e}");
                0
            }
        };

        if interrupted {
            info!("speech interrupted after {words_rendered} words");
        } else {
            debug!("speech finished ({words_rendered} words)");
        }

        SpeechOutcome {
            interrupted,
            words_rendered,
        }
    }
}
