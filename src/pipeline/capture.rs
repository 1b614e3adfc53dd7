//! Capture worker: the producer side of the pipeline.
//!
//! Runs on a dedicated OS thread so a blocking recognizer never stalls the
//! main loop. Each pass makes one `listen` call and routes the result:
//! ordinary utterances go to the command channel, and while output is in
//! flight only stop phrases get through, to the interrupt channel.

use crate::config::{BargeInConfig, ListenConfig};
use crate::pipeline::messages::Utterance;
use crate::pipeline::phrases;
use crate::pipeline::signal::OutputSignal;
use crate::stt::{RecognitionError, SpeechRecognizer};
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Where one listen cycle sent its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// Queued on the command channel.
    Command,
    /// Stop phrase heard during output; interrupt raised.
    Interrupt,
    /// Heard during output but not a stop phrase.
    Ignored,
    /// Nothing recognized this cycle.
    Silence,
    /// Recognizer failed; the worker backs off before listening again.
    Failed,
    /// The main loop dropped its receiving end.
    Closed,
}

pub struct CaptureWorker {
    recognizer: Box<dyn SpeechRecognizer>,
    signal: OutputSignal,
    stop_phrases: Vec<String>,
    listen_timeout: Duration,
    barge_in_timeout: Duration,
    error_backoff: Duration,
    command_tx: mpsc::UnboundedSender<Utterance>,
    interrupt_tx: mpsc::UnboundedSender<Utterance>,
    cancel: CancellationToken,
}

impl CaptureWorker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        recognizer: Box<dyn SpeechRecognizer>,
        signal: OutputSignal,
        listen: &ListenConfig,
        barge_in: &BargeInConfig,
        command_tx: mpsc::UnboundedSender<Utterance>,
        interrupt_tx: mpsc::UnboundedSender<Utterance>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            recognizer,
            signal,
            stop_phrases: barge_in.stop_phrases.clone(),
            listen_timeout: Duration::from_millis(listen.idle_timeout_ms),
            barge_in_timeout: Duration::from_millis(listen.barge_in_timeout_ms),
            error_backoff: Duration::from_millis(listen.error_backoff_ms),
            command_tx,
            interrupt_tx,
            cancel,
        }
    }

    /// Start the worker on its own thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn spawn(self) -> std::io::Result<JoinHandle<()>> {
        std::thread::Builder::new()
            .name("capture".to_owned())
            .spawn(move || self.run())
    }

    /// Listen until cancelled or the main loop stops receiving.
    pub fn run(mut self) {
        info!("capture worker started");
        while !self.cancel.is_cancelled() {
            match self.step() {
                CaptureOutcome::Closed => break,
                CaptureOutcome::Failed => {
                    std::thread::sleep(self.error_backoff);
                }
                _ => {}
            }
        }
        info!("capture worker stopped");
    }

    /// One listen-and-route cycle.
    pub fn step(&mut self) -> CaptureOutcome {
        let timeout = if self.signal.is_speaking() {
            self.barge_in_timeout
        } else {
            self.listen_timeout
        };

        let utterance = match self.recognizer.listen(timeout) {
            Ok(u) => u,
            Err(RecognitionError::NoSpeech) => {
                debug!("no speech this cycle");
                return CaptureOutcome::Silence;
            }
            Err(e @ RecognitionError::Unavailable(_)) => {
                warn!("{e}");
                return CaptureOutcome::Failed;
            }
        };

        // Routing follows the output state at the moment the result arrives,
        // not when listening began.
        if self.signal.is_speaking() {
            if !phrases::matches_any(&utterance.text, &self.stop_phrases) {
                debug!("speaking, ignoring: \"{}\"", utterance.text);
                return CaptureOutcome::Ignored;
            }
            info!("stop phrase heard during output: \"{}\"", utterance.text);
            if self.interrupt_tx.send(utterance).is_err() {
                return CaptureOutcome::Closed;
            }
            self.signal.request_stop();
            return CaptureOutcome::Interrupt;
        }

        debug!("heard: \"{}\"", utterance.text);
        if self.command_tx.send(utterance).is_err() {
            return CaptureOutcome::Closed;
        }
        CaptureOutcome::Command
    }
}
