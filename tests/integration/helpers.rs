//! Shared helpers for integration tests: scripted collaborators standing in
//! for the microphone, the speaker and the remote services.

use async_trait::async_trait;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use voxloop::config::VoxConfig;
use voxloop::device::{DeviceCommand, DeviceController, DeviceError};
use voxloop::llm::Completion;
use voxloop::pipeline::messages::{Turn, Utterance};
use voxloop::stt::{RecognitionError, SpeechRecognizer};
use voxloop::tts::{Progress, RenderControl, SpeechSynthesizer};

/// Recognizer whose "speech" is pushed through a channel by the test.
pub(crate) struct ScriptedRecognizer {
    lines: Receiver<String>,
}

pub(crate) fn scripted_recognizer() -> (ScriptedRecognizer, Sender<String>) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (ScriptedRecognizer { lines: rx }, tx)
}

impl SpeechRecognizer for ScriptedRecognizer {
    fn listen(&mut self, timeout: Duration) -> Result<Utterance, RecognitionError> {
        match self.lines.recv_timeout(timeout) {
            Ok(line) => Ok(Utterance::new(line)),
            Err(RecvTimeoutError::Timeout) => Err(RecognitionError::NoSpeech),
            Err(RecvTimeoutError::Disconnected) => {
                Err(RecognitionError::Unavailable("script finished".into()))
            }
        }
    }
}

/// One `render` call as seen by the synthesizer.
#[derive(Debug, Clone)]
pub(crate) struct Rendered {
    pub text: String,
    pub words_rendered: usize,
    pub total_words: usize,
}

impl Rendered {
    pub fn was_cut_short(&self) -> bool {
        self.words_rendered < self.total_words
    }
}

pub(crate) type SpeechLog = Arc<Mutex<Vec<Rendered>>>;

/// Says `phrase` into the recognizer feed once a long reply is underway.
struct BargeIn {
    feed: Sender<String>,
    phrase: String,
    min_words: usize,
    after_words: usize,
}

/// Synthesizer that logs what it renders, optionally in real time.
pub(crate) struct RecordingSynth {
    log: SpeechLog,
    word_delay: Duration,
    barge_in: Option<BargeIn>,
}

impl RecordingSynth {
    pub fn new() -> (Self, SpeechLog) {
        let log = SpeechLog::default();
        let synth = Self {
            log: Arc::clone(&log),
            word_delay: Duration::ZERO,
            barge_in: None,
        };
        (synth, log)
    }

    pub fn with_word_delay(mut self, delay: Duration) -> Self {
        self.word_delay = delay;
        self
    }

    /// While rendering any text of at least `min_words`, push `phrase` into
    /// `feed` after `after_words` words.
    pub fn with_barge_in(
        mut self,
        feed: Sender<String>,
        phrase: &str,
        min_words: usize,
        after_words: usize,
    ) -> Self {
        self.barge_in = Some(BargeIn {
            feed,
            phrase: phrase.to_owned(),
            min_words,
            after_words,
        });
        self
    }
}

#[async_trait]
impl SpeechSynthesizer for RecordingSynth {
    async fn render(
        &mut self,
        text: &str,
        progress: &mut Progress<'_>,
    ) -> voxloop::Result<usize> {
        let words: Vec<&str> = text.split_whitespace().collect();
        let mut rendered = 0;
        for (i, word) in words.iter().enumerate() {
            if let Some(b) = &self.barge_in {
                if words.len() >= b.min_words && i == b.after_words {
                    let _ = b.feed.send(b.phrase.clone());
                }
            }
            if progress(*word) == RenderControl::Stop {
                break;
            }
            rendered += 1;
            if !self.word_delay.is_zero() {
                tokio::time::sleep(self.word_delay).await;
            }
        }
        self.log.lock().unwrap().push(Rendered {
            text: text.to_owned(),
            words_rendered: rendered,
            total_words: words.len(),
        });
        Ok(rendered)
    }
}

pub(crate) fn spoken_texts(log: &SpeechLog) -> Vec<String> {
    log.lock().unwrap().iter().map(|r| r.text.clone()).collect()
}

/// Completion that always answers `reply` and records each context.
pub(crate) struct CannedCompletion {
    reply: String,
    pub requests: Mutex<Vec<Vec<Turn>>>,
}

impl CannedCompletion {
    pub fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_owned(),
            requests: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl Completion for CannedCompletion {
    async fn complete(&self, context: &[Turn], _max_tokens: u32) -> voxloop::Result<String> {
        self.requests.lock().unwrap().push(context.to_vec());
        Ok(self.reply.clone())
    }
}

/// Device that always succeeds and counts calls.
#[derive(Default)]
pub(crate) struct CountingDevice {
    pub calls: Mutex<Vec<(String, DeviceCommand)>>,
}

#[async_trait]
impl DeviceController for CountingDevice {
    async fn execute(&self, device_id: &str, command: &DeviceCommand) -> Result<(), DeviceError> {
        self.calls
            .lock()
            .unwrap()
            .push((device_id.to_owned(), command.clone()));
        Ok(())
    }
}

/// Defaults with a known device id and short listen timeouts so capture
/// threads notice cancellation quickly.
pub(crate) fn test_config() -> VoxConfig {
    let mut config = VoxConfig::default();
    config.device.device_id = "dev-1".to_owned();
    config.listen.idle_timeout_ms = 50;
    config.listen.barge_in_timeout_ms = 50;
    config.listen.error_backoff_ms = 10;
    config
}

/// Poll `condition` every 10ms for up to five seconds of wall time.
pub(crate) async fn wait_until(condition: impl Fn() -> bool) -> bool {
    for _ in 0..500 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
