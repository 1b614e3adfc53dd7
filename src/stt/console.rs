//! Line-based recognizer that treats each line of input as one utterance.
//!
//! Stands in for a microphone-backed engine when running in a terminal. A
//! reader thread forwards lines over a bounded channel so `listen` can honor
//! its timeout even though stdin reads block.

use super::{RecognitionError, SpeechRecognizer};
use crate::error::SpeechError;
use crate::pipeline::messages::Utterance;
use crossbeam_channel::{Receiver, RecvTimeoutError, bounded};
use std::io::BufRead;
use std::time::Duration;
use tracing::{debug, warn};

const LINE_CHANNEL_SIZE: usize = 16;

pub struct ConsoleRecognizer {
    lines: Receiver<String>,
}

impl ConsoleRecognizer {
    /// Read utterances from stdin.
    ///
    /// # Errors
    ///
    /// Returns an error if the reader thread cannot be spawned.
    pub fn stdin() -> crate::error::Result<Self> {
        Self::from_reader(std::io::BufReader::new(std::io::stdin()))
    }

    /// Read utterances from any line-oriented reader.
    ///
    /// # Errors
    ///
    /// Returns an error if the reader thread cannot be spawned.
    pub fn from_reader<R: BufRead + Send + 'static>(reader: R) -> crate::error::Result<Self> {
        let (tx, rx) = bounded::<String>(LINE_CHANNEL_SIZE);
        std::thread::Builder::new()
            .name("console-recognizer".to_owned())
            .spawn(move || {
                for line in reader.lines() {
                    match line {
                        Ok(line) => {
                            if tx.send(line).is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            warn!("console read failed: {e}");
                            break;
                        }
                    }
                }
                debug!("console input closed");
            })
            .map_err(|e| SpeechError::Stt(format!("cannot start console reader: {e}")))?;
        Ok(Self { lines: rx })
    }
}

impl SpeechRecognizer for ConsoleRecognizer {
    fn listen(&mut self, timeout: Duration) -> Result<Utterance, RecognitionError> {
        match self.lines.recv_timeout(timeout) {
            Ok(line) => {
                let text = line.trim();
                if text.is_empty() {
                    Err(RecognitionError::NoSpeech)
                } else {
                    Ok(Utterance::new(text))
                }
            }
            Err(RecvTimeoutError::Timeout) => Err(RecognitionError::NoSpeech),
            Err(RecvTimeoutError::Disconnected) => {
                Err(RecognitionError::Unavailable("console input closed".to_owned()))
            }
        }
    }
}
