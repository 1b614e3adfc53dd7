//! Terminal synthesizer: writes words at a speaking pace.
//!
//! At volume zero nothing is printed, but words are still paced and reported
//! so barge-in behaves the same.

use super::{Progress, RenderControl, SpeechSynthesizer};
use crate::config::TtsConfig;
use crate::error::{Result, SpeechError};
use async_trait::async_trait;
use std::io::Write;
use std::time::Duration;

pub struct ConsoleSynthesizer {
    out: Box<dyn Write + Send>,
    word_delay: Duration,
    label: String,
    muted: bool,
}

impl ConsoleSynthesizer {
    /// Speak to stdout at the configured words-per-minute rate.
    pub fn stdout(config: &TtsConfig) -> Self {
        Self::new(Box::new(std::io::stdout()), config)
    }

    pub fn new(out: Box<dyn Write + Send>, config: &TtsConfig) -> Self {
        let wpm = config.words_per_minute.max(1);
        let voice = config.voice.trim();
        let label = if voice.is_empty() {
            "[Assistant]".to_owned()
        } else {
            format!("[Assistant ({voice})]")
        };
        Self {
            out,
            word_delay: Duration::from_millis(60_000 / u64::from(wpm)),
            label,
            muted: config.effective_volume() <= 0.0,
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for ConsoleSynthesizer {
    async fn render(&mut self, text: &str, progress: &mut Progress<'_>) -> Result<usize> {
        self.write_words(text, progress)
            .await
            .map_err(|e| SpeechError::Tts(format!("console output failed: {e}")))
    }
}

impl ConsoleSynthesizer {
    async fn write_words(
        &mut self,
        text: &str,
        progress: &mut Progress<'_>,
    ) -> std::io::Result<usize> {
        let mut rendered = 0;
        if !self.muted {
            write!(self.out, "{}", self.label)?;
        }
        for word in text.split_whitespace() {
            if progress(word) == RenderControl::Stop {
                if !self.muted {
                    write!(self.out, " …")?;
                }
                break;
            }
            if !self.muted {
                write!(self.out, " {word}")?;
                self.out.flush()?;
            }
            rendered += 1;
            tokio::time::sleep(self.word_delay).await;
        }
        if !self.muted {
            writeln!(self.out)?;
            self.out.flush()?;
        }
        Ok(rendered)
    }
}
