//! Configuration types for the voice command loop.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VoxConfig {
    /// Conversation session settings (wake phrase / inactivity timeout).
    pub conversation: ConversationConfig,
    /// Capture worker listen timeouts.
    pub listen: ListenConfig,
    /// Barge-in (interrupt) behavior while the assistant is speaking.
    pub barge_in: BargeInConfig,
    /// Conversational completion API settings.
    pub llm: LlmConfig,
    /// Device-control API settings.
    pub device: DeviceConfig,
    /// Text-to-speech settings.
    pub tts: TtsConfig,
}

/// Conversation session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    /// Wake phrase that opens a session (case-insensitive, word-bounded).
    pub wake_phrase: String,
    /// Seconds without user speech (while the assistant is silent) before the
    /// session closes and returns to Idle.
    pub idle_timeout_s: u32,
    /// Maximum number of turns kept in the session history.
    pub max_history_turns: usize,
    /// Number of most recent turns sent to the completion API as context.
    pub context_turns: usize,
    /// Spoken when a session opens.
    pub greeting: String,
    /// Spoken when a session closes through inactivity.
    pub timeout_notice: String,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            wake_phrase: "hello".to_owned(),
            idle_timeout_s: 60,
            max_history_turns: 20,
            context_turns: 5,
            greeting: "Hello! How can I help?".to_owned(),
            timeout_notice: "Going quiet now. Say hello when you need me.".to_owned(),
        }
    }
}

impl ConversationConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.idle_timeout_s))
    }
}

/// Capture worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenConfig {
    /// Listen timeout (ms) when no output is playing.
    pub idle_timeout_ms: u64,
    /// Listen timeout (ms) while output is playing (barge-in detection).
    pub barge_in_timeout_ms: u64,
    /// Upper bound (ms) on how long the main loop waits for an utterance while
    /// the session is idle.
    pub poll_interval_ms: u64,
    /// Pause (ms) after a recognizer service error before listening again.
    pub error_backoff_ms: u64,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            idle_timeout_ms: 10_000,
            barge_in_timeout_ms: 1_000,
            poll_interval_ms: 100,
            error_backoff_ms: 500,
        }
    }
}

/// Barge-in configuration (user interrupts the assistant by speaking).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BargeInConfig {
    /// Phrases that stop output when heard while the assistant is speaking.
    pub stop_phrases: Vec<String>,
}

impl Default for BargeInConfig {
    fn default() -> Self {
        Self {
            stop_phrases: vec!["stop".to_owned(), "enough".to_owned(), "ok".to_owned()],
        }
    }
}

/// OpenAI-compatible completion API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of the API server.
    pub api_url: String,
    /// Model identifier sent with each request.
    pub api_model: String,
    /// Bearer token. Empty means no `Authorization` header.
    pub api_key: String,
    /// Response budget in tokens.
    pub max_tokens: u32,
    /// Optional system prompt prepended to every request.
    pub system_prompt: Option<String>,
    /// Per-request timeout in seconds.
    pub request_timeout_s: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.openai.com".to_owned(),
            api_model: "gpt-3.5-turbo".to_owned(),
            api_key: String::new(),
            max_tokens: 50,
            system_prompt: None,
            request_timeout_s: 20,
        }
    }
}

/// A spoken phrase mapped to a device data-point write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCommandConfig {
    /// Normalized phrase, e.g. "turn on lights".
    pub phrase: String,
    /// Data-point code written on the device, e.g. "switch_led".
    pub code: String,
    /// Value written to the data point.
    pub value: bool,
}

/// Device-control API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Base URL of the regional cloud endpoint.
    pub endpoint: String,
    /// Client (access) id sent as the `client_id` header.
    pub access_id: String,
    /// Access secret. Only used as the HMAC key for request signatures; it
    /// never leaves the process.
    #[serde(alias = "access_key")]
    pub access_secret: String,
    /// Identifier of the controlled device.
    pub device_id: String,
    /// Per-request timeout in seconds.
    pub request_timeout_s: u64,
    /// Known device command phrases.
    pub commands: Vec<DeviceCommandConfig>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://openapi.tuyaus.com".to_owned(),
            access_id: String::new(),
            access_secret: String::new(),
            device_id: String::new(),
            request_timeout_s: 10,
            commands: vec![
                DeviceCommandConfig {
                    phrase: "turn on lights".to_owned(),
                    code: "switch_led".to_owned(),
                    value: true,
                },
                DeviceCommandConfig {
                    phrase: "turn off lights".to_owned(),
                    code: "switch_led".to_owned(),
                    value: false,
                },
            ],
        }
    }
}

/// Text-to-speech configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    /// Speaking rate in words per minute.
    pub words_per_minute: u32,
    /// Output volume, 0.0 to 1.0. Zero renders silently at the same pace.
    pub volume: f32,
    /// Voice name. The console synthesizer shows it in the speaker label;
    /// empty means the plain `[Assistant]` label.
    pub voice: String,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            words_per_minute: 175,
            volume: 0.8,
            voice: "english".to_owned(),
        }
    }
}

impl TtsConfig {
    /// `volume` clamped to `0.0..=1.0`; non-numbers fall back to the default.
    pub fn effective_volume(&self) -> f32 {
        if self.volume.is_nan() {
            return Self::default().volume;
        }
        self.volume.clamp(0.0, 1.0)
    }
}

impl VoxConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::error::SpeechError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = self.to_toml()?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Serialize to pretty TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> crate::error::Result<String> {
        toml::to_string_pretty(self).map_err(|e| crate::error::SpeechError::Config(e.to_string()))
    }

    /// Returns the default config file path: `~/.config/voxloop/config.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config).join("voxloop").join("config.toml")
        } else if let Some(config) = dirs::config_dir() {
            config.join("voxloop").join("config.toml")
        } else {
            PathBuf::from("/tmp/voxloop-config/config.toml")
        }
    }

    /// Override credentials and device settings from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Override credentials and device settings from `lookup`.
    ///
    /// Keys: `OPENAI_API_KEY`, `TUYA_ENDPOINT`, `TUYA_ACCESS_ID`,
    /// `TUYA_ACCESS_KEY`, `TUYA_DEVICE_ID`. Empty values are ignored.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("OPENAI_API_KEY") {
            self.llm.api_key = v;
        }
        if let Some(v) = get("TUYA_ENDPOINT") {
            self.device.endpoint = v;
        }
        if let Some(v) = get("TUYA_ACCESS_ID") {
            self.device.access_id = v;
        }
        if let Some(v) = get("TUYA_ACCESS_KEY") {
            self.device.access_secret = v;
        }
        if let Some(v) = get("TUYA_DEVICE_ID") {
            self.device.device_id = v;
        }
    }
}
