//! Error types for the voxloop pipeline.

/// Top-level error type for the voice command loop.
#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    /// Speech-to-text recognizer error.
    #[error("STT error: {0}")]
    Stt(String),

    /// Text-to-speech rendering error.
    #[error("TTS error: {0}")]
    Tts(String),

    /// Conversational completion error.
    #[error("LLM error: {0}")]
    Llm(String),

    /// Device-control API error.
    #[error("device error: {0}")]
    Device(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Pipeline coordination error.
    #[error("pipeline error: {0}")]
    Pipeline(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, SpeechError>;
