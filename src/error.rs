//! Optus Error Types
//!
//! Centralized error taxonomy. Only `Initialization` is allowed to end the
//! process; everything else is handled at the listening loop boundary.

use thiserror::Error;

/// Failure outcomes of one transcription attempt
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranscriptionError {
    #[error("no speech understood")]
    NoSpeechUnderstood,

    #[error("speech service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Central error type for Optus
#[derive(Error, Debug)]
pub enum OptusError {
    #[error("Initialization failed: {0}")]
    Initialization(String),

    #[error("Audio device read failed: {0}")]
    DeviceRead(String),

    #[error("Transcription failed: {0}")]
    Transcription(#[from] TranscriptionError),

    #[error("Action failed: {0}")]
    Action(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TTS engine error: {0}")]
    Tts(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type alias for Optus operations
pub type OptusResult<T> = Result<T, OptusError>;
