//! ASR (Automatic Speech Recognition) Module
//!
//! Turns one bounded capture into an `Utterance`. Backends:
//! - Vosk: Local offline recognition
//! - Wyoming: Remote ASR protocol (e.g., faster-whisper)

pub mod vosk;
pub mod wyoming;

use crate::config::Config;
use crate::error::{OptusResult, TranscriptionError};
use crate::intent::Utterance;
use async_trait::async_trait;
use tracing::{info, warn};

pub use self::vosk::{load_model, VoskTranscriber};
pub use self::wyoming::WyomingTranscriber;

/// Minimum average word confidence (below this, results are discarded)
pub const MIN_CONFIDENCE: f32 = 0.5;

/// Speech-to-text for a complete capture
#[async_trait]
pub trait Transcriber: Send {
    /// Transcribe mono 16-bit samples. Never returns an empty utterance:
    /// silence and unintelligible audio map to `NoSpeechUnderstood`.
    async fn transcribe(
        &mut self,
        samples: &[i16],
        sample_rate: u32,
    ) -> Result<Utterance, TranscriptionError>;

    /// Backend name for logs
    fn name(&self) -> &str;
}

/// Wrap raw recognizer text, rejecting empty results
pub fn to_utterance(text: &str) -> Result<Utterance, TranscriptionError> {
    let utterance = Utterance::new(text);
    if utterance.is_empty() {
        Err(TranscriptionError::NoSpeechUnderstood)
    } else {
        Ok(utterance)
    }
}

/// Factory to create the configured transcriber
pub fn create_transcriber(
    config: &Config,
    model: &::vosk::Model,
) -> OptusResult<Box<dyn Transcriber>> {
    let transcriber: Box<dyn Transcriber> = match config.asr_engine.as_str() {
        "vosk" => Box::new(VoskTranscriber::new(config, model)?),
        "wyoming" => Box::new(WyomingTranscriber::new(
            &config.wyoming_host,
            config.wyoming_port,
            config.request_timeout(),
        )),
        other => {
            warn!("Unknown ASR engine '{}', falling back to Vosk", other);
            Box::new(VoskTranscriber::new(config, model)?)
        }
    };
    info!("✅ ASR engine '{}' initialized", transcriber.name());
    Ok(transcriber)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_utterance() {
        assert_eq!(
            to_utterance("  "),
            Err(TranscriptionError::NoSpeechUnderstood)
        );
        assert_eq!(
            to_utterance(" Tell Me A Joke ").unwrap().as_str(),
            "tell me a joke"
        );
    }
}
