//! Offline transcription using Vosk

use super::{to_utterance, Transcriber, MIN_CONFIDENCE};
use crate::config::Config;
use crate::error::{OptusError, OptusResult, TranscriptionError};
use crate::intent::Utterance;
use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, info};
use vosk::{Model, Recognizer};

/// Vosk-based transcriber with an open vocabulary
pub struct VoskTranscriber {
    recognizer: Recognizer,
    sample_rate: u32,
}

impl VoskTranscriber {
    /// Open-vocabulary recognizer over an already loaded model
    pub fn new(config: &Config, model: &Model) -> OptusResult<Self> {
        let mut recognizer = Recognizer::new(model, config.sample_rate as f32).ok_or_else(|| {
            OptusError::Initialization("Failed to create Vosk recognizer".to_string())
        })?;
        recognizer.set_words(true);

        Ok(Self {
            recognizer,
            sample_rate: config.sample_rate,
        })
    }
}

/// Load the Vosk model shared by the wake detector and the transcriber.
/// Recognizers keep their own reference, so the model may be dropped after.
pub fn load_model(path: &str) -> OptusResult<Model> {
    if !Path::new(path).exists() {
        return Err(OptusError::Initialization(format!(
            "Vosk model not found at {}",
            path
        )));
    }

    info!("Loading Vosk model from: {}", path);
    Model::new(path).ok_or_else(|| {
        OptusError::Initialization(format!("Failed to load Vosk model at {}", path))
    })
}

#[async_trait]
impl Transcriber for VoskTranscriber {
    async fn transcribe(
        &mut self,
        samples: &[i16],
        sample_rate: u32,
    ) -> Result<Utterance, TranscriptionError> {
        if samples.is_empty() {
            return Err(TranscriptionError::NoSpeechUnderstood);
        }
        if sample_rate != self.sample_rate {
            return Err(TranscriptionError::ServiceUnavailable(format!(
                "recognizer expects {} Hz, got {} Hz",
                self.sample_rate, sample_rate
            )));
        }

        self.recognizer.reset();
        if let vosk::DecodingState::Failed = self.recognizer.accept_waveform(samples) {
            return Err(TranscriptionError::ServiceUnavailable(
                "Vosk decoding failed".to_string(),
            ));
        }

        let result = self.recognizer.final_result();
        let single = result
            .single()
            .ok_or(TranscriptionError::NoSpeechUnderstood)?;

        let text = extract_text(single.text).ok_or(TranscriptionError::NoSpeechUnderstood)?;

        let confidence = average_confidence(single.result.iter().map(|w| w.conf));
        if confidence < MIN_CONFIDENCE {
            info!(
                "🔇 Rejecting low-confidence ASR ({:.2}): '{}'",
                confidence, text
            );
            return Err(TranscriptionError::NoSpeechUnderstood);
        }

        debug!("Vosk transcript ({:.2}): '{}'", confidence, text);
        to_utterance(&text)
    }

    fn name(&self) -> &str {
        "vosk"
    }
}

/// Extract text from Vosk result, filtering empty results
fn extract_text(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Average word confidence; 1.0 when there is no word-level info
fn average_confidence<I: Iterator<Item = f32>>(confidences: I) -> f32 {
    let (sum, count) = confidences.fold((0.0f32, 0usize), |(s, c), conf| (s + conf, c + 1));
    if count == 0 {
        1.0
    } else {
        sum / count as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_text() {
        assert_eq!(extract_text(""), None);
        assert_eq!(extract_text("  "), None);
        assert_eq!(extract_text("hello"), Some("hello".to_string()));
        assert_eq!(extract_text("  hello  "), Some("hello".to_string()));
    }

    #[test]
    fn test_missing_model_is_initialization_failure() {
        let err = load_model("/nonexistent/vosk/model").err().expect("should fail");
        assert!(matches!(err, OptusError::Initialization(_)));
        assert!(err.to_string().contains("Vosk model not found"));
    }

    #[test]
    fn test_average_confidence() {
        assert_eq!(average_confidence(std::iter::empty()), 1.0);
        assert_eq!(average_confidence([0.5, 1.0].into_iter()), 0.75);
    }
}
