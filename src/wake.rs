//! Wake phrase detection
//!
//! The detector is fed every captured frame in order and keeps its own rolling
//! window of audio. Vosk is used as a keyword spotter by restricting its
//! grammar to the wake phrase plus the unknown-word token.

use crate::config::Config;
use crate::error::{OptusError, OptusResult};
use anyhow::Result;
use tracing::{debug, info, warn};
use vosk::{Model, Recognizer};

/// Per-frame wake phrase detector
pub trait WakeDetector: Send {
    /// Feed one frame. Returns the keyword index when the wake phrase
    /// completes in the trailing window.
    fn process(&mut self, frame: &[i16]) -> Result<Option<usize>>;

    /// Number of samples expected per frame
    fn frame_length(&self) -> usize;

    /// Sample rate the detector was built for
    fn sample_rate(&self) -> u32;

    /// Forget the rolling window
    fn reset(&mut self) {}
}

/// Wake detector backed by a grammar-restricted Vosk recognizer
pub struct VoskWakeDetector {
    recognizer: Recognizer,
    phrase: String,
    frame_length: usize,
    sample_rate: u32,
}

impl VoskWakeDetector {
    pub fn new(config: &Config, model: &Model) -> OptusResult<Self> {
        let phrase = wake_phrase(config)?;

        let grammar = vec![phrase.clone(), "[unk]".to_string()];
        let recognizer = Recognizer::new_with_grammar(model, config.sample_rate as f32, &grammar)
            .ok_or_else(|| {
                OptusError::Initialization("Failed to create wake word recognizer".to_string())
            })?;

        info!("👂 Wake phrase '{}' armed", phrase);

        Ok(Self {
            recognizer,
            phrase,
            frame_length: config.frame_length,
            sample_rate: config.sample_rate,
        })
    }
}

impl WakeDetector for VoskWakeDetector {
    fn process(&mut self, frame: &[i16]) -> Result<Option<usize>> {
        if frame.len() != self.frame_length {
            warn!(
                "Wake frame has {} samples, expected {}",
                frame.len(),
                self.frame_length
            );
        }

        let hypothesis = match self.recognizer.accept_waveform(frame) {
            vosk::DecodingState::Finalized => self
                .recognizer
                .final_result()
                .single()
                .map(|single| single.text.to_string()),
            vosk::DecodingState::Running => {
                Some(self.recognizer.partial_result().partial.to_string())
            }
            vosk::DecodingState::Failed => {
                debug!("Wake decoding failed for this frame");
                None
            }
        };

        match hypothesis {
            Some(text) if contains_phrase(&text, &self.phrase) => {
                debug!("Wake hypothesis: '{}'", text);
                self.recognizer.reset();
                Ok(Some(0))
            }
            _ => Ok(None),
        }
    }

    fn frame_length(&self) -> usize {
        self.frame_length
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn reset(&mut self) {
        self.recognizer.reset();
    }
}

impl Drop for VoskWakeDetector {
    fn drop(&mut self) {
        debug!("Wake detector released");
    }
}

fn wake_phrase(config: &Config) -> OptusResult<String> {
    let phrase = normalize_phrase(&config.wake_word);
    if phrase.is_empty() {
        return Err(OptusError::Initialization(
            "Wake word must not be empty".to_string(),
        ));
    }
    Ok(phrase)
}

fn normalize_phrase(phrase: &str) -> String {
    phrase
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Whole-word containment so "hey optus" does not fire on "they optus"
fn contains_phrase(hypothesis: &str, phrase: &str) -> bool {
    let words: Vec<&str> = hypothesis.split_whitespace().collect();
    let target: Vec<&str> = phrase.split_whitespace().collect();
    !target.is_empty() && words.windows(target.len()).any(|w| w == target.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_phrase() {
        assert!(contains_phrase("hey optus", "hey optus"));
        assert!(contains_phrase("[unk] hey optus [unk]", "hey optus"));
        assert!(!contains_phrase("they optus", "hey optus"));
        assert!(!contains_phrase("hey", "hey optus"));
        assert!(!contains_phrase("", "hey optus"));
    }

    #[test]
    fn test_normalize_phrase() {
        assert_eq!(normalize_phrase("  Hey   Optus "), "hey optus");
        assert_eq!(normalize_phrase(""), "");
    }

    #[test]
    fn test_blank_wake_word_is_initialization_failure() {
        let config = Config {
            wake_word: "   ".to_string(),
            ..Config::default()
        };
        let err = wake_phrase(&config).unwrap_err();
        assert!(matches!(err, OptusError::Initialization(_)));

        let config = Config {
            wake_word: "Hey  Optus".to_string(),
            ..Config::default()
        };
        assert_eq!(wake_phrase(&config).unwrap(), "hey optus");
    }
}
