//! Mock TTS Engine for Testing
//!
//! Records all spoken text for verification.

use async_trait::async_trait;
use optus::error::{OptusError, OptusResult};
use std::sync::{Arc, Mutex};

/// Mock TTS engine that records spoken text
#[derive(Debug, Default)]
pub struct MockTts {
    /// All text that was "spoken"
    pub spoken: Arc<Mutex<Vec<String>>>,
    /// Simulate failure on every speak
    pub should_fail: Arc<Mutex<bool>>,
}

impl MockTts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all spoken phrases
    pub fn get_spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }

    /// Check if a phrase was spoken
    pub fn was_spoken(&self, text: &str) -> bool {
        self.spoken.lock().unwrap().iter().any(|s| s.contains(text))
    }

    pub fn last_spoken(&self) -> Option<String> {
        self.spoken.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl optus::tts::TtsEngine for MockTts {
    async fn speak(&self, text: &str) -> OptusResult<()> {
        if *self.should_fail.lock().unwrap() {
            return Err(OptusError::Tts("Mock TTS failure".into()));
        }
        self.spoken.lock().unwrap().push(text.to_string());
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
