//! Mock Transcriber for Testing
//!
//! Replays a scripted queue of transcription outcomes.

use async_trait::async_trait;
use optus::asr::Transcriber;
use optus::error::TranscriptionError;
use optus::intent::Utterance;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Transcriber returning predetermined results, then `NoSpeechUnderstood`
pub struct MockTranscriber {
    results: VecDeque<Result<Utterance, TranscriptionError>>,
    /// Number of captures received
    pub calls: Arc<AtomicUsize>,
}

impl MockTranscriber {
    pub fn new(results: Vec<Result<Utterance, TranscriptionError>>) -> Self {
        Self {
            results: results.into(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_phrases(phrases: &[&str]) -> Self {
        Self::new(phrases.iter().map(|p| Ok(Utterance::new(p))).collect())
    }
}

#[async_trait]
impl Transcriber for MockTranscriber {
    async fn transcribe(
        &mut self,
        samples: &[i16],
        _sample_rate: u32,
    ) -> Result<Utterance, TranscriptionError> {
        assert!(!samples.is_empty(), "empty captures must not be transcribed");
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.results
            .pop_front()
            .unwrap_or(Err(TranscriptionError::NoSpeechUnderstood))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
