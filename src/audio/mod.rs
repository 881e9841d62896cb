//! Audio input and feedback
//!
//! - `capture`: cpal microphone stream delivering fixed-size frames
//! - `phrase`: bounded command capture with ambient-noise calibration
//! - `chime`: short audible acknowledgment

pub mod capture;
pub mod chime;
pub mod phrase;

use crate::error::OptusResult;
use async_trait::async_trait;

pub use capture::MicrophoneStream;
pub use chime::Chime;
pub use phrase::{PhraseRecorder, PhraseSettings};

/// A continuous source of mono 16-bit PCM samples
#[async_trait]
pub trait AudioSource: Send {
    /// Read exactly `len` samples, blocking until they are available
    async fn read(&mut self, len: usize) -> OptusResult<Vec<i16>>;

    /// Sample rate in Hz
    fn sample_rate(&self) -> u32;

    /// Drop audio buffered while nobody was reading
    fn discard_pending(&mut self) {}

    /// Stop the underlying device
    fn close(&mut self) {}
}

/// Calculate audio energy (RMS) for endpointing
pub fn calculate_energy(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum: i64 = samples.iter().map(|&s| (s as i64).pow(2)).sum();
    (sum as f32 / samples.len() as f32).sqrt()
}
