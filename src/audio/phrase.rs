//! Bounded command capture
//!
//! Calibrates an energy threshold against ambient noise, waits for speech to
//! start, then records until a pause. Every limit is counted in samples so a
//! capture never depends on wall-clock timing.

use super::{calculate_energy, AudioSource};
use crate::config::Config;
use crate::error::OptusResult;
use std::time::Duration;
use tracing::debug;

/// Endpointing limits for one command capture
#[derive(Debug, Clone)]
pub struct PhraseSettings {
    /// Audio sampled before listening to estimate background noise
    pub ambient: Duration,
    /// Trailing silence that ends a phrase
    pub pause: Duration,
    /// How long to wait for speech to begin
    pub start_timeout: Duration,
    /// Hard cap on phrase length
    pub max_phrase: Duration,
    /// Minimum energy counted as speech
    pub energy_floor: f32,
    /// Multiplier applied to the ambient energy
    pub energy_ratio: f32,
    /// Samples read per step
    pub chunk: usize,
}

impl PhraseSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            ambient: Duration::from_millis(config.ambient_duration_ms),
            pause: Duration::from_millis(config.pause_threshold_ms),
            start_timeout: Duration::from_millis(config.phrase_start_timeout_ms),
            max_phrase: Duration::from_millis(config.max_phrase_ms),
            energy_floor: config.energy_floor,
            energy_ratio: config.energy_ratio,
            chunk: config.frame_length,
        }
    }
}

impl Default for PhraseSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Records one spoken phrase from an `AudioSource`
#[derive(Debug, Clone, Default)]
pub struct PhraseRecorder {
    settings: PhraseSettings,
}

impl PhraseRecorder {
    pub fn new(settings: PhraseSettings) -> Self {
        Self { settings }
    }

    /// Capture one phrase. Returns an empty buffer when nobody spoke.
    pub async fn record(&self, source: &mut dyn AudioSource) -> OptusResult<Vec<i16>> {
        let rate = source.sample_rate();
        let chunk = self.settings.chunk.max(1);

        let threshold = self.calibrate(source, rate).await?;
        debug!("Energy threshold: {:.1}", threshold);

        let start_limit = samples_for(self.settings.start_timeout, rate);
        let mut waited = 0usize;
        let mut phrase = loop {
            let samples = source.read(chunk).await?;
            if calculate_energy(&samples) > threshold {
                break samples;
            }
            waited += samples.len();
            if waited >= start_limit {
                debug!("No speech within {:?}", self.settings.start_timeout);
                return Ok(Vec::new());
            }
        };

        let pause_limit = samples_for(self.settings.pause, rate);
        let max_len = samples_for(self.settings.max_phrase, rate);
        let mut silent = 0usize;

        while phrase.len() < max_len {
            let samples = source.read(chunk).await?;
            if calculate_energy(&samples) > threshold {
                silent = 0;
            } else {
                silent += samples.len();
            }
            phrase.extend_from_slice(&samples);
            if silent >= pause_limit {
                break;
            }
        }

        debug!(
            "Captured {} samples ({:.2}s)",
            phrase.len(),
            phrase.len() as f32 / rate.max(1) as f32
        );
        Ok(phrase)
    }

    async fn calibrate(&self, source: &mut dyn AudioSource, rate: u32) -> OptusResult<f32> {
        let ambient_len = samples_for(self.settings.ambient, rate);
        if ambient_len == 0 {
            return Ok(self.settings.energy_floor);
        }

        let ambient = source.read(ambient_len).await?;
        let ambient_energy = calculate_energy(&ambient);
        Ok((ambient_energy * self.settings.energy_ratio).max(self.settings.energy_floor))
    }
}

fn samples_for(duration: Duration, rate: u32) -> usize {
    (duration.as_millis() as u64 * rate as u64 / 1000) as usize
}
