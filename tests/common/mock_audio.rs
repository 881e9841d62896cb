//! Mock microphone and wake detector

use anyhow::Result;
use async_trait::async_trait;
use optus::audio::AudioSource;
use optus::error::{OptusError, OptusResult};
use optus::wake::WakeDetector;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

pub const MOCK_SAMPLE_RATE: u32 = 1000;
pub const MOCK_FRAME_LENGTH: usize = 10;

/// Constant-amplitude source; the first `failures` reads fail
pub struct MockAudio {
    amplitude: i16,
    failures: usize,
    pub reads: Arc<AtomicUsize>,
    pub discards: Arc<AtomicUsize>,
    pub closed: Arc<AtomicBool>,
}

impl MockAudio {
    pub fn new(amplitude: i16, failures: usize) -> Self {
        Self {
            amplitude,
            failures,
            reads: Arc::new(AtomicUsize::new(0)),
            discards: Arc::new(AtomicUsize::new(0)),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait]
impl AudioSource for MockAudio {
    async fn read(&mut self, len: usize) -> OptusResult<Vec<i16>> {
        // Let other tasks (e.g. an interrupt) run between frames
        tokio::task::yield_now().await;
        self.reads.fetch_add(1, Ordering::SeqCst);

        if self.failures > 0 {
            self.failures -= 1;
            return Err(OptusError::DeviceRead("input overflow".to_string()));
        }
        Ok(vec![self.amplitude; len])
    }

    fn sample_rate(&self) -> u32 {
        MOCK_SAMPLE_RATE
    }

    fn discard_pending(&mut self) {
        self.discards.fetch_add(1, Ordering::SeqCst);
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Fires on each of the first `wakes` frames, then never
pub struct ScriptedWake {
    wakes: usize,
    pub frames: Arc<AtomicUsize>,
    pub released: Arc<AtomicBool>,
}

impl ScriptedWake {
    pub fn new(wakes: usize) -> Self {
        Self {
            wakes,
            frames: Arc::new(AtomicUsize::new(0)),
            released: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl WakeDetector for ScriptedWake {
    fn process(&mut self, frame: &[i16]) -> Result<Option<usize>> {
        assert_eq!(frame.len(), MOCK_FRAME_LENGTH);
        self.frames.fetch_add(1, Ordering::SeqCst);
        if self.wakes > 0 {
            self.wakes -= 1;
            return Ok(Some(0));
        }
        Ok(None)
    }

    fn frame_length(&self) -> usize {
        MOCK_FRAME_LENGTH
    }

    fn sample_rate(&self) -> u32 {
        MOCK_SAMPLE_RATE
    }

    fn reset(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}
