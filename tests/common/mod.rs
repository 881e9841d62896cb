#![allow(dead_code)]

pub mod mock_asr;
pub mod mock_audio;
pub mod mock_registry;
pub mod mock_tts;

use mock_asr::MockTranscriber;
use mock_audio::{MockAudio, ScriptedWake};
use optus::actions::ActionRegistry;
use optus::audio::{PhraseRecorder, PhraseSettings};
use optus::error::TranscriptionError;
use optus::intent::Utterance;
use optus::listening::{CommandCapture, ListeningLoop};
use optus::tts::{Speaker, TtsEngine};
use std::sync::atomic::{AtomicBool, AtomicUsize};
use std::sync::Arc;
use std::time::Duration;

pub use mock_tts::MockTts;

/// Amplitude well above the test energy floor
pub const SPEECH: i16 = 1000;
/// Nothing for the recorder to pick up
pub const SILENCE: i16 = 0;

/// What the simulated user does
pub struct Script {
    pub wakes: usize,
    pub transcripts: Vec<Result<Utterance, TranscriptionError>>,
    pub amplitude: i16,
    pub failing_reads: usize,
}

impl Script {
    /// One wake per phrase, each phrase transcribed successfully
    pub fn saying(phrases: &[&str]) -> Self {
        Self {
            wakes: phrases.len(),
            transcripts: phrases.iter().map(|p| Ok(Utterance::new(p))).collect(),
            amplitude: SPEECH,
            failing_reads: 0,
        }
    }
}

/// Observers kept after the mocks move into the loop
pub struct Handles {
    pub tts: Arc<MockTts>,
    pub reads: Arc<AtomicUsize>,
    pub discards: Arc<AtomicUsize>,
    pub audio_closed: Arc<AtomicBool>,
    pub wake_frames: Arc<AtomicUsize>,
    pub wake_released: Arc<AtomicBool>,
    pub transcriptions: Arc<AtomicUsize>,
}

/// Endpointing tuned for the 1 kHz mock source
pub fn test_phrase_settings() -> PhraseSettings {
    PhraseSettings {
        ambient: Duration::ZERO,
        pause: Duration::from_millis(50),
        start_timeout: Duration::from_millis(100),
        max_phrase: Duration::from_millis(100),
        energy_floor: 100.0,
        energy_ratio: 1.5,
        chunk: 10,
    }
}

pub fn mock_speaker(tts: &Arc<MockTts>) -> Speaker {
    let engine: Arc<dyn TtsEngine> = tts.clone();
    Speaker::new("Optus", Some(engine))
}

/// Assemble a loop around mocks. `registry` receives the same speaker.
pub fn build_loop<F>(script: Script, registry: F) -> (ListeningLoop, Handles)
where
    F: FnOnce(Speaker) -> Box<dyn ActionRegistry>,
{
    let tts = Arc::new(MockTts::new());
    let speaker = mock_speaker(&tts);

    let audio = MockAudio::new(script.amplitude, script.failing_reads);
    let wake = ScriptedWake::new(script.wakes);
    let transcriber = MockTranscriber::new(script.transcripts);

    let handles = Handles {
        tts,
        reads: audio.reads.clone(),
        discards: audio.discards.clone(),
        audio_closed: audio.closed.clone(),
        wake_frames: wake.frames.clone(),
        wake_released: wake.released.clone(),
        transcriptions: transcriber.calls.clone(),
    };

    let capture = CommandCapture::new(
        Box::new(audio),
        PhraseRecorder::new(test_phrase_settings()),
        Box::new(transcriber),
        speaker.clone(),
    );
    let listening = ListeningLoop::new(
        Box::new(wake),
        capture,
        registry(speaker),
        Duration::from_millis(1),
    );

    (listening, handles)
}

/// Observers for a `RecordingRegistry` moved into the loop
pub struct RegistryHandles {
    pub calls: Arc<std::sync::Mutex<Vec<optus::intent::DispatchOutcome>>>,
    pub shutdowns: Arc<AtomicUsize>,
}

impl RegistryHandles {
    pub fn calls(&self) -> Vec<optus::intent::DispatchOutcome> {
        self.calls.lock().unwrap().clone()
    }
}

/// Loop wired to a `RecordingRegistry` with the given behavior
pub fn build_recording_loop(
    script: Script,
    behavior: mock_registry::Behavior,
) -> (ListeningLoop, Handles, RegistryHandles) {
    let registry = mock_registry::RecordingRegistry::new(behavior);
    let registry_handles = RegistryHandles {
        calls: registry.calls.clone(),
        shutdowns: registry.shutdowns.clone(),
    };
    let (listening, handles) =
        build_loop(script, move |_| Box::new(registry) as Box<dyn ActionRegistry>);
    (listening, handles, registry_handles)
}

/// Drive one wake → capture → dispatch cycle
pub async fn wake_and_handle(listening: &mut ListeningLoop) -> optus::listening::LoopState {
    use optus::listening::LoopState;

    assert_eq!(listening.step().await, LoopState::Armed);
    assert_eq!(listening.step().await, LoopState::Capturing);
    listening.step().await
}
