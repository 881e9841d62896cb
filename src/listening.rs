//! Listening Loop
//!
//! The process-wide control loop. It owns the audio stream, feeds every frame
//! to the wake detector, captures and transcribes one command per wake, and
//! hands the matched intent to the action registry.
//!
//! ```text
//! Idle --wake--> Armed --> Capturing --done--> Idle
//!                              \--exit--> Shutdown
//! ```
//!
//! Each iteration runs to completion before the next one starts. Failures
//! below initialization are answered at the iteration boundary and never end
//! the loop.

use crate::actions::ActionRegistry;
use crate::asr::Transcriber;
use crate::audio::{AudioSource, Chime, PhraseRecorder};
use crate::error::{OptusError, OptusResult, TranscriptionError};
use crate::intent::{is_cancellation, DispatchOutcome, Intent, IntentMatcher, Utterance};
use crate::tts::Speaker;
use crate::wake::WakeDetector;
use async_trait::async_trait;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

pub const WAKE_ACK: &str = "Yes?";
pub const NO_SPEECH_APOLOGY: &str = "Sorry, I didn't catch that.";
pub const SERVICE_DOWN_APOLOGY: &str = "Sorry, my speech service is down.";
pub const CANCEL_ACK: &str = "Okay, I'll wait.";
pub const ACTION_APOLOGY: &str = "Sorry, something went wrong with that request.";
pub const FAREWELL: &str = "Goodbye!";

/// Loop states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Waiting for the wake phrase
    Idle,
    /// Wake phrase heard, command capture is next
    Armed,
    /// Capturing, transcribing and dispatching one command
    Capturing,
    /// Exit requested; no further iterations
    Shutdown,
}

/// What an action may do with the user: talk and listen again
#[async_trait]
pub trait Session: Send {
    /// Speak through the shared speak channel
    async fn say(&mut self, text: &str);

    /// Capture and transcribe one more phrase
    async fn listen(&mut self) -> OptusResult<Utterance>;
}

/// Sentence spoken when a capture fails
pub fn apology_for(error: &OptusError) -> &'static str {
    match error {
        OptusError::Transcription(TranscriptionError::ServiceUnavailable(_)) => {
            SERVICE_DOWN_APOLOGY
        }
        _ => NO_SPEECH_APOLOGY,
    }
}

/// Microphone, recorder, transcriber and speaker bundled for command capture
pub struct CommandCapture {
    audio: Box<dyn AudioSource>,
    recorder: PhraseRecorder,
    transcriber: Box<dyn Transcriber>,
    speaker: Speaker,
}

impl CommandCapture {
    pub fn new(
        audio: Box<dyn AudioSource>,
        recorder: PhraseRecorder,
        transcriber: Box<dyn Transcriber>,
        speaker: Speaker,
    ) -> Self {
        Self {
            audio,
            recorder,
            transcriber,
            speaker,
        }
    }

    pub fn speaker(&self) -> &Speaker {
        &self.speaker
    }

    /// Read one fixed-size frame for the wake detector
    pub async fn read_frame(&mut self, len: usize) -> OptusResult<Vec<i16>> {
        self.audio.read(len).await
    }

    /// Drop audio queued while nobody was reading (our own speech, slow actions)
    pub fn discard_pending(&mut self) {
        self.audio.discard_pending();
    }

    pub fn close(&mut self) {
        self.audio.close();
    }
}

#[async_trait]
impl Session for CommandCapture {
    async fn say(&mut self, text: &str) {
        self.speaker.speak(text).await;
    }

    async fn listen(&mut self) -> OptusResult<Utterance> {
        // Frames queued while we were speaking would otherwise be heard as speech
        self.audio.discard_pending();
        info!("🎤 Listening...");

        let samples = self.recorder.record(self.audio.as_mut()).await?;
        if samples.is_empty() {
            return Err(TranscriptionError::NoSpeechUnderstood.into());
        }

        debug!("Recognizing with {}...", self.transcriber.name());
        let rate = self.audio.sample_rate();
        let utterance = self.transcriber.transcribe(&samples, rate).await?;
        info!("📝 Heard: '{}'", utterance);
        Ok(utterance)
    }
}

/// The wake → capture → dispatch state machine
pub struct ListeningLoop {
    wake: Option<Box<dyn WakeDetector>>,
    capture: CommandCapture,
    registry: Box<dyn ActionRegistry>,
    matcher: IntentMatcher,
    chime: Option<Chime>,
    error_delay: Duration,
    state: LoopState,
}

impl ListeningLoop {
    pub fn new(
        wake: Box<dyn WakeDetector>,
        capture: CommandCapture,
        registry: Box<dyn ActionRegistry>,
        error_delay: Duration,
    ) -> Self {
        Self {
            wake: Some(wake),
            capture,
            registry,
            matcher: IntentMatcher::new(),
            chime: None,
            error_delay,
            state: LoopState::Idle,
        }
    }

    /// Play a tone before "Yes?" on wake
    pub fn with_chime(mut self, chime: Chime) -> Self {
        self.chime = Some(chime);
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Run until the exit intent or until `shutdown` flips to true.
    /// A dropped sender counts as an interrupt. An interrupt cancels the
    /// iteration in progress, then the shutdown sequence runs.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> OptusResult<()> {
        info!("👂 Listening loop started");
        self.capture.discard_pending();

        while self.state != LoopState::Shutdown {
            if *shutdown.borrow() {
                info!("🛑 Interrupt received");
                break;
            }

            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("🛑 Interrupt received");
                        break;
                    }
                }
                _ = self.step() => {}
            }
        }

        self.shutdown().await;
        Ok(())
    }

    /// Advance the state machine by one transition
    pub async fn step(&mut self) -> LoopState {
        self.state = match self.state {
            LoopState::Idle => self.wait_for_wake().await,
            LoopState::Armed => LoopState::Capturing,
            LoopState::Capturing => {
                let next = self.handle_command().await;
                if next == LoopState::Idle {
                    // Only frames heard after the reply may wake us again
                    self.capture.discard_pending();
                }
                next
            }
            LoopState::Shutdown => LoopState::Shutdown,
        };
        self.state
    }

    async fn wait_for_wake(&mut self) -> LoopState {
        let Some(wake) = self.wake.as_mut() else {
            return LoopState::Shutdown;
        };

        let frame = match self.capture.read_frame(wake.frame_length()).await {
            Ok(frame) => frame,
            Err(e) => {
                warn!("⚠️ Audio read failed: {}. Retrying in {:?}", e, self.error_delay);
                tokio::time::sleep(self.error_delay).await;
                return LoopState::Idle;
            }
        };

        match wake.process(&frame) {
            Ok(Some(index)) => {
                info!("🔔 Wake phrase detected (keyword {})", index);
                if let Some(ref chime) = self.chime {
                    chime.acknowledge().await;
                }
                self.capture.say(WAKE_ACK).await;
                LoopState::Armed
            }
            Ok(None) => LoopState::Idle,
            Err(e) => {
                warn!("⚠️ Wake detector error: {}", e);
                LoopState::Idle
            }
        }
    }

    async fn handle_command(&mut self) -> LoopState {
        let utterance = match self.capture.listen().await {
            Ok(utterance) => utterance,
            Err(e @ OptusError::Transcription(_)) => {
                debug!("{}", e);
                self.capture.say(apology_for(&e)).await;
                return LoopState::Idle;
            }
            Err(e) => {
                warn!("⚠️ Command capture failed: {}", e);
                tokio::time::sleep(self.error_delay).await;
                return LoopState::Idle;
            }
        };

        if utterance.is_empty() {
            return LoopState::Idle;
        }

        if is_cancellation(&utterance) {
            self.capture.say(CANCEL_ACK).await;
            return LoopState::Idle;
        }

        let outcome = self.matcher.match_utterance(&utterance);
        debug!("Dispatch outcome: {:?}", outcome);

        if outcome.intent() == Some(Intent::Exit) {
            info!("👋 Exit requested");
            return LoopState::Shutdown;
        }

        self.dispatch(&outcome, &utterance).await;
        LoopState::Idle
    }

    /// Run one action, containing both errors and panics
    async fn dispatch(&mut self, outcome: &DispatchOutcome, utterance: &Utterance) {
        let label = outcome
            .intent()
            .map(|intent| intent.name())
            .unwrap_or("fallback");
        info!("⚡ Running action: {}", label);

        let result = AssertUnwindSafe(self.registry.execute(outcome, utterance, &mut self.capture))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(OptusError::Action(format!(
                    "panicked: {}",
                    panic_message(panic.as_ref())
                )))
            });

        let Err(e) = result else {
            return;
        };

        error!("❌ Action '{}': {}", label, e);
        self.capture.say(ACTION_APOLOGY).await;
        tokio::time::sleep(self.error_delay).await;
    }

    /// Cancel timers, close the microphone, release the detector, say goodbye
    async fn shutdown(&mut self) {
        info!("🛑 Shutting down...");
        self.registry.shutdown().await;
        self.capture.close();
        if let Some(mut wake) = self.wake.take() {
            wake.reset();
        }
        self.capture.say(FAREWELL).await;
        self.state = LoopState::Shutdown;
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
