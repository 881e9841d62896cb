//! Audible acknowledgment tones
//!
//! rodio's output stream is not `Send`, so playback runs on a dedicated thread
//! that owns the stream and takes commands over a channel.

use rodio::source::{SineWave, Source};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Commands sent to the audio thread
enum ChimeCommand {
    Play {
        frequency: f32,
        duration: Duration,
        done: oneshot::Sender<()>,
    },
}

/// Thread-safe handle to the chime player
#[derive(Clone)]
pub struct Chime {
    sender: mpsc::Sender<ChimeCommand>,
}

impl std::fmt::Debug for Chime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chime").finish()
    }
}

impl Chime {
    pub fn new() -> anyhow::Result<Self> {
        let (sender, receiver) = mpsc::channel::<ChimeCommand>();

        thread::Builder::new()
            .name("optus-chime".to_string())
            .spawn(move || Self::audio_thread(receiver))?;

        Ok(Self { sender })
    }

    fn audio_thread(receiver: mpsc::Receiver<ChimeCommand>) {
        let (_stream, stream_handle) = match rodio::OutputStream::try_default() {
            Ok(s) => s,
            Err(e) => {
                warn!("🔇 Failed to initialize audio output: {}", e);
                return;
            }
        };

        info!("🔊 Chime thread started");

        while let Ok(cmd) = receiver.recv() {
            match cmd {
                ChimeCommand::Play {
                    frequency,
                    duration,
                    done,
                } => {
                    match rodio::Sink::try_new(&stream_handle) {
                        Ok(sink) => {
                            sink.append(
                                SineWave::new(frequency)
                                    .take_duration(duration)
                                    .amplify(0.20),
                            );
                            sink.sleep_until_end();
                        }
                        Err(e) => warn!("❌ Failed to create audio sink: {}", e),
                    }
                    let _ = done.send(());
                }
            }
        }

        debug!("Chime thread stopped");
    }

    /// Play the wake acknowledgment and wait for it to finish
    pub async fn acknowledge(&self) {
        self.play(880.0, Duration::from_millis(150)).await;
    }

    async fn play(&self, frequency: f32, duration: Duration) {
        let (done, finished) = oneshot::channel();
        let cmd = ChimeCommand::Play {
            frequency,
            duration,
            done,
        };
        if self.sender.send(cmd).is_err() {
            debug!("Chime thread is gone; skipping tone");
            return;
        }
        let _ = finished.await;
    }
}
