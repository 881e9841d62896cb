//! Microphone capture using cpal
//!
//! cpal streams are not `Send`, so each stream lives on a dedicated thread and
//! hands chunks to the async side through a channel. A stream that reported
//! an error is never read again; the next read opens a fresh one.

use super::AudioSource;
use crate::error::{OptusError, OptusResult};
use anyhow::{Context, Result};
use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::collections::VecDeque;
use std::sync::mpsc as std_mpsc;
use std::thread;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

type Chunk = Result<Vec<i16>, String>;

/// Names of the available input devices, by index
pub fn list_input_devices() -> Result<Vec<String>> {
    let host = cpal::default_host();
    Ok(host
        .input_devices()?
        .map(|device| device.name().unwrap_or_else(|_| "Unknown".to_string()))
        .collect())
}

/// Running capture thread and the receiving end of its chunks
struct Connection {
    receiver: mpsc::UnboundedReceiver<Chunk>,
    worker: Option<Worker>,
}

struct Worker {
    stop: std_mpsc::Sender<()>,
    thread: thread::JoinHandle<()>,
}

impl Worker {
    fn stop(self) {
        let _ = self.stop.send(());
        if self.thread.join().is_err() {
            warn!("⚠️ Microphone thread panicked");
        }
    }
}

type Opener = Box<dyn FnMut() -> Result<Connection> + Send>;

/// Mono i16 microphone stream shared by wake detection and command capture.
///
/// A stream error tears the device down; the next read reopens it.
pub struct MicrophoneStream {
    connection: Option<Connection>,
    opener: Opener,
    pending: VecDeque<i16>,
    sample_rate: u32,
    closed: bool,
}

impl MicrophoneStream {
    /// Open the input device and start streaming
    pub fn open(
        device_index: Option<usize>,
        sample_rate: u32,
        frame_length: usize,
    ) -> OptusResult<Self> {
        let opener: Opener =
            Box::new(move || start_capture(device_index, sample_rate, frame_length));
        Self::with_opener(opener, sample_rate)
            .map_err(|e| OptusError::Initialization(format!("microphone: {:#}", e)))
    }

    fn with_opener(mut opener: Opener, sample_rate: u32) -> Result<Self> {
        let connection = opener()?;
        Ok(Self {
            connection: Some(connection),
            opener,
            pending: VecDeque::new(),
            sample_rate,
            closed: false,
        })
    }

    fn disconnect(&mut self) {
        self.pending.clear();
        if let Some(connection) = self.connection.take() {
            if let Some(worker) = connection.worker {
                worker.stop();
            }
        }
    }

    fn reconnect(&mut self) -> OptusResult<()> {
        info!("🔄 Reopening microphone");
        let connection = (self.opener)()
            .map_err(|e| OptusError::DeviceRead(format!("reopen failed: {:#}", e)))?;
        self.connection = Some(connection);
        Ok(())
    }
}

fn start_capture(device_index: Option<usize>, sample_rate: u32, frame_length: usize) -> Result<Connection> {
    let (tx, receiver) = mpsc::unbounded_channel();
    let (stop_tx, stop_rx) = std_mpsc::channel::<()>();
    let (ready_tx, ready_rx) = std_mpsc::channel::<Result<String, String>>();

    let handle = thread::Builder::new()
        .name("optus-mic".to_string())
        .spawn(move || {
            let stream = match build_stream(device_index, sample_rate, frame_length, tx) {
                Ok((stream, name)) => {
                    let _ = ready_tx.send(Ok(name));
                    stream
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(format!("{:#}", e)));
                    return;
                }
            };

            // Returns on disconnect or when the owner is dropped
            let _ = stop_rx.recv();
            drop(stream);
            debug!("🎙️ Microphone thread stopped");
        })
        .context("Failed to spawn microphone thread")?;

    match ready_rx.recv() {
        Ok(Ok(name)) => info!("🎙️ Using audio device: {}", name),
        Ok(Err(e)) => {
            let _ = handle.join();
            anyhow::bail!("Could not open microphone: {}", e);
        }
        Err(_) => anyhow::bail!("Microphone thread exited during startup"),
    }

    Ok(Connection {
        receiver,
        worker: Some(Worker {
            stop: stop_tx,
            thread: handle,
        }),
    })
}

fn build_stream(
    device_index: Option<usize>,
    sample_rate: u32,
    frame_length: usize,
    tx: mpsc::UnboundedSender<Chunk>,
) -> Result<(cpal::Stream, String)> {
    let host = cpal::default_host();

    let device = if let Some(idx) = device_index {
        host.input_devices()?
            .nth(idx)
            .context("Device index out of range")?
    } else {
        host.default_input_device()
            .context("No default input device")?
    };
    let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());

    let config = cpal::StreamConfig {
        channels: 1,
        sample_rate: cpal::SampleRate(sample_rate),
        buffer_size: cpal::BufferSize::Fixed(frame_length as u32),
    };

    let err_tx = tx.clone();
    let stream = device.build_input_stream(
        &config,
        move |data: &[i16], _: &cpal::InputCallbackInfo| {
            // Receiver gone means we are shutting down
            let _ = tx.send(Ok(data.to_vec()));
        },
        move |err| {
            warn!("Audio stream error: {}", err);
            let _ = err_tx.send(Err(err.to_string()));
        },
        None,
    )?;

    stream.play()?;
    Ok((stream, device_name))
}

#[async_trait]
impl AudioSource for MicrophoneStream {
    async fn read(&mut self, len: usize) -> OptusResult<Vec<i16>> {
        if self.closed {
            return Err(OptusError::DeviceRead("microphone is closed".to_string()));
        }

        while self.pending.len() < len {
            if self.connection.is_none() {
                self.reconnect()?;
            }
            let received = match self.connection.as_mut() {
                Some(connection) => connection.receiver.recv().await,
                None => None,
            };

            match received {
                Some(Ok(chunk)) => self.pending.extend(chunk),
                Some(Err(e)) => {
                    self.disconnect();
                    return Err(OptusError::DeviceRead(e));
                }
                None => {
                    self.disconnect();
                    return Err(OptusError::DeviceRead(
                        "audio stream closed".to_string(),
                    ));
                }
            }
        }

        Ok(self.pending.drain(..len).collect())
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn discard_pending(&mut self) {
        let mut dropped = self.pending.len();
        self.pending.clear();
        if let Some(connection) = self.connection.as_mut() {
            while let Ok(chunk) = connection.receiver.try_recv() {
                if let Ok(samples) = chunk {
                    dropped += samples.len();
                }
            }
        }
        if dropped > 0 {
            debug!("Discarded {} buffered samples", dropped);
        }
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.disconnect();
        info!("🎙️ Audio stream closed");
    }
}

impl Drop for MicrophoneStream {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// Microphone fed by hand; every open hands out the next queued channel
    fn scripted_microphone(
        receivers: Vec<mpsc::UnboundedReceiver<Chunk>>,
    ) -> (MicrophoneStream, Arc<AtomicUsize>) {
        let mut receivers = VecDeque::from(receivers);
        let opens = Arc::new(AtomicUsize::new(0));
        let counter = opens.clone();
        let opener: Opener = Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            let receiver = receivers.pop_front().context("device unplugged")?;
            Ok(Connection {
                receiver,
                worker: None,
            })
        });
        let microphone = MicrophoneStream::with_opener(opener, 16000).unwrap();
        (microphone, opens)
    }

    #[tokio::test]
    async fn test_reopens_after_stream_error() {
        let (first_tx, first_rx) = mpsc::unbounded_channel();
        let (second_tx, second_rx) = mpsc::unbounded_channel();
        let (mut microphone, opens) = scripted_microphone(vec![first_rx, second_rx]);

        first_tx.send(Ok(vec![1; 4])).unwrap();
        first_tx.send(Err("device lost".to_string())).unwrap();
        assert!(matches!(
            microphone.read(8).await,
            Err(OptusError::DeviceRead(_))
        ));

        // Samples from before the error are not mixed into the new stream
        second_tx.send(Ok(vec![2; 8])).unwrap();
        assert_eq!(microphone.read(8).await.unwrap(), vec![2; 8]);
        assert_eq!(opens.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_dead_device_keeps_failing_instead_of_hanging() {
        let (tx, rx) = mpsc::unbounded_channel();
        let (mut microphone, opens) = scripted_microphone(vec![rx]);

        tx.send(Err("device lost".to_string())).unwrap();
        for _ in 0..3 {
            let result = tokio::time::timeout(Duration::from_secs(1), microphone.read(8))
                .await
                .expect("read blocked on a dead device");
            assert!(matches!(result, Err(OptusError::DeviceRead(_))));
        }
        assert_eq!(opens.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_discard_pending_drops_queued_audio() {
        let (tx, rx) = mpsc::unbounded_channel();
        let (mut microphone, _opens) = scripted_microphone(vec![rx]);

        tx.send(Ok(vec![1; 4])).unwrap();
        tx.send(Ok(vec![1; 4])).unwrap();
        microphone.discard_pending();

        tx.send(Ok(vec![3; 4])).unwrap();
        assert_eq!(microphone.read(4).await.unwrap(), vec![3; 4]);
    }

    #[tokio::test]
    async fn test_closed_microphone_refuses_reads() {
        let (_tx, rx) = mpsc::unbounded_channel();
        let (mut microphone, opens) = scripted_microphone(vec![rx]);

        microphone.close();
        assert!(matches!(
            microphone.read(4).await,
            Err(OptusError::DeviceRead(_))
        ));
        assert_eq!(opens.load(Ordering::SeqCst), 1);
    }
}
