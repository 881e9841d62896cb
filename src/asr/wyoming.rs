//! Wyoming Protocol Transcriber
//!
//! Sends a finished capture to an external ASR service. Wyoming is a simple
//! protocol where events are JSON lines over TCP.
//!
//! Reference: https://github.com/rhasspy/wyoming

use super::{to_utterance, Transcriber};
use crate::error::TranscriptionError;
use crate::intent::Utterance;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

/// Wyoming event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum WyomingEvent {
    /// Describe request (handshake)
    #[serde(rename = "describe")]
    Describe,

    /// Start of audio stream
    #[serde(rename = "audio-start")]
    AudioStart(AudioFormat),

    /// Audio chunk
    #[serde(rename = "audio-chunk")]
    AudioChunk(AudioChunkData),

    /// End of audio stream
    #[serde(rename = "audio-stop")]
    AudioStop,

    /// Transcript result
    #[serde(rename = "transcript")]
    Transcript(TranscriptData),
}

/// Audio format shared by start and chunk events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioFormat {
    pub rate: u32,
    pub width: u8,
    pub channels: u8,
}

/// Audio chunk data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioChunkData {
    pub rate: u32,
    pub width: u8,
    pub channels: u8,
    #[serde(with = "base64_bytes")]
    pub audio: Vec<u8>,
    #[serde(default)]
    pub timestamp: u64,
}

/// Transcript result data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptData {
    pub text: String,
}

/// Base64 serialization for audio bytes
mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}

/// Wyoming client used as a transcriber
pub struct WyomingTranscriber {
    host: String,
    port: u16,
    timeout: Duration,
}

impl WyomingTranscriber {
    pub fn new(host: &str, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.to_string(),
            port,
            timeout,
        }
    }

    /// Send the capture and wait for the transcript text
    async fn request(&self, samples: &[i16], sample_rate: u32) -> Result<String> {
        let stream = tokio::time::timeout(
            self.timeout,
            TcpStream::connect((self.host.as_str(), self.port)),
        )
        .await
        .context("Timeout connecting to Wyoming server")?
        .context("Failed to connect to Wyoming server")?;

        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);

        let format = AudioFormat {
            rate: sample_rate,
            width: 2,
            channels: 1,
        };
        let events = [
            WyomingEvent::Describe,
            WyomingEvent::AudioStart(format.clone()),
            WyomingEvent::AudioChunk(AudioChunkData {
                rate: format.rate,
                width: format.width,
                channels: format.channels,
                audio: pcm_bytes(samples),
                timestamp: 0,
            }),
            WyomingEvent::AudioStop,
        ];

        for event in &events {
            writer
                .write_all(serde_json::to_string(event)?.as_bytes())
                .await?;
            writer.write_all(b"\n").await?;
        }
        writer.flush().await?;

        debug!(
            "Sent audio ({} samples), waiting for transcript...",
            samples.len()
        );

        let transcript = tokio::time::timeout(self.timeout, async {
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).await? == 0 {
                    break;
                }

                if let Some(text) = parse_transcript(&line) {
                    return Ok::<_, anyhow::Error>(text);
                }
            }
            Ok(String::new())
        })
        .await
        .context("Timeout waiting for transcript")??;

        info!("📝 Wyoming transcript: '{}'", transcript);
        Ok(transcript)
    }
}

#[async_trait]
impl Transcriber for WyomingTranscriber {
    async fn transcribe(
        &mut self,
        samples: &[i16],
        sample_rate: u32,
    ) -> Result<Utterance, TranscriptionError> {
        if samples.is_empty() {
            return Err(TranscriptionError::NoSpeechUnderstood);
        }

        match self.request(samples, sample_rate).await {
            Ok(text) => to_utterance(&text),
            Err(e) => {
                warn!("Wyoming request failed: {:#}", e);
                Err(TranscriptionError::ServiceUnavailable(format!("{:#}", e)))
            }
        }
    }

    fn name(&self) -> &str {
        "wyoming"
    }
}

/// Little-endian PCM bytes as Wyoming expects
fn pcm_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Extract the text of a transcript event; other events are skipped
fn parse_transcript(line: &str) -> Option<String> {
    match serde_json::from_str::<WyomingEvent>(line.trim()) {
        Ok(WyomingEvent::Transcript(data)) => Some(data.text),
        _ => None,
    }
}
