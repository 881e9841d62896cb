//! System fallback TTS engine

use super::TtsEngine;
use crate::error::{OptusError, OptusResult};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug)]
pub struct SystemEngine;

impl Default for SystemEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemEngine {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TtsEngine for SystemEngine {
    async fn speak(&self, text: &str) -> OptusResult<()> {
        debug!("System speaking: {}", text);

        // Wait for playback so the microphone does not hear us
        if let Ok(status) = Command::new("spd-say").arg("-w").arg(text).status().await {
            if status.success() {
                return Ok(());
            }
        }

        if let Ok(status) = Command::new("espeak-ng").arg(text).status().await {
            if status.success() {
                return Ok(());
            }
        }

        Err(OptusError::Tts(
            "No system TTS command found (tried spd-say, espeak-ng)".to_string(),
        ))
    }

    fn name(&self) -> &str {
        "system"
    }
}
