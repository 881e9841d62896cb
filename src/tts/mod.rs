//! TTS (Text-to-Speech) Module
//!
//! `Speaker` is the single "speak" channel shared by the listening loop and
//! every action. It always logs what is said and voices it when an engine
//! is available.

use crate::config::Config;
use crate::error::OptusResult;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

pub mod speechd;
pub mod system;

/// Trait for TTS engines
#[async_trait]
pub trait TtsEngine: Send + Sync + std::fmt::Debug {
    /// Speak the given text and return once it has been spoken
    async fn speak(&self, text: &str) -> OptusResult<()>;

    /// Get the engine name
    fn name(&self) -> &str;
}

/// Factory to create the configured TTS engine (`None` means console only)
pub async fn create_engine(config: &Config) -> Option<Arc<dyn TtsEngine>> {
    info!("🛠️ Creating TTS engine: {}", config.tts_engine);
    let engine: Arc<dyn TtsEngine> = match config.tts_engine.as_str() {
        "none" => {
            info!("  - Console output only");
            return None;
        }
        "speechd_ng" | "speechd" => {
            match speechd::SpeechdEngine::connect(&config.tts_voice).await {
                Ok(client) => Arc::new(client),
                Err(e) => {
                    warn!("  - speechd-ng unavailable ({}), falling back to System", e);
                    Arc::new(system::SystemEngine::new())
                }
            }
        }
        "system" => Arc::new(system::SystemEngine::new()),
        other => {
            warn!("  - Unknown engine '{}', falling back to System", other);
            Arc::new(system::SystemEngine::new())
        }
    };
    info!("✅ TTS engine '{}' initialized", engine.name());
    Some(engine)
}

/// The assistant's voice
#[derive(Clone, Debug)]
pub struct Speaker {
    name: String,
    engine: Option<Arc<dyn TtsEngine>>,
}

impl Speaker {
    pub fn new(name: &str, engine: Option<Arc<dyn TtsEngine>>) -> Self {
        Self {
            name: name.to_string(),
            engine,
        }
    }

    /// Speak `text`. Engine failures are logged, never returned.
    pub async fn speak(&self, text: &str) {
        let cleaned = clean_for_speech(text);
        info!("🗣️ {}: {}", self.name, cleaned);

        if let Some(ref engine) = self.engine {
            if let Err(e) = engine.speak(&cleaned).await {
                warn!("--- TTS Error ({}): {} ---", engine.name(), e);
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Strip markdown emphasis that engines would read aloud
pub fn clean_for_speech(text: &str) -> String {
    text.replace(['*', '#'], "").trim().to_string()
}
