//! Speechd-ng TTS backend using D-Bus

use crate::error::{OptusError, OptusResult};
use crate::tts::TtsEngine;
use async_trait::async_trait;
use tracing::{info, warn};
use zbus::{proxy, Connection};

#[proxy(
    interface = "org.speech.Service",
    default_service = "org.speech.Service",
    default_path = "/org/speech/Service"
)]
trait SpeechService {
    fn speak(&self, text: &str) -> zbus::Result<()>;
    fn speak_voice(&self, text: &str, voice: &str) -> zbus::Result<()>;
    fn ping(&self) -> zbus::Result<String>;
}

pub struct SpeechdEngine {
    proxy: SpeechServiceProxy<'static>,
    voice: Option<String>,
}

impl std::fmt::Debug for SpeechdEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechdEngine")
            .field("voice", &self.voice)
            .finish()
    }
}

impl SpeechdEngine {
    /// Connect to the session bus and verify the daemon answers.
    /// An empty `voice` keeps the daemon default.
    pub async fn connect(voice: &str) -> OptusResult<Self> {
        let connection = Connection::session().await.map_err(bus_error)?;
        let proxy = SpeechServiceProxy::new(&connection)
            .await
            .map_err(bus_error)?;

        match proxy.ping().await {
            Ok(response) => {
                info!("🔊 Connected to speechd-ng: {}", response);
            }
            Err(e) => {
                warn!("⚠️ speechd-ng not responding: {}", e);
                return Err(OptusError::Tts(format!("speechd-ng not responding: {}", e)));
            }
        }

        let voice = (!voice.is_empty()).then(|| voice.to_string());
        Ok(Self { proxy, voice })
    }
}

fn bus_error(e: zbus::Error) -> OptusError {
    OptusError::Tts(format!("speechd-ng: {}", e))
}

#[async_trait]
impl TtsEngine for SpeechdEngine {
    async fn speak(&self, text: &str) -> OptusResult<()> {
        match self.voice {
            Some(ref voice) => self.proxy.speak_voice(text, voice).await,
            None => self.proxy.speak(text).await,
        }
        .map_err(bus_error)
    }

    fn name(&self) -> &str {
        "speechd_ng"
    }
}
