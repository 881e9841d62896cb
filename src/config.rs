use crate::error::{OptusError, OptusResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // Assistant
    pub assistant_name: String,
    pub wake_word: String,

    // Audio
    pub sample_rate: u32,
    pub frame_length: usize,
    pub acknowledge_chime: bool,
    pub ambient_duration_ms: u64,
    pub pause_threshold_ms: u64,
    pub phrase_start_timeout_ms: u64,
    pub max_phrase_ms: u64,
    pub energy_floor: f32,
    pub energy_ratio: f32,

    // Speech
    pub asr_engine: String,
    pub tts_engine: String,
    pub tts_voice: String,
    pub vosk_model_path: String,

    // Wyoming
    pub wyoming_host: String,
    pub wyoming_port: u16,

    // Services
    pub deepseek_api_key: String,
    pub deepseek_url: String,
    pub deepseek_model: String,
    pub serp_api_key: String,
    pub request_timeout_secs: u64,

    // Data
    pub notes_file: String,

    // Meta
    pub log_level: String,
    pub error_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            assistant_name: "Optus".to_string(),
            wake_word: "hey optus".to_string(),
            sample_rate: 16000,
            frame_length: 512,
            acknowledge_chime: true,
            ambient_duration_ms: 1000,
            pause_threshold_ms: 1000,
            phrase_start_timeout_ms: 5000,
            max_phrase_ms: 15000,
            energy_floor: 300.0,
            energy_ratio: 1.5,
            asr_engine: "vosk".to_string(),
            tts_engine: "system".to_string(),
            tts_voice: "".to_string(),
            vosk_model_path: data_dir()
                .join("models/vosk-model-small-en-us")
                .to_string_lossy()
                .to_string(),
            wyoming_host: "localhost".to_string(),
            wyoming_port: 10300,
            deepseek_api_key: "".to_string(),
            deepseek_url: "https://api.deepseek.com/v1".to_string(),
            deepseek_model: "deepseek-chat".to_string(),
            serp_api_key: "".to_string(),
            request_timeout_secs: 20,
            notes_file: data_dir().join("notes.txt").to_string_lossy().to_string(),
            log_level: "info".to_string(),
            error_delay_ms: 1000,
        }
    }
}

impl Config {
    /// Load config from `path`, falling back to defaults when missing or corrupt
    pub fn load_from(path: &Path) -> OptusResult<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|e| {
                OptusError::Config(format!("cannot read {}: {}", path.display(), e))
            })?;
            match serde_json::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("⚠️ Config file corrupted or invalid, using defaults: {}", e);
                    let backup_path = path.with_extension("json.corrupt");
                    let _ = std::fs::rename(path, &backup_path);
                    Self::default()
                }
            }
        } else {
            Self::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Save config to `path` as pretty JSON
    pub fn save_to(&self, path: &Path) -> OptusResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Secrets and the wake word may come from the environment instead of the file
    fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("OPTUS_DEEPSEEK_API_KEY") {
            self.deepseek_api_key = v;
        }
        if let Some(v) = lookup("OPTUS_SERP_API_KEY") {
            self.serp_api_key = v;
        }
        if let Some(v) = lookup("OPTUS_WAKE_WORD") {
            self.wake_word = v.to_lowercase();
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn error_delay(&self) -> Duration {
        Duration::from_millis(self.error_delay_ms)
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("optus")
        .join("config.json")
}

pub fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("optus")
}
