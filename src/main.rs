//! Optus - Wake-word voice assistant for the Linux desktop

use anyhow::{Context, Result};
use clap::Parser;
use optus::actions::Actions;
use optus::asr;
use optus::audio::{self, Chime, MicrophoneStream, PhraseRecorder, PhraseSettings};
use optus::config::{self, Config};
use optus::listening::{CommandCapture, ListeningLoop};
use optus::tts::{self, Speaker};
use optus::wake::{VoskWakeDetector, WakeDetector};
use std::path::PathBuf;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Audio input device index
    #[arg(short, long)]
    device: Option<usize>,

    /// Config file (defaults to ~/.config/optus/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// List audio input devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Write the effective config to the config file and exit
    #[arg(long)]
    write_config: bool,
}

fn init_logging(verbose: bool, config_level: &str) -> Result<()> {
    let fallback = if verbose { "debug" } else { config_level };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install logger: {}", e))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.list_devices {
        for (index, name) in audio::capture::list_input_devices()?.iter().enumerate() {
            println!("{}: {}", index, name);
        }
        return Ok(());
    }

    let config_path = args.config.clone().unwrap_or_else(config::config_path);
    let config = Config::load_from(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    if args.write_config {
        config
            .save_to(&config_path)
            .with_context(|| format!("Failed to write config to {:?}", config_path))?;
        println!("Wrote {}", config_path.display());
        return Ok(());
    }

    init_logging(args.verbose, &config.log_level)?;
    info!("🎙️ Optus v{} starting...", env!("CARGO_PKG_VERSION"));
    info!("📄 Config: {:?}", config_path);

    let speaker = Speaker::new(&config.assistant_name, tts::create_engine(&config).await);

    // Anything that fails from here until the loop starts is fatal
    let model = asr::load_model(&config.vosk_model_path)?;
    let wake =
        VoskWakeDetector::new(&config, &model).context("Failed to initialize wake detector")?;
    let microphone = MicrophoneStream::open(args.device, wake.sample_rate(), wake.frame_length())
        .context("Failed to open microphone")?;
    info!("🎤 Audio capture started");

    let transcriber =
        asr::create_transcriber(&config, &model).context("Failed to initialize ASR")?;
    drop(model);
    let actions = Actions::new(&config, speaker.clone())?;

    let capture = CommandCapture::new(
        Box::new(microphone),
        PhraseRecorder::new(PhraseSettings::from_config(&config)),
        transcriber,
        speaker.clone(),
    );
    let mut listening = ListeningLoop::new(
        Box::new(wake),
        capture,
        Box::new(actions),
        config.error_delay(),
    );

    if config.acknowledge_chime {
        match Chime::new() {
            Ok(chime) => listening = listening.with_chime(chime),
            Err(e) => warn!("🔇 Chime unavailable: {}", e),
        }
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                error!("❌ Cannot listen for Ctrl+C: {}", e);
                // Keep the sender alive so the loop is not told to stop
                shutdown_tx.closed().await;
            }
        }
    });

    speaker
        .speak(&format!(
            "{} is ready. Say '{}' to activate.",
            config.assistant_name, config.wake_word
        ))
        .await;

    listening.run(shutdown_rx).await?;
    info!("👋 Optus stopped");
    Ok(())
}
