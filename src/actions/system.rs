//! Desktop and session control
//!
//! Everything here shells out to standard Linux tools (`pactl`, `loginctl`,
//! `systemctl`, `xdg-open`) or reads local system information.

use super::{first_number, listen_or_apologize, open_target};
use crate::listening::Session;
use anyhow::{Context, Result};
use std::path::PathBuf;
use sysinfo::System;
use tokio::process::Command;
use tracing::{info, warn};

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

async fn run_command(program: &str, args: &[&str]) -> Result<()> {
    let status = Command::new(program)
        .args(args)
        .status()
        .await
        .with_context(|| format!("Failed to run {}", program))?;
    if !status.success() {
        anyhow::bail!("{} exited with {}", program, status);
    }
    Ok(())
}

pub async fn send_email(session: &mut dyn Session) -> Result<()> {
    session
        .say("Opening your default email client for you to send an email.")
        .await;
    open_target("mailto:")
}

pub async fn open_browser(session: &mut dyn Session) -> Result<()> {
    session.say("Opening your browser.").await;
    open_target("http://google.com")
}

pub async fn open_whatsapp(session: &mut dyn Session) -> Result<()> {
    match run_command("xdg-open", &["whatsapp:"]).await {
        Ok(()) => session.say("Opening WhatsApp.").await,
        Err(e) => {
            warn!("WhatsApp app unavailable: {:#}", e);
            session
                .say("I couldn't open the WhatsApp app, opening it in your browser instead.")
                .await;
            open_target("https://web.whatsapp.com")?;
        }
    }
    Ok(())
}

/// Snapshot of the machine for the specs action
#[derive(Debug, Clone, PartialEq)]
pub struct PcSpecs {
    pub cpu: String,
    pub total_ram_gb: f64,
    pub used_ram_percent: f64,
}

impl PcSpecs {
    pub fn collect() -> Self {
        let mut sys = System::new();
        sys.refresh_memory();
        sys.refresh_cpu_all();

        let cpu = sys
            .cpus()
            .first()
            .map(|c| c.brand().trim().to_string())
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| "unknown processor".to_string());

        let total = sys.total_memory() as f64;
        let used_ram_percent = if total > 0.0 {
            sys.used_memory() as f64 / total * 100.0
        } else {
            0.0
        };

        Self {
            cpu,
            total_ram_gb: total / BYTES_PER_GB,
            used_ram_percent,
        }
    }

    pub fn sentences(&self) -> [String; 3] {
        [
            format!("CPU: {}", self.cpu),
            format!("Total RAM: {:.2} GB", self.total_ram_gb),
            format!("Used RAM: {:.1}%", self.used_ram_percent),
        ]
    }
}

pub async fn pc_specs(session: &mut dyn Session) -> Result<()> {
    session.say("Here are your computer's specifications.").await;
    let specs = tokio::task::spawn_blocking(PcSpecs::collect)
        .await
        .context("System information task failed")?;
    for sentence in specs.sentences() {
        session.say(&sentence).await;
    }
    Ok(())
}

/// Requested level: "mute" is 0, otherwise the first number spoken
pub fn parse_volume(request: &str) -> Option<u64> {
    if request.contains("mute") {
        return Some(0);
    }
    first_number(request)
}

pub async fn set_volume(session: &mut dyn Session, request: &str) -> Result<()> {
    let level = match parse_volume(request) {
        Some(level) if level <= 100 => level,
        _ => {
            session
                .say("Please specify a volume level between 0 and 100.")
                .await;
            return Ok(());
        }
    };

    let percent = format!("{}%", level);
    match run_command("pactl", &["set-sink-volume", "@DEFAULT_SINK@", &percent]).await {
        Ok(()) => {
            info!("🔊 Volume set to {}", percent);
            session
                .say(&format!("Volume set to {} percent.", level))
                .await;
        }
        Err(e) => {
            warn!("Set volume error: {:#}", e);
            session.say("I couldn't change the volume.").await;
        }
    }
    Ok(())
}

/// Known folder for a spoken name ("downloads folder", "my documents")
pub fn folder_path(name: &str) -> Option<PathBuf> {
    if name.contains("download") {
        dirs::download_dir()
    } else if name.contains("document") {
        dirs::document_dir()
    } else if name.contains("desktop") {
        dirs::desktop_dir()
    } else if name.contains("picture") || name.contains("photo") {
        dirs::picture_dir()
    } else if name.contains("music") {
        dirs::audio_dir()
    } else if name.contains("video") {
        dirs::video_dir()
    } else {
        None
    }
}

pub async fn open_folder(session: &mut dyn Session, spoken: &str) -> Result<()> {
    let name = spoken.trim_end_matches("folder").trim();
    session
        .say(&format!("Opening your {} folder.", name))
        .await;

    match folder_path(name).filter(|p| p.exists()) {
        Some(path) => open_target(&path.to_string_lossy()),
        None => {
            session
                .say(&format!("Sorry, I couldn't find the {} folder.", name))
                .await;
            Ok(())
        }
    }
}

pub async fn lock_screen(session: &mut dyn Session) -> Result<()> {
    session.say("Locking the screen.").await;
    if let Err(e) = run_command("loginctl", &["lock-session"]).await {
        warn!("Lock screen error: {:#}", e);
        session.say("I couldn't lock the screen.").await;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerAction {
    Shutdown,
    Restart,
}

impl PowerAction {
    fn confirmation(self) -> &'static str {
        match self {
            PowerAction::Shutdown => "Are you sure? This will shut down the computer immediately.",
            PowerAction::Restart => "Are you sure? This will restart the computer immediately.",
        }
    }

    fn systemctl_verb(self) -> &'static str {
        match self {
            PowerAction::Shutdown => "poweroff",
            PowerAction::Restart => "reboot",
        }
    }
}

/// Confirm with a spoken "yes" before powering off or rebooting
pub async fn power(session: &mut dyn Session, action: PowerAction) -> Result<()> {
    session.say(action.confirmation()).await;

    let confirmed = listen_or_apologize(session)
        .await
        .is_some_and(|answer| answer.contains("yes"));
    if !confirmed {
        session.say("Okay, never mind.").await;
        return Ok(());
    }

    info!("⚠️ Power action confirmed: {:?}", action);
    run_command("systemctl", &[action.systemctl_verb()]).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::testing::ScriptedSession;

    #[test]
    fn test_parse_volume() {
        assert_eq!(parse_volume("set volume to 40"), Some(40));
        assert_eq!(parse_volume("mute volume"), Some(0));
        assert_eq!(parse_volume("set volume to 150 percent"), Some(150));
        assert_eq!(parse_volume("set volume louder"), None);
    }

    #[tokio::test]
    async fn test_volume_out_of_range() {
        let mut session = ScriptedSession::default();
        set_volume(&mut session, "set volume to 150").await.unwrap();
        set_volume(&mut session, "set volume please").await.unwrap();
        assert_eq!(
            session.said,
            vec![
                "Please specify a volume level between 0 and 100.",
                "Please specify a volume level between 0 and 100.",
            ]
        );
    }

    #[test]
    fn test_folder_path() {
        assert_eq!(folder_path("downloads"), dirs::download_dir());
        assert_eq!(folder_path("documents"), dirs::document_dir());
        assert_eq!(folder_path("secret"), None);
    }

    #[tokio::test]
    async fn test_unknown_folder() {
        let mut session = ScriptedSession::default();
        open_folder(&mut session, "secret folder").await.unwrap();
        assert_eq!(
            session.said,
            vec![
                "Opening your secret folder.",
                "Sorry, I couldn't find the secret folder.",
            ]
        );
    }

    #[tokio::test]
    async fn test_power_requires_yes() {
        let mut session = ScriptedSession::hearing(&["no thanks"]);
        power(&mut session, PowerAction::Shutdown).await.unwrap();
        assert_eq!(
            session.said,
            vec![
                "Are you sure? This will shut down the computer immediately.",
                "Okay, never mind.",
            ]
        );

        let mut session = ScriptedSession::default();
        power(&mut session, PowerAction::Restart).await.unwrap();
        assert_eq!(session.said.last().map(String::as_str), Some("Okay, never mind."));
    }

    #[test]
    fn test_spec_sentences() {
        let specs = PcSpecs {
            cpu: "Test CPU".to_string(),
            total_ram_gb: 15.6789,
            used_ram_percent: 42.34,
        };
        assert_eq!(
            specs.sentences(),
            [
                "CPU: Test CPU".to_string(),
                "Total RAM: 15.68 GB".to_string(),
                "Used RAM: 42.3%".to_string(),
            ]
        );
    }
}
