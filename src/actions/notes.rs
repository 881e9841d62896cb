//! Append-only notes file, one timestamped line per entry

use super::listen_or_apologize;
use crate::listening::Session;
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// `- <note> (<YYYY-MM-DD HH:MM>)`
pub fn format_entry(note: &str, at: DateTime<Local>) -> String {
    format!("- {} ({})\n", note, at.format("%Y-%m-%d %H:%M"))
}

pub fn append_note(path: &Path, note: &str, at: DateTime<Local>) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open notes file {:?}", path))?;
    file.write_all(format_entry(note, at).as_bytes())?;
    Ok(())
}

/// File contents, or `None` when no notes were ever taken
pub fn load_notes(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read notes file {:?}", path))?;
    Ok(Some(content))
}

pub async fn add_note(session: &mut dyn Session, path: &Path) -> Result<()> {
    session.say("What should I write down?").await;
    let Some(note) = listen_or_apologize(session).await else {
        return Ok(());
    };

    append_note(path, note.as_str(), Local::now())?;
    info!("📝 Note saved to {:?}", path);
    session.say("I've added that to your notes.").await;
    Ok(())
}

pub async fn read_notes(session: &mut dyn Session, path: &Path) -> Result<()> {
    match load_notes(path)? {
        None => session.say("You don't have any notes yet.").await,
        Some(notes) => {
            session.say("Here are your notes.").await;
            if notes.trim().is_empty() {
                session.say("Your notes file is empty.").await;
            } else {
                session.say(&notes).await;
            }
        }
    }
    Ok(())
}
