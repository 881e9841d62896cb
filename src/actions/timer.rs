//! Countdown timers
//!
//! Each timer is a tokio task that speaks when it expires. Handles are kept
//! so every pending timer can be cancelled when the assistant shuts down.

use super::calc::word_value;
use super::first_number;
use crate::listening::Session;
use crate::tts::Speaker;
use anyhow::Result;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Longest timer accepted, one day
pub const MAX_MINUTES: u64 = 24 * 60;

/// Minutes requested in "set a timer for 5 minutes" or "... for five minutes"
pub fn parse_minutes(text: &str) -> Option<u64> {
    if let Some(minutes) = first_number(text) {
        return Some(minutes);
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    let start = words.iter().position(|w| word_value(w).is_some())?;
    let first = word_value(words[start])?;
    let second = words
        .get(start + 1)
        .and_then(|w| word_value(w))
        .filter(|&v| first >= 20 && (1..10).contains(&v))
        .unwrap_or(0);
    Some(first + second)
}

/// Pending timers
#[derive(Debug, Default)]
pub struct TimerSet {
    handles: Vec<JoinHandle<()>>,
}

impl TimerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Speak `message` after `delay`
    pub fn schedule(&mut self, delay: Duration, speaker: Speaker, message: String) {
        self.handles.retain(|h| !h.is_finished());
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            info!("⏰ Timer finished");
            speaker.speak(&message).await;
        });
        self.handles.push(handle);
    }

    /// Timers that have not fired yet
    pub fn pending(&self) -> usize {
        self.handles.iter().filter(|h| !h.is_finished()).count()
    }

    /// Abort every pending timer, returning how many were still waiting
    pub fn cancel_all(&mut self) -> usize {
        let pending = self.pending();
        for handle in self.handles.drain(..) {
            handle.abort();
        }
        pending
    }
}

impl Drop for TimerSet {
    fn drop(&mut self) {
        if !self.handles.is_empty() {
            debug!("Dropping timer set");
            self.cancel_all();
        }
    }
}

fn plural(minutes: u64) -> &'static str {
    if minutes == 1 {
        "minute"
    } else {
        "minutes"
    }
}

pub async fn set_timer(
    session: &mut dyn Session,
    timers: &mut TimerSet,
    speaker: &Speaker,
    request: &str,
) -> Result<()> {
    let Some(minutes) = parse_minutes(request).filter(|m| (1..=MAX_MINUTES).contains(m)) else {
        session
            .say("I couldn't set the timer. Please specify the duration in minutes.")
            .await;
        return Ok(());
    };

    timers.schedule(
        Duration::from_secs(minutes * 60),
        speaker.clone(),
        format!("Time's up! Your {} minute timer has finished.", minutes),
    );
    session
        .say(&format!("Timer set for {} {}.", minutes, plural(minutes)))
        .await;
    Ok(())
}
