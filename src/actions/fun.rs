//! Greetings, time, jokes and passwords

use crate::listening::Session;
use anyhow::{Context, Result};
use chrono::{Local, Timelike};
use rand::rngs::OsRng;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::warn;

const PASSWORD_LEN: usize = 16;
const PASSWORD_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

const JOKES: &[&str] = &[
    "There are only 10 kinds of people in this world: those who know binary and those who don't.",
    "A SQL query walks into a bar, walks up to two tables and asks, can I join you?",
    "Why do programmers prefer dark mode? Because light attracts bugs.",
    "How many programmers does it take to change a light bulb? None, that's a hardware problem.",
    "Why did the developer go broke? Because he used up all his cache.",
    "I would tell you a UDP joke, but you might not get it.",
    "Debugging is like being the detective in a crime movie where you are also the murderer.",
    "Why do Java programmers wear glasses? Because they don't C sharp.",
    "Algorithm: a word used by programmers when they don't want to explain what they did.",
    "The best thing about a boolean is that even if you are wrong, you are only off by a bit.",
];

pub fn greeting_for_hour(hour: u32) -> &'static str {
    match hour {
        5..=11 => "Good morning! I hope you have a great day.",
        12..=17 => "Good afternoon! What can I help you with?",
        _ => "Good evening! How can I assist you?",
    }
}

pub async fn good_morning(session: &mut dyn Session) -> Result<()> {
    session.say(greeting_for_hour(Local::now().hour())).await;
    Ok(())
}

pub async fn current_time(session: &mut dyn Session) -> Result<()> {
    let now = Local::now().format("%I:%M %p");
    session
        .say(&format!("The current time is {}.", now))
        .await;
    Ok(())
}

pub async fn joke(session: &mut dyn Session) -> Result<()> {
    let joke = JOKES
        .choose(&mut rand::thread_rng())
        .context("No jokes available")?;
    session.say(joke).await;
    Ok(())
}

/// Random password drawn from the OS entropy source
pub fn random_password(len: usize) -> String {
    (0..len)
        .map(|_| PASSWORD_CHARS[OsRng.gen_range(0..PASSWORD_CHARS.len())] as char)
        .collect()
}

fn copy_to_clipboard(text: &str) -> Result<()> {
    let mut clipboard = arboard::Clipboard::new().context("Failed to access clipboard")?;
    clipboard
        .set_text(text)
        .context("Failed to copy to clipboard")?;
    Ok(())
}

pub async fn generate_password(session: &mut dyn Session) -> Result<()> {
    session
        .say("Generating a secure password. I've copied it to your clipboard.")
        .await;

    let password = random_password(PASSWORD_LEN);
    if let Err(e) = copy_to_clipboard(&password) {
        warn!("Clipboard error: {:#}", e);
        session
            .say("I couldn't copy the password to your clipboard.")
            .await;
        return Ok(());
    }

    session
        .say(&format!(
            "A new {}-character password is on your clipboard.",
            PASSWORD_LEN
        ))
        .await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::testing::ScriptedSession;

    #[test]
    fn test_greeting_for_hour() {
        assert!(greeting_for_hour(5).starts_with("Good morning"));
        assert!(greeting_for_hour(11).starts_with("Good morning"));
        assert!(greeting_for_hour(12).starts_with("Good afternoon"));
        assert!(greeting_for_hour(17).starts_with("Good afternoon"));
        assert!(greeting_for_hour(18).starts_with("Good evening"));
        assert!(greeting_for_hour(2).starts_with("Good evening"));
    }

    #[test]
    fn test_random_password() {
        let password = random_password(PASSWORD_LEN);
        assert_eq!(password.chars().count(), PASSWORD_LEN);
        assert!(password.bytes().all(|b| PASSWORD_CHARS.contains(&b)));
        assert_ne!(password, random_password(PASSWORD_LEN));
    }

    #[tokio::test]
    async fn test_joke_is_spoken() {
        let mut session = ScriptedSession::default();
        joke(&mut session).await.unwrap();
        assert_eq!(session.said.len(), 1);
        assert!(JOKES.contains(&session.said[0].as_str()));
    }

    #[tokio::test]
    async fn test_current_time_format() {
        let mut session = ScriptedSession::default();
        current_time(&mut session).await.unwrap();
        let said = &session.said[0];
        assert!(said.starts_with("The current time is "));
        assert!(said.ends_with("AM.") || said.ends_with("PM."));
    }
}
