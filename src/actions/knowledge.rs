//! General knowledge via DeepSeek
//!
//! OpenAI-compatible chat completions. Used for movie summaries, word
//! definitions, quotes and every utterance no rule matched.

use crate::listening::Session;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;
use tracing::{debug, warn};

pub const OFFLINE_MESSAGE: &str = "My connection to the DeepSeek AI is currently offline.";
pub const THINKING_MESSAGE: &str = "Please be patient, I'm thinking about it.";
pub const UNAVAILABLE_MESSAGE: &str = "Sorry, I couldn't connect to my AI service at the moment.";
pub const QUOTE_PROMPT: &str = "Tell me an inspiring quote.";

const MAX_ATTEMPTS: usize = 3;

pub fn movie_prompt(movie: &str) -> String {
    format!(
        "Tell me about the movie {}. Keep it to a short paragraph.",
        movie
    )
}

pub fn define_prompt(word: &str) -> String {
    format!("Define the word '{}' in a single sentence.", word)
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// Reply text of a chat completion body
fn parse_reply(body: &str) -> Result<String> {
    let response: ChatResponse =
        serde_json::from_str(body).context("Malformed chat completion response")?;
    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content.trim().to_string())
        .filter(|content| !content.is_empty())
        .context("Chat completion returned no content")
}

/// Retry only failures that never reached the service
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_connect() || e.is_timeout()
}

#[derive(Debug, Clone)]
pub struct KnowledgeClient {
    http: reqwest::Client,
    url: String,
    model: String,
    api_key: Option<String>,
}

impl KnowledgeClient {
    pub fn new(http: reqwest::Client, url: &str, model: &str, api_key: &str) -> Self {
        Self {
            http,
            url: url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: (!api_key.is_empty()).then(|| api_key.to_string()),
        }
    }

    pub fn is_online(&self) -> bool {
        self.api_key.is_some()
    }

    /// Send one user prompt and return the reply
    pub async fn ask(&self, prompt: &str) -> Result<String> {
        let api_key = self.api_key.as_deref().context("No DeepSeek API key")?;
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
        });
        let endpoint = format!("{}/chat/completions", self.url);

        // 200ms, 400ms
        let strategy = ExponentialBackoff::from_millis(2)
            .factor(100)
            .max_delay(Duration::from_secs(2))
            .map(jitter)
            .take(MAX_ATTEMPTS - 1);

        let response = RetryIf::spawn(
            strategy,
            || {
                debug!("🧠 Asking DeepSeek ({})", self.model);
                self.http
                    .post(&endpoint)
                    .bearer_auth(api_key)
                    .json(&body)
                    .send()
            },
            is_transient,
        )
        .await
        .context("DeepSeek request failed")?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            anyhow::bail!("DeepSeek API error ({}): {}", status, text);
        }
        parse_reply(&text)
    }

    /// Ask and speak the reply, or a fallback sentence
    pub async fn answer(&self, session: &mut dyn Session, prompt: &str) -> Result<()> {
        if !self.is_online() {
            session.say(OFFLINE_MESSAGE).await;
            return Ok(());
        }

        session.say(THINKING_MESSAGE).await;
        match self.ask(prompt).await {
            Ok(reply) => session.say(&reply).await,
            Err(e) => {
                warn!("❌ DeepSeek error: {:#}", e);
                session.say(UNAVAILABLE_MESSAGE).await;
            }
        }
        Ok(())
    }
}
