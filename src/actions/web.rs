//! Web lookups and browser hand-offs
//!
//! - SerpApi: trending searches and news headlines
//! - Wikipedia REST summaries
//! - QR codes rendered by api.qrserver.com
//! - Cloudflare speed test endpoints

use super::open_target;
use crate::listening::Session;
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const SERPAPI_URL: &str = "https://serpapi.com/search.json";
const WIKIPEDIA_SUMMARY_URL: &str = "https://en.wikipedia.org/api/rest_v1/page/summary";
const QR_URL: &str = "https://api.qrserver.com/v1/create-qr-code/";
const SPEED_DOWN_URL: &str = "https://speed.cloudflare.com/__down";
const SPEED_UP_URL: &str = "https://speed.cloudflare.com/__up";

const SUMMARY_CHARS: usize = 500;
const TREND_COUNT: usize = 5;
const HEADLINE_COUNT: usize = 3;
const DOWNLOAD_BYTES: usize = 10_000_000;
const UPLOAD_BYTES: usize = 2_000_000;

async fn serpapi(http: &reqwest::Client, api_key: &str, params: &[(&str, &str)]) -> Result<Value> {
    if api_key.is_empty() {
        anyhow::bail!("No SerpApi key configured");
    }

    let response = http
        .get(SERPAPI_URL)
        .query(params)
        .query(&[("api_key", api_key)])
        .send()
        .await?
        .error_for_status()?;
    Ok(response.json().await?)
}

/// `trending_searches[0].searches[..5].query`
pub fn extract_trends(results: &Value) -> Option<Vec<String>> {
    let searches = results
        .get("trending_searches")?
        .get(0)?
        .get("searches")?
        .as_array()?;
    Some(
        searches
            .iter()
            .filter_map(|s| s.get("query")?.as_str().map(str::to_string))
            .take(TREND_COUNT)
            .collect(),
    )
}

/// `news_results[..3].title`
pub fn extract_headlines(results: &Value) -> Option<Vec<String>> {
    let news = results.get("news_results")?.as_array()?;
    Some(
        news.iter()
            .filter_map(|n| n.get("title")?.as_str().map(str::to_string))
            .take(HEADLINE_COUNT)
            .collect(),
    )
}

pub async fn trending(session: &mut dyn Session, http: &reqwest::Client, api_key: &str) -> Result<()> {
    session.say("Let me see what's trending on Google.").await;

    match serpapi(http, api_key, &[("q", "trending searches")]).await {
        Ok(results) => match extract_trends(&results) {
            Some(trends) if !trends.is_empty() => {
                session.say("Here are some of the top trends:").await;
                for trend in trends {
                    session.say(&trend).await;
                }
            }
            _ => {
                session
                    .say("I couldn't fetch the trending searches right now.")
                    .await
            }
        },
        Err(e) => {
            warn!("Trending search error: {:#}", e);
            session.say("Sorry, I had trouble getting the trends.").await;
        }
    }
    Ok(())
}

pub async fn news(session: &mut dyn Session, http: &reqwest::Client, api_key: &str) -> Result<()> {
    session.say("Fetching the latest news headlines.").await;

    match serpapi(http, api_key, &[("q", "top news headlines"), ("tbm", "nws")]).await {
        Ok(results) => match extract_headlines(&results) {
            Some(headlines) if !headlines.is_empty() => {
                for headline in headlines {
                    session.say(&headline).await;
                }
            }
            _ => session.say("I couldn't fetch the news right now.").await,
        },
        Err(e) => {
            warn!("News error: {:#}", e);
            session.say("Sorry, I had trouble getting the news.").await;
        }
    }
    Ok(())
}

/// First `max` characters followed by an ellipsis
pub fn truncate_summary(text: &str, max: usize) -> String {
    let head: String = text.chars().take(max).collect();
    format!("{}...", head)
}

fn wikipedia_title(topic: &str) -> String {
    urlencoding::encode(&topic.replace(' ', "_")).into_owned()
}

/// Plain-text summary of the page, `None` when it does not exist
async fn wikipedia_summary(http: &reqwest::Client, topic: &str) -> Result<Option<String>> {
    let url = format!("{}/{}", WIKIPEDIA_SUMMARY_URL, wikipedia_title(topic));
    let response = http.get(&url).send().await?;
    if response.status() == reqwest::StatusCode::NOT_FOUND {
        return Ok(None);
    }

    let page: Value = response.error_for_status()?.json().await?;
    Ok(page
        .get("extract")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string))
}

pub async fn wikipedia(session: &mut dyn Session, http: &reqwest::Client, topic: &str) -> Result<()> {
    if topic.is_empty() {
        session.say("What should I look up on Wikipedia?").await;
        return Ok(());
    }

    session
        .say(&format!("Getting a summary about {} from Wikipedia.", topic))
        .await;

    match wikipedia_summary(http, topic).await {
        Ok(Some(summary)) => session.say(&truncate_summary(&summary, SUMMARY_CHARS)).await,
        Ok(None) => {
            session
                .say(&format!("I couldn't find a Wikipedia page for {}.", topic))
                .await
        }
        Err(e) => {
            warn!("Wikipedia error: {:#}", e);
            session.say("Sorry, I had trouble with Wikipedia.").await;
        }
    }
    Ok(())
}

pub async fn qr_code(
    session: &mut dyn Session,
    http: &reqwest::Client,
    data: &str,
    out_dir: &Path,
) -> Result<()> {
    if data.is_empty() {
        session.say("Tell me what the QR code should contain.").await;
        return Ok(());
    }

    session.say("Generating a QR code.").await;

    let result = async {
        let image = http
            .get(QR_URL)
            .query(&[("size", "300x300"), ("data", data)])
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        std::fs::create_dir_all(out_dir)?;
        let path = out_dir.join("qrcode.png");
        std::fs::write(&path, &image).with_context(|| format!("Failed to write {:?}", path))?;
        info!("🔳 QR code saved to {:?}", path);
        open_target(&path.to_string_lossy())
    }
    .await;

    match result {
        Ok(()) => {
            session
                .say("I've created the QR code and opened it for you.")
                .await
        }
        Err(e) => {
            warn!("QR code error: {:#}", e);
            session.say("I couldn't create the QR code.").await;
        }
    }
    Ok(())
}

/// Throughput in Mbit/s
pub fn megabits_per_second(bytes: usize, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return 0.0;
    }
    bytes as f64 * 8.0 / secs / 1_000_000.0
}

async fn measure_speed(http: &reqwest::Client) -> Result<(f64, f64)> {
    let started = Instant::now();
    let body = http
        .get(SPEED_DOWN_URL)
        .query(&[("bytes", DOWNLOAD_BYTES.to_string())])
        .send()
        .await?
        .error_for_status()?
        .bytes()
        .await?;
    let download = megabits_per_second(body.len(), started.elapsed());
    debug!("Downloaded {} bytes", body.len());

    let payload = vec![0u8; UPLOAD_BYTES];
    let started = Instant::now();
    http.post(SPEED_UP_URL)
        .body(payload)
        .send()
        .await?
        .error_for_status()?;
    let upload = megabits_per_second(UPLOAD_BYTES, started.elapsed());

    Ok((download, upload))
}

pub async fn internet_speed(session: &mut dyn Session, http: &reqwest::Client) -> Result<()> {
    session
        .say("Testing your internet speed. This might take a moment.")
        .await;

    match measure_speed(http).await {
        Ok((download, upload)) => {
            session
                .say(&format!(
                    "Your download speed is approximately {:.2} megabits per second, \
                     and your upload speed is {:.2} megabits per second.",
                    download, upload
                ))
                .await
        }
        Err(e) => {
            warn!("Speedtest error: {:#}", e);
            session
                .say("I'm sorry, I couldn't measure your internet speed.")
                .await;
        }
    }
    Ok(())
}

pub fn search_url(query: &str) -> String {
    format!("https://www.google.com/search?q={}", urlencoding::encode(query))
}

pub fn youtube_url(query: &str) -> String {
    format!(
        "https://www.youtube.com/results?search_query={}",
        urlencoding::encode(query)
    )
}

pub async fn search(session: &mut dyn Session, query: &str) -> Result<()> {
    session
        .say(&format!("Here's what I found for {}.", query))
        .await;
    open_target(&search_url(query))
}

pub async fn play_youtube(session: &mut dyn Session, query: &str) -> Result<()> {
    session
        .say(&format!("Playing {} on YouTube.", query))
        .await;
    open_target(&youtube_url(query))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::testing::ScriptedSession;
    use serde_json::json;

    #[test]
    fn test_extract_trends() {
        let results = json!({
            "trending_searches": [{
                "searches": [
                    {"query": "a"}, {"query": "b"}, {"query": "c"},
                    {"query": "d"}, {"query": "e"}, {"query": "f"}
                ]
            }]
        });
        assert_eq!(
            extract_trends(&results),
            Some(
                ["a", "b", "c", "d", "e"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect::<Vec<_>>()
            )
        );
        assert_eq!(extract_trends(&json!({"error": "bad key"})), None);
    }

    #[test]
    fn test_extract_headlines() {
        let results = json!({
            "news_results": [
                {"title": "One"}, {"title": "Two"}, {"link": "no title"},
                {"title": "Three"}, {"title": "Four"}
            ]
        });
        assert_eq!(
            extract_headlines(&results),
            Some(vec!["One".to_string(), "Two".to_string(), "Three".to_string()])
        );
    }

    #[test]
    fn test_truncate_summary() {
        assert_eq!(truncate_summary("short", 500), "short...");
        let long = "x".repeat(600);
        assert_eq!(truncate_summary(&long, 500).len(), 503);
    }

    #[test]
    fn test_urls() {
        assert_eq!(wikipedia_title("alan turing"), "alan_turing");
        assert_eq!(
            search_url("rust & tokio"),
            "https://www.google.com/search?q=rust%20%26%20tokio"
        );
        assert_eq!(
            youtube_url("lo fi"),
            "https://www.youtube.com/results?search_query=lo%20fi"
        );
    }

    #[test]
    fn test_megabits_per_second() {
        let mbps = megabits_per_second(1_000_000, Duration::from_secs(1));
        assert!((mbps - 8.0).abs() < 1e-9);
        assert_eq!(megabits_per_second(1, Duration::ZERO), 0.0);
    }

    #[tokio::test]
    async fn test_news_without_key_apologizes() {
        let mut session = ScriptedSession::default();
        news(&mut session, &reqwest::Client::new(), "").await.unwrap();
        assert_eq!(
            session.said,
            vec![
                "Fetching the latest news headlines.",
                "Sorry, I had trouble getting the news.",
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_qr_payload() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = ScriptedSession::default();
        qr_code(&mut session, &reqwest::Client::new(), "", dir.path())
            .await
            .unwrap();
        assert_eq!(session.said, vec!["Tell me what the QR code should contain."]);
    }
}
