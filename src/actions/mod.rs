//! Actions
//!
//! One handler per intent. Handlers talk to the user only through the
//! `Session` and report failure by returning an error; the listening loop
//! decides what the user hears when that happens.

pub mod calc;
pub mod fun;
pub mod input;
pub mod knowledge;
pub mod notes;
pub mod system;
pub mod timer;
pub mod web;

use crate::config::{data_dir, Config};
use crate::error::{OptusError, OptusResult};
use crate::intent::{DispatchOutcome, Intent, Utterance};
use crate::listening::{apology_for, Session};
use crate::tts::Speaker;
use anyhow::{Context, Result};
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use self::knowledge::KnowledgeClient;
use self::timer::TimerSet;

/// Maps a dispatch outcome to a side-effecting handler
#[async_trait]
pub trait ActionRegistry: Send {
    /// Run the handler for `outcome`. The loop only looks at whether this failed.
    async fn execute(
        &mut self,
        outcome: &DispatchOutcome,
        utterance: &Utterance,
        session: &mut dyn Session,
    ) -> OptusResult<()>;

    /// Cancel outstanding background work
    async fn shutdown(&mut self) {}
}

/// The default registry: every desktop action
pub struct Actions {
    config: Config,
    http: reqwest::Client,
    knowledge: KnowledgeClient,
    timers: TimerSet,
    speaker: Speaker,
}

impl Actions {
    pub fn new(config: &Config, speaker: Speaker) -> OptusResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("optus/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| OptusError::Initialization(format!("HTTP client: {}", e)))?;

        let knowledge = KnowledgeClient::new(
            http.clone(),
            &config.deepseek_url,
            &config.deepseek_model,
            &config.deepseek_api_key,
        );
        if !knowledge.is_online() {
            warn!("⚠️ No DeepSeek API key configured; knowledge questions are offline");
        }

        Ok(Self {
            config: config.clone(),
            http,
            knowledge,
            timers: TimerSet::new(),
            speaker,
        })
    }

    fn notes_path(&self) -> PathBuf {
        PathBuf::from(&self.config.notes_file)
    }

    async fn run(
        &mut self,
        intent: Intent,
        argument: &str,
        session: &mut dyn Session,
    ) -> Result<()> {
        match intent {
            // Daily routines & productivity
            Intent::GoodMorning => fun::good_morning(session).await,
            Intent::TrendingSearches => {
                web::trending(session, &self.http, &self.config.serp_api_key).await
            }
            Intent::SendEmail => system::send_email(session).await,
            Intent::GeneratePassword => fun::generate_password(session).await,
            Intent::QrCode => web::qr_code(session, &self.http, argument, &data_dir()).await,
            Intent::SetTimer => {
                timer::set_timer(session, &mut self.timers, &self.speaker, argument).await
            }
            Intent::AddNote => notes::add_note(session, &self.notes_path()).await,
            Intent::ReadNotes => notes::read_notes(session, &self.notes_path()).await,

            // System & PC control
            Intent::InternetSpeed => web::internet_speed(session, &self.http).await,
            Intent::PcSpecs => system::pc_specs(session).await,
            Intent::MoveMouse => input::move_mouse(session, argument).await,
            Intent::SetVolume => system::set_volume(session, argument).await,
            Intent::Dictation => input::dictation(session).await,
            Intent::OpenFolder => system::open_folder(session, argument).await,
            Intent::LockScreen => system::lock_screen(session).await,
            Intent::ShutdownComputer => system::power(session, system::PowerAction::Shutdown).await,
            Intent::RestartComputer => system::power(session, system::PowerAction::Restart).await,

            // Information & search
            Intent::Calculate => calc::calculate(session, argument).await,
            Intent::CurrentTime => fun::current_time(session).await,
            Intent::MovieInfo => {
                let prompt = knowledge::movie_prompt(argument);
                self.knowledge.answer(session, &prompt).await
            }
            Intent::Wikipedia => web::wikipedia(session, &self.http, argument).await,
            Intent::DefineWord => {
                let prompt = knowledge::define_prompt(argument);
                self.knowledge.answer(session, &prompt).await
            }
            Intent::WebSearch => web::search(session, argument).await,
            Intent::News => web::news(session, &self.http, &self.config.serp_api_key).await,
            Intent::Quote => self.knowledge.answer(session, knowledge::QUOTE_PROMPT).await,

            // Fun & media
            Intent::Joke => fun::joke(session).await,
            Intent::PlayYoutube => web::play_youtube(session, argument).await,
            Intent::OpenWhatsapp => system::open_whatsapp(session).await,
            Intent::OpenBrowser => system::open_browser(session).await,

            Intent::Exit => {
                debug!("Exit is handled by the listening loop");
                Ok(())
            }
        }
    }
}

#[async_trait]
impl ActionRegistry for Actions {
    async fn execute(
        &mut self,
        outcome: &DispatchOutcome,
        utterance: &Utterance,
        session: &mut dyn Session,
    ) -> OptusResult<()> {
        let result = match outcome {
            DispatchOutcome::Matched { intent, argument } => {
                self.run(*intent, argument.as_deref().unwrap_or(""), session)
                    .await
            }
            DispatchOutcome::Fallback => self.knowledge.answer(session, utterance.as_str()).await,
        };
        result.map_err(|e| OptusError::Action(format!("{:#}", e)))
    }

    async fn shutdown(&mut self) {
        let cancelled = self.timers.cancel_all();
        if cancelled > 0 {
            info!("⏱️ Cancelled {} pending timer(s)", cancelled);
        }
    }
}

/// Secondary capture for actions. Failures are apologized for and yield `None`.
pub async fn listen_or_apologize(session: &mut dyn Session) -> Option<Utterance> {
    match session.listen().await {
        Ok(utterance) if !utterance.is_empty() => Some(utterance),
        Ok(_) => None,
        Err(e) => {
            debug!("Secondary capture failed: {}", e);
            session.say(apology_for(&e)).await;
            None
        }
    }
}

lazy_static! {
    static ref FIRST_NUMBER: Regex = Regex::new(r"\d+").expect("valid number pattern");
}

/// First run of digits in `text`
pub fn first_number(text: &str) -> Option<u64> {
    FIRST_NUMBER.find(text)?.as_str().parse().ok()
}

/// Hand a path or URL to the desktop's default handler
pub fn open_target(target: &str) -> Result<()> {
    debug!("Opening {}", target);
    std::process::Command::new("xdg-open")
        .arg(target)
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .with_context(|| format!("Failed to open {}", target))?;
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedSession;
    use super::*;
    use crate::error::TranscriptionError;

    #[test]
    fn test_first_number() {
        assert_eq!(first_number("set volume to 40 percent"), Some(40));
        assert_eq!(first_number("set a timer for 5 or 6 minutes"), Some(5));
        assert_eq!(first_number("mute volume"), None);
    }

    #[tokio::test]
    async fn test_listen_or_apologize() {
        let mut session = ScriptedSession::hearing(&["buy milk"]);
        session
            .heard
            .push_back(Err(TranscriptionError::ServiceUnavailable("down".into()).into()));

        let first = listen_or_apologize(&mut session).await;
        assert_eq!(first.map(|u| u.to_string()), Some("buy milk".to_string()));

        assert!(listen_or_apologize(&mut session).await.is_none());
        assert_eq!(session.said, vec!["Sorry, my speech service is down."]);
    }

    #[tokio::test]
    async fn test_registry_runs_calculation() {
        let config = Config::default();
        let mut actions = Actions::new(&config, Speaker::new("Optus", None)).unwrap();
        let mut session = ScriptedSession::default();

        let outcome = DispatchOutcome::Matched {
            intent: Intent::Calculate,
            argument: Some("12 plus 7".to_string()),
        };
        actions
            .execute(&outcome, &Utterance::new("what is 12 plus 7"), &mut session)
            .await
            .unwrap();

        assert_eq!(session.said, vec!["The answer is 19"]);
    }

    #[tokio::test]
    async fn test_handler_failure_is_action_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            // A directory cannot be read as the notes file
            notes_file: dir.path().to_string_lossy().to_string(),
            ..Config::default()
        };
        let mut actions = Actions::new(&config, Speaker::new("Optus", None)).unwrap();
        let mut session = ScriptedSession::default();

        let outcome = DispatchOutcome::Matched {
            intent: Intent::ReadNotes,
            argument: None,
        };
        let err = actions
            .execute(&outcome, &Utterance::new("read my notes"), &mut session)
            .await
            .unwrap_err();

        assert!(matches!(err, OptusError::Action(_)));
        assert!(err.to_string().contains("Failed to read notes file"));
    }

    #[tokio::test]
    async fn test_fallback_without_key_is_offline() {
        let config = Config {
            deepseek_api_key: String::new(),
            ..Config::default()
        };
        let mut actions = Actions::new(&config, Speaker::new("Optus", None)).unwrap();
        let mut session = ScriptedSession::default();

        actions
            .execute(
                &DispatchOutcome::Fallback,
                &Utterance::new("how tall is mount everest"),
                &mut session,
            )
            .await
            .unwrap();

        assert_eq!(session.said, vec![knowledge::OFFLINE_MESSAGE]);
    }
}
