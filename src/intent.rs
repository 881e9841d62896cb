//! Intent matching
//!
//! An ordered rule table maps a normalized utterance to exactly one intent.
//! Order is significant: the first rule whose trigger matches wins, even when
//! a later rule would match a longer phrase. Matching is pure and does no I/O.

use std::fmt;

/// Words that turn a "what is" question into arithmetic
pub const ARITHMETIC_WORDS: &[&str] = &["times", "plus", "minus", "divided by"];

/// Utterances shorter than this containing "stop" cancel instead of dispatching
pub const CANCEL_MAX_LEN: usize = 6;

/// Normalized transcript of one listening window (lowercase, trimmed,
/// single-spaced). May be empty.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Utterance(String);

impl Utterance {
    pub fn new(raw: &str) -> Self {
        Self(
            raw.split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
                .to_lowercase(),
        )
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Length in characters
    pub fn len(&self) -> usize {
        self.0.chars().count()
    }

    pub fn contains(&self, phrase: &str) -> bool {
        self.0.contains(phrase)
    }
}

impl fmt::Display for Utterance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Utterance {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Named categories of request, one handler each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    GoodMorning,
    TrendingSearches,
    SendEmail,
    GeneratePassword,
    QrCode,
    SetTimer,
    AddNote,
    ReadNotes,
    InternetSpeed,
    PcSpecs,
    MoveMouse,
    SetVolume,
    Dictation,
    OpenFolder,
    LockScreen,
    ShutdownComputer,
    RestartComputer,
    Calculate,
    CurrentTime,
    MovieInfo,
    Wikipedia,
    DefineWord,
    WebSearch,
    News,
    Quote,
    Joke,
    PlayYoutube,
    OpenWhatsapp,
    OpenBrowser,
    Exit,
}

impl Intent {
    pub fn name(self) -> &'static str {
        match self {
            Intent::GoodMorning => "good_morning",
            Intent::TrendingSearches => "trending_searches",
            Intent::SendEmail => "send_email",
            Intent::GeneratePassword => "generate_password",
            Intent::QrCode => "qr_code",
            Intent::SetTimer => "set_timer",
            Intent::AddNote => "add_note",
            Intent::ReadNotes => "read_notes",
            Intent::InternetSpeed => "internet_speed",
            Intent::PcSpecs => "pc_specs",
            Intent::MoveMouse => "move_mouse",
            Intent::SetVolume => "set_volume",
            Intent::Dictation => "dictation",
            Intent::OpenFolder => "open_folder",
            Intent::LockScreen => "lock_screen",
            Intent::ShutdownComputer => "shutdown_computer",
            Intent::RestartComputer => "restart_computer",
            Intent::Calculate => "calculate",
            Intent::CurrentTime => "current_time",
            Intent::MovieInfo => "movie_info",
            Intent::Wikipedia => "wikipedia",
            Intent::DefineWord => "define_word",
            Intent::WebSearch => "web_search",
            Intent::News => "news",
            Intent::Quote => "quote",
            Intent::Joke => "joke",
            Intent::PlayYoutube => "play_youtube",
            Intent::OpenWhatsapp => "open_whatsapp",
            Intent::OpenBrowser => "open_browser",
            Intent::Exit => "exit",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Substring predicate over an utterance
#[derive(Debug)]
pub enum Trigger {
    /// At least one phrase is present
    Any(&'static [&'static str]),
    /// Every phrase is present
    All(&'static [&'static str]),
    /// `phrase` is present together with at least one qualifier
    With {
        phrase: &'static str,
        qualifiers: &'static [&'static str],
    },
    /// At least one nested trigger matches
    Either(&'static [Trigger]),
}

impl Trigger {
    pub fn matches(&self, text: &str) -> bool {
        match self {
            Trigger::Any(phrases) => phrases.iter().any(|p| text.contains(p)),
            Trigger::All(phrases) => phrases.iter().all(|p| text.contains(p)),
            Trigger::With { phrase, qualifiers } => {
                text.contains(phrase) && qualifiers.iter().any(|q| text.contains(q))
            }
            Trigger::Either(triggers) => triggers.iter().any(|t| t.matches(text)),
        }
    }
}

/// How the handler argument is derived from the utterance
#[derive(Debug)]
pub enum Argument {
    /// Handler takes no argument
    None,
    /// Handler parses the whole utterance itself
    Utterance,
    /// Remove every occurrence of each phrase, in order, then collapse whitespace
    Strip(&'static [&'static str]),
}

impl Argument {
    pub fn extract(&self, text: &str) -> Option<String> {
        let value = match self {
            Argument::None => return None,
            Argument::Utterance => text.trim().to_string(),
            Argument::Strip(phrases) => {
                let rest = phrases
                    .iter()
                    .fold(text.to_string(), |rest, phrase| rest.replace(phrase, " "));
                rest.split_whitespace().collect::<Vec<_>>().join(" ")
            }
        };
        (!value.is_empty()).then_some(value)
    }
}

/// One entry of the rule table
#[derive(Debug)]
pub struct IntentRule {
    pub intent: Intent,
    pub trigger: Trigger,
    pub argument: Argument,
}

/// The rule table, evaluated top to bottom
pub static RULES: &[IntentRule] = &[
    // Daily routines & productivity
    IntentRule {
        intent: Intent::GoodMorning,
        trigger: Trigger::Any(&["good morning"]),
        argument: Argument::None,
    },
    IntentRule {
        intent: Intent::TrendingSearches,
        trigger: Trigger::Any(&["trending"]),
        argument: Argument::None,
    },
    IntentRule {
        intent: Intent::SendEmail,
        trigger: Trigger::Any(&["send an email"]),
        argument: Argument::None,
    },
    IntentRule {
        intent: Intent::GeneratePassword,
        trigger: Trigger::Any(&["generate a secure password"]),
        argument: Argument::None,
    },
    IntentRule {
        intent: Intent::QrCode,
        trigger: Trigger::Any(&["make a qr code"]),
        argument: Argument::Strip(&["make a qr code for"]),
    },
    IntentRule {
        intent: Intent::SetTimer,
        trigger: Trigger::Any(&["set a timer"]),
        argument: Argument::Utterance,
    },
    IntentRule {
        intent: Intent::AddNote,
        trigger: Trigger::Any(&["add to my notes", "take a note"]),
        argument: Argument::None,
    },
    IntentRule {
        intent: Intent::ReadNotes,
        trigger: Trigger::Any(&["read my notes"]),
        argument: Argument::None,
    },
    // System & PC control
    IntentRule {
        intent: Intent::InternetSpeed,
        trigger: Trigger::Any(&["internet speed"]),
        argument: Argument::None,
    },
    IntentRule {
        intent: Intent::PcSpecs,
        trigger: Trigger::Any(&["computer specs", "about this computer"]),
        argument: Argument::None,
    },
    IntentRule {
        intent: Intent::MoveMouse,
        trigger: Trigger::Any(&["move the mouse"]),
        argument: Argument::Strip(&["move the mouse to the"]),
    },
    IntentRule {
        intent: Intent::SetVolume,
        trigger: Trigger::Any(&["set volume", "mute volume"]),
        argument: Argument::Utterance,
    },
    IntentRule {
        intent: Intent::Dictation,
        trigger: Trigger::Any(&["start typing"]),
        argument: Argument::None,
    },
    IntentRule {
        intent: Intent::OpenFolder,
        trigger: Trigger::All(&["open my", "folder"]),
        argument: Argument::Strip(&["open my"]),
    },
    IntentRule {
        intent: Intent::LockScreen,
        trigger: Trigger::Any(&["lock the screen", "lock computer"]),
        argument: Argument::None,
    },
    IntentRule {
        intent: Intent::ShutdownComputer,
        trigger: Trigger::Any(&["shut down the computer"]),
        argument: Argument::None,
    },
    IntentRule {
        intent: Intent::RestartComputer,
        trigger: Trigger::Any(&["restart the computer"]),
        argument: Argument::None,
    },
    // Information & search. Arithmetic must precede the knowledge rules.
    IntentRule {
        intent: Intent::Calculate,
        trigger: Trigger::Either(&[
            Trigger::Any(&["calculate"]),
            Trigger::With {
                phrase: "what is",
                qualifiers: ARITHMETIC_WORDS,
            },
        ]),
        argument: Argument::Strip(&["what is", "calculate"]),
    },
    IntentRule {
        intent: Intent::CurrentTime,
        trigger: Trigger::Any(&["what time is it"]),
        argument: Argument::None,
    },
    IntentRule {
        intent: Intent::MovieInfo,
        trigger: Trigger::Any(&["tell me about the movie"]),
        argument: Argument::Strip(&["tell me about the movie"]),
    },
    IntentRule {
        intent: Intent::Wikipedia,
        trigger: Trigger::Any(&["wikipedia"]),
        argument: Argument::Strip(&["wikipedia", "tell me about"]),
    },
    IntentRule {
        intent: Intent::DefineWord,
        trigger: Trigger::Any(&["define the word"]),
        argument: Argument::Strip(&["define the word"]),
    },
    IntentRule {
        intent: Intent::WebSearch,
        trigger: Trigger::Any(&["search for"]),
        argument: Argument::Strip(&["search for"]),
    },
    IntentRule {
        intent: Intent::News,
        trigger: Trigger::Any(&["news", "headlines"]),
        argument: Argument::None,
    },
    IntentRule {
        intent: Intent::Quote,
        trigger: Trigger::Any(&["give me a quote"]),
        argument: Argument::None,
    },
    // Fun & media
    IntentRule {
        intent: Intent::Joke,
        trigger: Trigger::Any(&["tell me a joke"]),
        argument: Argument::None,
    },
    IntentRule {
        intent: Intent::PlayYoutube,
        trigger: Trigger::All(&["play", "on youtube"]),
        argument: Argument::Strip(&["on youtube", "play"]),
    },
    IntentRule {
        intent: Intent::OpenWhatsapp,
        trigger: Trigger::Any(&["open whatsapp"]),
        argument: Argument::None,
    },
    IntentRule {
        intent: Intent::OpenBrowser,
        trigger: Trigger::Any(&["open browser", "open chrome"]),
        argument: Argument::None,
    },
    // Assistant control
    IntentRule {
        intent: Intent::Exit,
        trigger: Trigger::Any(&["stop jarvis", "stop optus", "exit program"]),
        argument: Argument::None,
    },
];

/// Result of matching one utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Matched {
        intent: Intent,
        argument: Option<String>,
    },
    /// No rule matched; routed to the general knowledge handler
    Fallback,
}

impl DispatchOutcome {
    pub fn intent(&self) -> Option<Intent> {
        match self {
            DispatchOutcome::Matched { intent, .. } => Some(*intent),
            DispatchOutcome::Fallback => None,
        }
    }
}

/// First-match-wins traversal of the rule table
#[derive(Debug, Clone, Copy)]
pub struct IntentMatcher {
    rules: &'static [IntentRule],
}

impl Default for IntentMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl IntentMatcher {
    pub fn new() -> Self {
        Self { rules: RULES }
    }

    pub fn rules(&self) -> &'static [IntentRule] {
        self.rules
    }

    /// Select the intent of the earliest matching rule
    pub fn match_utterance(&self, utterance: &Utterance) -> DispatchOutcome {
        let text = utterance.as_str();
        self.rules
            .iter()
            .find(|rule| rule.trigger.matches(text))
            .map(|rule| DispatchOutcome::Matched {
                intent: rule.intent,
                argument: rule.argument.extract(text),
            })
            .unwrap_or(DispatchOutcome::Fallback)
    }

    /// Every intent whose trigger matches, in table order
    pub fn candidates(&self, utterance: &Utterance) -> Vec<Intent> {
        self.rules
            .iter()
            .filter(|rule| rule.trigger.matches(utterance.as_str()))
            .map(|rule| rule.intent)
            .collect()
    }
}

/// Short "wait"/"stop" utterances acknowledge and return to idle
pub fn is_cancellation(utterance: &Utterance) -> bool {
    utterance.contains("wait") || (utterance.contains("stop") && utterance.len() < CANCEL_MAX_LEN)
}
