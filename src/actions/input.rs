//! Input simulation
//!
//! Dictation types through a uinput virtual keyboard (evdev), which works on
//! both X11 and Wayland. Mouse placement goes through rdev.

use crate::listening::{apology_for, Session};
use anyhow::{Context, Result};
use evdev::{uinput::VirtualDeviceBuilder, AttributeSet, Key};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

const STOP_PHRASE: &str = "stop typing";

/// Consecutive failed captures that end dictation
const MAX_MISSES: usize = 3;

const LETTERS: [Key; 26] = [
    Key::KEY_A,
    Key::KEY_B,
    Key::KEY_C,
    Key::KEY_D,
    Key::KEY_E,
    Key::KEY_F,
    Key::KEY_G,
    Key::KEY_H,
    Key::KEY_I,
    Key::KEY_J,
    Key::KEY_K,
    Key::KEY_L,
    Key::KEY_M,
    Key::KEY_N,
    Key::KEY_O,
    Key::KEY_P,
    Key::KEY_Q,
    Key::KEY_R,
    Key::KEY_S,
    Key::KEY_T,
    Key::KEY_U,
    Key::KEY_V,
    Key::KEY_W,
    Key::KEY_X,
    Key::KEY_Y,
    Key::KEY_Z,
];

const DIGITS: [Key; 10] = [
    Key::KEY_0,
    Key::KEY_1,
    Key::KEY_2,
    Key::KEY_3,
    Key::KEY_4,
    Key::KEY_5,
    Key::KEY_6,
    Key::KEY_7,
    Key::KEY_8,
    Key::KEY_9,
];

/// Key and shift state producing `c` on a US layout
pub fn key_for_char(c: char) -> Option<(Key, bool)> {
    match c {
        'a'..='z' => Some((LETTERS[(c as u8 - b'a') as usize], false)),
        'A'..='Z' => Some((LETTERS[(c as u8 - b'A') as usize], true)),
        '0'..='9' => Some((DIGITS[(c as u8 - b'0') as usize], false)),
        ' ' => Some((Key::KEY_SPACE, false)),
        '\n' => Some((Key::KEY_ENTER, false)),
        '.' => Some((Key::KEY_DOT, false)),
        ',' => Some((Key::KEY_COMMA, false)),
        '\'' => Some((Key::KEY_APOSTROPHE, false)),
        '-' => Some((Key::KEY_MINUS, false)),
        '/' => Some((Key::KEY_SLASH, false)),
        '?' => Some((Key::KEY_SLASH, true)),
        '!' => Some((Key::KEY_1, true)),
        _ => None,
    }
}

/// Something dictated text can be typed into
pub trait Typist: Send {
    fn type_text(&mut self, text: &str) -> Result<()>;
}

/// Virtual keyboard for typing dictated text
pub struct VirtualKeyboard {
    device: evdev::uinput::VirtualDevice,
}

impl VirtualKeyboard {
    pub fn new() -> Result<Self> {
        let mut keys = AttributeSet::<Key>::new();
        for key in LETTERS.iter().chain(DIGITS.iter()) {
            keys.insert(*key);
        }
        for key in [
            Key::KEY_LEFTSHIFT,
            Key::KEY_SPACE,
            Key::KEY_ENTER,
            Key::KEY_DOT,
            Key::KEY_COMMA,
            Key::KEY_APOSTROPHE,
            Key::KEY_MINUS,
            Key::KEY_SLASH,
        ] {
            keys.insert(key);
        }

        let device = VirtualDeviceBuilder::new()?
            .name("Optus Virtual Keyboard")
            .with_keys(&keys)?
            .build()
            .context("Failed to create virtual keyboard")?;

        info!("⌨️ Virtual keyboard created");
        Ok(Self { device })
    }

    fn emit(&mut self, key: Key, value: i32) -> Result<()> {
        self.device.emit(&[evdev::InputEvent::new(
            evdev::EventType::KEY,
            key.code(),
            value,
        )])?;
        Ok(())
    }

    /// Press and release a single key, optionally with shift held
    pub fn tap_key(&mut self, key: Key, shift: bool) -> Result<()> {
        if shift {
            self.emit(Key::KEY_LEFTSHIFT, 1)?;
            thread::sleep(Duration::from_millis(5));
        }
        self.emit(key, 1)?;
        thread::sleep(Duration::from_millis(10));
        self.emit(key, 0)?;
        if shift {
            thread::sleep(Duration::from_millis(5));
            self.emit(Key::KEY_LEFTSHIFT, 0)?;
        }
        Ok(())
    }
}

impl Typist for VirtualKeyboard {
    fn type_text(&mut self, text: &str) -> Result<()> {
        for c in text.chars() {
            match key_for_char(c) {
                Some((key, shift)) => self.tap_key(key, shift)?,
                None => debug!("No key for {:?}, skipping", c),
            }
        }
        Ok(())
    }
}

/// Type every captured phrase until the stop phrase is heard
pub async fn run_dictation(session: &mut dyn Session, typist: &mut dyn Typist) -> Result<()> {
    session
        .say("I'm ready to type. Say 'stop typing' to finish.")
        .await;

    let mut misses = 0;
    loop {
        match session.listen().await {
            Ok(text) if text.contains(STOP_PHRASE) => break,
            Ok(text) if text.is_empty() => {}
            Ok(text) => {
                misses = 0;
                typist.type_text(&format!("{} ", text))?;
            }
            Err(e) => {
                session.say(apology_for(&e)).await;
                misses += 1;
                if misses >= MAX_MISSES {
                    warn!("Ending dictation after {} failed captures", misses);
                    break;
                }
            }
        }
    }

    session.say("Dictation finished.").await;
    Ok(())
}

pub async fn dictation(session: &mut dyn Session) -> Result<()> {
    let mut keyboard = VirtualKeyboard::new()?;
    run_dictation(session, &mut keyboard).await
}

/// Screen position for a spoken location
pub fn mouse_target(location: &str, width: f64, height: f64) -> Option<(f64, f64)> {
    match location {
        "top left" => Some((0.0, 0.0)),
        "top right" => Some((width - 1.0, 0.0)),
        "bottom left" => Some((0.0, height - 1.0)),
        "bottom right" => Some((width - 1.0, height - 1.0)),
        "center" | "centre" | "middle" => Some((width / 2.0, height / 2.0)),
        _ => None,
    }
}

pub async fn move_mouse(session: &mut dyn Session, location: &str) -> Result<()> {
    let (width, height) =
        rdev::display_size().map_err(|e| anyhow::anyhow!("Display size unavailable: {:?}", e))?;

    let Some((x, y)) = mouse_target(location, width as f64, height as f64) else {
        session.say("I don't know that location for the mouse.").await;
        return Ok(());
    };

    session
        .say(&format!("Moving mouse to the {}.", location))
        .await;
    rdev::simulate(&rdev::EventType::MouseMove { x, y })
        .map_err(|e| anyhow::anyhow!("Mouse move failed: {:?}", e))?;
    Ok(())
}
