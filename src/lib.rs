//! Optus Library
//!
//! Core modules for the Optus wake-word voice assistant.

pub mod actions;
pub mod asr;
pub mod audio;
pub mod config;
pub mod error;
pub mod intent;
pub mod listening;
pub mod tts;
pub mod wake;
