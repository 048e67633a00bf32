//! Converse Common - Shared configuration, errors, and logging.
//!
//! This crate provides:
//! - Environment-sourced configuration, validated once at startup
//! - The startup error type
//! - Logging setup with noise filtering
//! - Small utilities (URL version stripping, log sanitizing)

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod logging;
pub mod util;

pub use config::{
    AssistantConfig, Config, ObservabilityConfig, RecordingConfig, RecordingMode, RemoteConfig,
    ServerConfig, SpeechToTextConfig, TextToSpeechConfig,
};
pub use error::{Error, Result};
