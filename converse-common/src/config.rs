//! Configuration for the Converse gateway.
//!
//! All settings come from the process environment (optionally seeded from a
//! `.env` file). The whole structure is read and validated once, before any
//! component is built, and then handed to each constructor.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::util::strip_version_suffix;

// ============================================================================
// Environment keys
// ============================================================================

pub const ASSISTANT_APIKEY: &str = "ASSISTANT_APIKEY";
pub const ASSISTANT_URL: &str = "ASSISTANT_URL";
pub const ASSISTANT_ID: &str = "ASSISTANT_ID";
pub const ASSISTANT_VERSION: &str = "ASSISTANT_VERSION";
pub const ASSISTANT_TIMEOUT: &str = "ASSISTANT_TIMEOUT";
pub const ASSISTANT_RECORD: &str = "ASSISTANT_RECORD";
pub const ASSISTANT_RECORD_FILE: &str = "ASSISTANT_RECORD_FILE";
pub const SPEECH_TO_TEXT_APIKEY: &str = "SPEECH_TO_TEXT_APIKEY";
pub const SPEECH_TO_TEXT_URL: &str = "SPEECH_TO_TEXT_URL";
pub const SPEECH_TO_TEXT_MODEL: &str = "SPEECH_TO_TEXT_MODEL";
pub const TEXT_TO_SPEECH_APIKEY: &str = "TEXT_TO_SPEECH_APIKEY";
pub const TEXT_TO_SPEECH_URL: &str = "TEXT_TO_SPEECH_URL";
pub const TEXT_TO_SPEECH_VOICE: &str = "TEXT_TO_SPEECH_VOICE";
pub const IAM_URL: &str = "IAM_URL";
pub const REMOTE_TIMEOUT_SECS: &str = "REMOTE_TIMEOUT_SECS";
pub const PORT: &str = "PORT";
pub const VCAP_APP_PORT: &str = "VCAP_APP_PORT";
pub const CONVERSE_HOST: &str = "CONVERSE_HOST";
pub const CONVERSE_LOG_LEVEL: &str = "CONVERSE_LOG_LEVEL";
pub const CONVERSE_LOG_FORMAT: &str = "CONVERSE_LOG_FORMAT";

// ============================================================================
// Defaults
// ============================================================================

fn default_session_timeout_secs() -> u64 {
    255
}

fn default_voice() -> String {
    "en-US_AllisonVoice".to_string()
}

fn default_model() -> String {
    "en-US_BroadbandModel".to_string()
}

fn default_record_file() -> String {
    "chatlog.csv".to_string()
}

fn default_iam_url() -> String {
    "https://iam.cloud.ibm.com".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

// ============================================================================
// Sections
// ============================================================================

/// Dialogue service (Watson Assistant V2) settings.
#[derive(Debug, Clone, Serialize)]
pub struct AssistantConfig {
    #[serde(skip_serializing)]
    pub api_key: String,
    /// Service URL with any version suffix stripped.
    pub url: String,
    pub assistant_id: String,
    /// API version date string sent with every call (e.g. "2021-06-14").
    pub version: String,
    /// Idle timeout after which a session is treated as gone.
    pub session_timeout_secs: u64,
}

/// Speech-to-text service settings.
#[derive(Debug, Clone, Serialize)]
pub struct SpeechToTextConfig {
    #[serde(skip_serializing)]
    pub api_key: String,
    pub url: String,
    pub model: String,
}

/// Text-to-speech service settings.
#[derive(Debug, Clone, Serialize)]
pub struct TextToSpeechConfig {
    #[serde(skip_serializing)]
    pub api_key: String,
    pub url: String,
    pub voice: String,
}

/// Which turns end up in the chat log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecordingMode {
    /// Never record.
    None,
    /// Record every turn.
    All,
    /// Record only turns where no entity was recognized.
    UnmatchedOnly,
}

impl RecordingMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::All => "all",
            Self::UnmatchedOnly => "unmatched-only",
        }
    }
}

/// Accepts the full names as well as the historical single-letter form
/// keyed on the first character (`n`, `y`, `u`).
impl FromStr for RecordingMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_lowercase();
        match lower.chars().next() {
            Some('n') => Ok(Self::None),
            Some('y') | Some('a') => Ok(Self::All),
            Some('u') => Ok(Self::UnmatchedOnly),
            _ => Err(Error::Config(format!("invalid recording mode: {s:?}"))),
        }
    }
}

impl fmt::Display for RecordingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Chat log settings.
#[derive(Debug, Clone, Serialize)]
pub struct RecordingConfig {
    pub mode: RecordingMode,
    pub file: String,
}

/// Settings shared by every outbound client.
#[derive(Debug, Clone, Serialize)]
pub struct RemoteConfig {
    /// IAM token service base URL.
    pub iam_url: String,
    /// Whole-request timeout for outbound calls.
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize)]
pub struct ObservabilityConfig {
    pub log_level: String,
    /// "pretty" or "json"
    pub log_format: String,
}

// ============================================================================
// Config
// ============================================================================

/// Complete gateway configuration.
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    pub assistant: AssistantConfig,
    pub speech_to_text: SpeechToTextConfig,
    pub text_to_speech: TextToSpeechConfig,
    pub recording: RecordingConfig,
    pub remote: RemoteConfig,
    pub server: ServerConfig,
    pub observability: ObservabilityConfig,
    /// Problems tolerated while loading, to be logged once logging is up.
    #[serde(skip)]
    pub warnings: Vec<String>,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// A `.env` file in the working directory is applied first if present;
    /// variables already set in the environment win.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Lookup(lookup);

        let assistant = AssistantConfig {
            api_key: env.required(ASSISTANT_APIKEY)?,
            url: env.required_url(ASSISTANT_URL)?,
            assistant_id: env.required(ASSISTANT_ID)?,
            version: env.required(ASSISTANT_VERSION)?,
            session_timeout_secs: env.parsed(ASSISTANT_TIMEOUT, default_session_timeout_secs())?,
        };
        if assistant.session_timeout_secs == 0 {
            return Err(Error::Config(format!(
                "{ASSISTANT_TIMEOUT} must be a positive number of seconds"
            )));
        }

        let speech_to_text = SpeechToTextConfig {
            api_key: env.required(SPEECH_TO_TEXT_APIKEY)?,
            url: env.required_url(SPEECH_TO_TEXT_URL)?,
            model: env.optional(SPEECH_TO_TEXT_MODEL).unwrap_or_else(default_model),
        };

        let text_to_speech = TextToSpeechConfig {
            api_key: env.required(TEXT_TO_SPEECH_APIKEY)?,
            url: env.required_url(TEXT_TO_SPEECH_URL)?,
            voice: env.optional(TEXT_TO_SPEECH_VOICE).unwrap_or_else(default_voice),
        };

        let mut warnings = Vec::new();

        let mode = match env.optional(ASSISTANT_RECORD) {
            Some(raw) => raw.parse::<RecordingMode>().unwrap_or_else(|_| {
                warnings.push(format!(
                    "{ASSISTANT_RECORD} has unknown value {raw:?}, recording disabled"
                ));
                RecordingMode::None
            }),
            None => RecordingMode::None,
        };
        let recording = RecordingConfig {
            mode,
            file: env
                .optional(ASSISTANT_RECORD_FILE)
                .unwrap_or_else(default_record_file),
        };

        let remote = RemoteConfig {
            iam_url: env
                .optional(IAM_URL)
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(default_iam_url),
            request_timeout_secs: env.parsed(REMOTE_TIMEOUT_SECS, default_request_timeout_secs())?,
            connect_timeout_secs: default_connect_timeout_secs(),
        };

        let port = match env.optional(PORT) {
            Some(_) => env.parsed(PORT, default_port())?,
            None => env.parsed(VCAP_APP_PORT, default_port())?,
        };
        let server = ServerConfig {
            host: env.optional(CONVERSE_HOST).unwrap_or_else(default_host),
            port,
        };

        let observability = ObservabilityConfig {
            log_level: env
                .optional(CONVERSE_LOG_LEVEL)
                .unwrap_or_else(default_log_level),
            log_format: env
                .optional(CONVERSE_LOG_FORMAT)
                .unwrap_or_else(default_log_format),
        };

        Ok(Self {
            assistant,
            speech_to_text,
            text_to_speech,
            recording,
            remote,
            server,
            observability,
            warnings,
        })
    }

    /// Listener address string (`host:port`, IPv6 hosts bracketed).
    pub fn bind_address(&self) -> String {
        if self.server.host.contains(':') {
            format!("[{}]:{}", self.server.host, self.server.port)
        } else {
            format!("{}:{}", self.server.host, self.server.port)
        }
    }
}

/// Wraps a key lookup with the required/optional/parsed helpers.
struct Lookup<F>(F);

impl<F> Lookup<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, key: &str) -> Result<String> {
        self.optional(key).ok_or_else(|| {
            Error::Config(format!("{key} not found in environment or .env"))
        })
    }

    fn required_url(&self, key: &str) -> Result<String> {
        let raw = self.required(key)?;
        strip_version_suffix(&raw).map_err(|e| Error::Config(format!("{key} is not a valid URL: {e}")))
    }

    fn parsed<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match self.optional(key) {
            Some(raw) => raw
                .parse()
                .map_err(|e| Error::Config(format!("{key} has invalid value {raw:?}: {e}"))),
            None => Ok(default),
        }
    }
}
