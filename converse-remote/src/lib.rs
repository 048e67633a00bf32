//! Converse Remote - Clients for the hosted conversation services.
//!
//! - Dialogue (Watson Assistant V2): session create / message / delete
//! - Speech to text (Watson STT V1)
//! - Text to speech (Watson TTS V1)
//!
//! All three authenticate with IAM bearer tokens minted from their API keys.
//!
//! ```text
//! gateway ──► DialogueService ──► /v2/assistants/{id}/sessions...
//!        ├──► SpeechToText    ──► /v1/recognize
//!        └──► TextToSpeech    ──► /v1/synthesize
//!                     ▲
//!              IamTokenManager ──► /identity/token
//! ```

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod dialogue;
pub mod error;
pub mod iam;
pub mod stt;
pub mod tts;

pub use dialogue::{
    DialogueService, MessageInput, MessageOptions, MessageOutput, MessageResponse, RuntimeEntity,
    WatsonAssistant,
};
pub use error::RemoteError;
pub use iam::IamTokenManager;
pub use stt::{Recognition, SpeechToText, WatsonStt};
pub use tts::{SynthesisOptions, TextToSpeech, WatsonTts};

use converse_common::config::{Config, RemoteConfig};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

/// Build the shared outbound HTTP client with bounded timeouts.
pub fn build_http_client(remote: &RemoteConfig) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(remote.request_timeout_secs))
        .connect_timeout(Duration::from_secs(remote.connect_timeout_secs))
        .build()
}

/// The three remote services the gateway fronts.
#[derive(Clone)]
pub struct RemoteServices {
    pub dialogue: Arc<dyn DialogueService>,
    pub speech_to_text: Arc<dyn SpeechToText>,
    pub text_to_speech: Arc<dyn TextToSpeech>,
}

impl RemoteServices {
    /// Build the Watson clients described by the configuration.
    pub fn from_config(config: &Config) -> reqwest::Result<Self> {
        let client = build_http_client(&config.remote)?;
        let iam_url = config.remote.iam_url.as_str();

        let dialogue = WatsonAssistant::new(
            client.clone(),
            Arc::new(IamTokenManager::new(
                client.clone(),
                iam_url,
                config.assistant.api_key.clone(),
            )),
            &config.assistant.url,
            config.assistant.assistant_id.clone(),
            config.assistant.version.clone(),
        );

        let speech_to_text = WatsonStt::new(
            client.clone(),
            Arc::new(IamTokenManager::new(
                client.clone(),
                iam_url,
                config.speech_to_text.api_key.clone(),
            )),
            &config.speech_to_text.url,
            config.speech_to_text.model.clone(),
        );

        let text_to_speech = WatsonTts::new(
            client.clone(),
            Arc::new(IamTokenManager::new(
                client,
                iam_url,
                config.text_to_speech.api_key.clone(),
            )),
            &config.text_to_speech.url,
            config.text_to_speech.voice.clone(),
        );

        Ok(Self {
            dialogue: Arc::new(dialogue),
            speech_to_text: Arc::new(speech_to_text),
            text_to_speech: Arc::new(text_to_speech),
        })
    }
}
