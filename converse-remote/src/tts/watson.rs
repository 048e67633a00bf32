//! Watson Text to Speech V1 implementation.

use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;

use super::{SynthesisOptions, TextToSpeech};
use crate::error::RemoteError;
use crate::iam::IamTokenManager;

const SERVICE: &str = "text-to-speech";
const WAV_MIME_TYPE: &str = "audio/wav";

/// Watson Text to Speech client.
pub struct WatsonTts {
    client: Client,
    tokens: Arc<IamTokenManager>,
    base_url: String,
    default_voice: String,
}

impl WatsonTts {
    /// Create a new text-to-speech client.
    ///
    /// * `base_url` - service URL without version suffix
    /// * `voice` - default voice, e.g. "en-US_AllisonVoice"
    pub fn new(
        client: Client,
        tokens: Arc<IamTokenManager>,
        base_url: &str,
        voice: impl Into<String>,
    ) -> Self {
        Self {
            client,
            tokens,
            base_url: base_url.trim_end_matches('/').to_string(),
            default_voice: voice.into(),
        }
    }

    fn synthesize_url(&self) -> String {
        format!("{}/v1/synthesize", self.base_url)
    }
}

#[async_trait]
impl TextToSpeech for WatsonTts {
    async fn synthesize(
        &self,
        text: &str,
        options: SynthesisOptions,
    ) -> Result<Vec<u8>, RemoteError> {
        let voice = options.voice.as_deref().unwrap_or(&self.default_voice);
        let token = self.tokens.token().await?;

        let response = self
            .client
            .post(self.synthesize_url())
            .query(&[("voice", voice)])
            .bearer_auth(token)
            .header("Accept", WAV_MIME_TYPE)
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await
            .map_err(|e| RemoteError::from_reqwest(SERVICE, e))?;

        let response = self.tokens.accept(SERVICE, response).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| RemoteError::from_reqwest(SERVICE, e))?;

        tracing::info!(
            voice = %voice,
            chars = text.chars().count(),
            bytes = bytes.len(),
            "Speech synthesized"
        );
        Ok(bytes.to_vec())
    }

    fn provider_name(&self) -> &str {
        "watson-tts"
    }
}
