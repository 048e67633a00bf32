//! Watson Speech to Text V1 implementation.

use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;

use super::{Recognition, SpeechToText};
use crate::error::RemoteError;
use crate::iam::IamTokenManager;

const SERVICE: &str = "speech-to-text";

/// Watson Speech to Text client.
pub struct WatsonStt {
    client: Client,
    tokens: Arc<IamTokenManager>,
    base_url: String,
    model: String,
}

impl WatsonStt {
    /// Create a new speech-to-text client.
    ///
    /// * `base_url` - service URL without version suffix
    /// * `model` - recognition model, e.g. "en-US_BroadbandModel"
    pub fn new(
        client: Client,
        tokens: Arc<IamTokenManager>,
        base_url: &str,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            tokens,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    fn recognize_url(&self) -> String {
        format!("{}/v1/recognize", self.base_url)
    }
}

#[async_trait]
impl SpeechToText for WatsonStt {
    async fn recognize(
        &self,
        audio_bytes: &[u8],
        content_type: &str,
    ) -> Result<Recognition, RemoteError> {
        let token = self.tokens.token().await?;
        let response = self
            .client
            .post(self.recognize_url())
            .query(&[
                ("model", self.model.as_str()),
                ("timestamps", "true"),
                ("word_confidence", "true"),
                ("smart_formatting", "true"),
            ])
            .bearer_auth(token)
            .header("Content-Type", content_type)
            .body(audio_bytes.to_vec())
            .send()
            .await
            .map_err(|e| RemoteError::from_reqwest(SERVICE, e))?;

        let response = self.tokens.accept(SERVICE, response).await?;
        let recognition: Recognition = response
            .json()
            .await
            .map_err(|e| RemoteError::from_reqwest(SERVICE, e))?;

        tracing::info!(
            bytes = audio_bytes.len(),
            results = recognition.results.len(),
            "Speech recognized"
        );
        Ok(recognition)
    }

    fn provider_name(&self) -> &str {
        "watson-stt"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_recognize_url() {
        let client = Client::new();
        let tokens = Arc::new(IamTokenManager::new(client.clone(), "http://iam.invalid", "key"));
        let stt = WatsonStt::new(client, tokens, "https://stt.example.com/instances/a/", "en-US_BroadbandModel");
        assert_eq!(stt.recognize_url(), "https://stt.example.com/instances/a/v1/recognize");
        assert_eq!(stt.model, "en-US_BroadbandModel");
        assert_eq!(stt.provider_name(), "watson-stt");
    }
}
