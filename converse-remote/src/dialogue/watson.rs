//! Watson Assistant V2 implementation.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;

use super::{DialogueService, MessageInput, MessageResponse};
use crate::error::RemoteError;
use crate::iam::IamTokenManager;

const SERVICE: &str = "assistant";

#[derive(Debug, Deserialize)]
struct SessionResponse {
    session_id: String,
}

/// Watson Assistant V2 client bound to one assistant.
pub struct WatsonAssistant {
    client: Client,
    tokens: Arc<IamTokenManager>,
    base_url: String,
    assistant_id: String,
    version: String,
}

impl WatsonAssistant {
    /// Create a new assistant client.
    ///
    /// * `base_url` - service URL without version suffix
    /// * `assistant_id` - assistant every session is scoped to
    /// * `version` - API version date sent as the `version` query parameter
    pub fn new(
        client: Client,
        tokens: Arc<IamTokenManager>,
        base_url: &str,
        assistant_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            client,
            tokens,
            base_url: base_url.trim_end_matches('/').to_string(),
            assistant_id: assistant_id.into(),
            version: version.into(),
        }
    }

    fn sessions_url(&self) -> String {
        format!(
            "{}/v2/assistants/{}/sessions",
            self.base_url, self.assistant_id
        )
    }

    fn session_url(&self, session_id: &str) -> String {
        format!("{}/{}", self.sessions_url(), session_id)
    }

    fn transport(e: reqwest::Error) -> RemoteError {
        RemoteError::from_reqwest(SERVICE, e)
    }
}

#[async_trait]
impl DialogueService for WatsonAssistant {
    async fn create_session(&self) -> Result<String, RemoteError> {
        let token = self.tokens.token().await?;
        let response = self
            .client
            .post(self.sessions_url())
            .query(&[("version", self.version.as_str())])
            .bearer_auth(token)
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(Self::transport)?;

        let response = self.tokens.accept(SERVICE, response).await?;
        let session: SessionResponse = response.json().await.map_err(Self::transport)?;
        tracing::info!(session_id = %session.session_id, "Session created");
        Ok(session.session_id)
    }

    async fn message(
        &self,
        session_id: &str,
        input: MessageInput,
    ) -> Result<MessageResponse, RemoteError> {
        let token = self.tokens.token().await?;
        let url = format!("{}/message", self.session_url(session_id));
        let response = self
            .client
            .post(&url)
            .query(&[("version", self.version.as_str())])
            .bearer_auth(token)
            .json(&serde_json::json!({ "input": input }))
            .send()
            .await
            .map_err(Self::transport)?;

        let response = self.tokens.accept(SERVICE, response).await?;
        let message: MessageResponse = response.json().await.map_err(Self::transport)?;
        tracing::debug!(
            session_id = %session_id,
            fragments = message.output.generic.len(),
            entities = message.output.entities.len(),
            "Assistant replied"
        );
        Ok(message)
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), RemoteError> {
        let token = self.tokens.token().await?;
        let response = self
            .client
            .delete(self.session_url(session_id))
            .query(&[("version", self.version.as_str())])
            .bearer_auth(token)
            .send()
            .await
            .map_err(Self::transport)?;

        self.tokens.accept(SERVICE, response).await?;
        tracing::info!(session_id = %session_id, "Session deleted");
        Ok(())
    }

    fn provider_name(&self) -> &str {
        "watson-assistant"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assistant(base_url: &str) -> WatsonAssistant {
        let client = Client::new();
        let tokens = Arc::new(IamTokenManager::new(client.clone(), "http://iam.invalid", "key"));
        WatsonAssistant::new(client, tokens, base_url, "asst-1", "2021-06-14")
    }

    #[test]
    fn builds_session_urls() {
        let wa = assistant("https://api.example.com/instances/abc/");
        assert_eq!(
            wa.sessions_url(),
            "https://api.example.com/instances/abc/v2/assistants/asst-1/sessions"
        );
        assert_eq!(
            wa.session_url("s-9"),
            "https://api.example.com/instances/abc/v2/assistants/asst-1/sessions/s-9"
        );
    }

    #[test]
    fn provider_name() {
        assert_eq!(assistant("https://x").provider_name(), "watson-assistant");
    }
}
