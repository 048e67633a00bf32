//! One conversational exchange.

use converse_remote::{MessageInput, MessageOptions};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::chatlog::ChatLogger;
use crate::session::{Cleanup, SessionManager};

/// Input used when the caller sends nothing.
pub const DEFAULT_INPUT: &str = "hello";
/// Reply sent when the dialogue call could not be completed.
pub const FALLBACK_REPLY: &str = "session failed, retry";
/// Input that closes the conversation after it is answered.
pub const FAREWELL: &str = "bye";
/// Separator between the text fragments of one reply.
const FRAGMENT_SEPARATOR: &str = "... ";

/// Reply to one turn, as serialized to the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnReply {
    pub response_text: String,
    /// Dialogue context, passed through untouched.
    pub context: Value,
}

impl TurnReply {
    fn fallback() -> Self {
        Self {
            response_text: FALLBACK_REPLY.to_string(),
            context: Value::String(String::new()),
        }
    }
}

/// Runs turns against a caller's session and records them.
pub struct TurnHandler {
    chat_log: Arc<ChatLogger>,
}

impl TurnHandler {
    pub fn new(chat_log: Arc<ChatLogger>) -> Self {
        Self { chat_log }
    }

    /// Handle one turn. Never fails: dialogue errors become the fallback reply.
    pub async fn handle_turn(&self, session: &SessionManager, input: Option<&str>) -> TurnReply {
        let text = input
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_INPUT);

        let exchange = async {
            let session_id = session.get_session().await?;
            let response = session
                .dialogue()
                .message(&session_id, MessageInput::text(text, MessageOptions::full_detail()))
                .await?;
            Ok::<_, converse_remote::RemoteError>((session_id, response))
        };

        let (session_id, response) = match exchange.await {
            Ok(ok) => ok,
            Err(e) => {
                tracing::warn!(service = e.service(), error = %e, "Dialogue call failed");
                log_cleanup(session.delete_session().await);
                return TurnReply::fallback();
            }
        };

        let response_text = response
            .output
            .text_fragments()
            .collect::<Vec<_>>()
            .join(FRAGMENT_SEPARATOR);
        tracing::debug!(
            session_id = %session_id,
            entities = response.output.entities.len(),
            "Turn answered"
        );

        if let Err(e) = self
            .chat_log
            .record(text, &response_text, &response.output.entities)
            .await
        {
            tracing::warn!(error = %e, "Failed to write chat log");
        }

        if text == FAREWELL {
            tracing::debug!(session_id = %session_id, "Farewell received, closing session");
            log_cleanup(session.delete_session().await);
        }

        TurnReply {
            response_text,
            context: response.context,
        }
    }
}

fn log_cleanup(cleanup: Cleanup) {
    if let Cleanup::RemoteFailed(reason) = cleanup {
        tracing::debug!(reason = %reason, "Remote session delete failed, cleared locally");
    }
}
