//! Dialogue service trait and wire types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RemoteError;

/// Per-message request flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageOptions {
    /// Return every candidate intent, not just the best one.
    pub alternate_intents: bool,
    /// Echo the session context back in the response.
    pub return_context: bool,
    /// Include dialogue debug detail.
    pub debug: bool,
}

impl MessageOptions {
    /// Options sent with every conversational turn.
    pub const fn full_detail() -> Self {
        Self {
            alternate_intents: true,
            return_context: true,
            debug: true,
        }
    }
}

/// User input for one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageInput {
    pub message_type: String,
    pub text: String,
    pub options: MessageOptions,
}

impl MessageInput {
    /// Plain text input.
    pub fn text(text: impl Into<String>, options: MessageOptions) -> Self {
        Self {
            message_type: "text".to_string(),
            text: text.into(),
            options,
        }
    }
}

/// An entity recognized in the user input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeEntity {
    pub entity: String,
    pub value: String,
    #[serde(default)]
    pub confidence: f64,
}

/// An intent recognized in the user input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeIntent {
    pub intent: String,
    #[serde(default)]
    pub confidence: f64,
}

/// One item of the assistant's output.
///
/// Only `text` items carry display text; options, images and pauses are
/// kept opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericItem {
    pub response_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// The `output` object of a message response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageOutput {
    #[serde(default)]
    pub generic: Vec<GenericItem>,
    #[serde(default)]
    pub intents: Vec<RuntimeIntent>,
    #[serde(default)]
    pub entities: Vec<RuntimeEntity>,
}

impl MessageOutput {
    /// Text of every text-bearing output item, in order.
    pub fn text_fragments(&self) -> impl Iterator<Item = &str> {
        self.generic.iter().filter_map(|item| item.text.as_deref())
    }
}

/// Response to a message call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub output: MessageOutput,
    /// Session context, passed through without interpretation.
    #[serde(default)]
    pub context: serde_json::Value,
}

/// Stateful hosted dialogue service bound to one assistant.
#[async_trait]
pub trait DialogueService: Send + Sync {
    /// Open a new session and return its id.
    async fn create_session(&self) -> Result<String, RemoteError>;

    /// Send one message within a session.
    async fn message(
        &self,
        session_id: &str,
        input: MessageInput,
    ) -> Result<MessageResponse, RemoteError>;

    /// Close a session.
    async fn delete_session(&self, session_id: &str) -> Result<(), RemoteError>;

    /// Get the provider name.
    fn provider_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_input_wire_shape() {
        let input = MessageInput::text("hello", MessageOptions::full_detail());
        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "message_type": "text",
                "text": "hello",
                "options": {"alternate_intents": true, "return_context": true, "debug": true}
            })
        );
    }

    #[test]
    fn parses_mixed_generic_output() {
        let response: MessageResponse = serde_json::from_value(serde_json::json!({
            "output": {
                "generic": [
                    {"response_type": "text", "text": "Hi there."},
                    {"response_type": "pause", "time": 500},
                    {"response_type": "option", "title": "Pick one", "options": []},
                    {"response_type": "text", "text": "How can I help?"}
                ],
                "intents": [{"intent": "greeting", "confidence": 0.98}],
                "entities": [{"entity": "sys-number", "value": "2", "confidence": 1.0, "location": [0, 1]}]
            },
            "context": {"global": {"system": {"turn_count": 1}}}
        }))
        .unwrap();

        let fragments: Vec<&str> = response.output.text_fragments().collect();
        assert_eq!(fragments, vec!["Hi there.", "How can I help?"]);
        assert_eq!(response.output.entities[0].entity, "sys-number");
        assert_eq!(response.output.generic[1].extra["time"], 500);
        assert_eq!(response.context["global"]["system"]["turn_count"], 1);
    }

    #[test]
    fn missing_sections_default() {
        let response: MessageResponse =
            serde_json::from_value(serde_json::json!({"output": {}})).unwrap();
        assert!(response.output.generic.is_empty());
        assert!(response.output.entities.is_empty());
        assert!(response.context.is_null());
    }
}
