//! In-memory doubles of the remote services.
//!
//! They count every call so tests can assert on exactly how often a session
//! was created or deleted.

use async_trait::async_trait;
use converse_remote::{
    DialogueService, MessageInput, MessageResponse, Recognition, RemoteError, SpeechToText,
    SynthesisOptions, TextToSpeech,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Build a message response with the given text fragments and entities.
pub fn reply_with(texts: &[&str], entities: &[(&str, &str, f64)]) -> MessageResponse {
    serde_json::from_value(serde_json::json!({
        "output": {
            "generic": texts
                .iter()
                .map(|t| serde_json::json!({"response_type": "text", "text": t}))
                .collect::<Vec<_>>(),
            "intents": [],
            "entities": entities
                .iter()
                .map(|(e, v, c)| serde_json::json!({"entity": e, "value": v, "confidence": c}))
                .collect::<Vec<_>>(),
        },
        "context": {"global": {"system": {"turn_count": 1}}}
    }))
    .expect("fixture is a valid message response")
}

fn unavailable(service: &'static str) -> RemoteError {
    RemoteError::Status {
        service,
        status: 503,
        message: "service unavailable".to_string(),
    }
}

/// Scripted dialogue service.
pub struct FakeDialogue {
    created: AtomicUsize,
    deleted: Mutex<Vec<String>>,
    messages: Mutex<Vec<(String, String)>>,
    reply: Mutex<MessageResponse>,
    fail_creates: AtomicBool,
    fail_messages: AtomicBool,
    fail_deletes: AtomicBool,
}

impl FakeDialogue {
    pub fn new() -> Self {
        Self::with_reply(reply_with(&["Hello from the assistant."], &[]))
    }

    pub fn with_reply(reply: MessageResponse) -> Self {
        Self {
            created: AtomicUsize::new(0),
            deleted: Mutex::new(Vec::new()),
            messages: Mutex::new(Vec::new()),
            reply: Mutex::new(reply),
            fail_creates: AtomicBool::new(false),
            fail_messages: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
        }
    }

    pub fn set_reply(&self, reply: MessageResponse) {
        *self.reply.lock().unwrap() = reply;
    }

    pub fn fail_creates(&self, fail: bool) {
        self.fail_creates.store(fail, Ordering::SeqCst);
    }

    pub fn fail_messages(&self, fail: bool) {
        self.fail_messages.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Number of sessions created so far.
    pub fn creates(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Session ids a delete was attempted for, in order.
    pub fn deletes(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    /// `(session_id, text)` of every message sent, in order.
    pub fn messages(&self) -> Vec<(String, String)> {
        self.messages.lock().unwrap().clone()
    }
}

impl Default for FakeDialogue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DialogueService for FakeDialogue {
    async fn create_session(&self) -> Result<String, RemoteError> {
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(unavailable("assistant"));
        }
        let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("S{n}"))
    }

    async fn message(
        &self,
        session_id: &str,
        input: MessageInput,
    ) -> Result<MessageResponse, RemoteError> {
        self.messages
            .lock()
            .unwrap()
            .push((session_id.to_string(), input.text));
        if self.fail_messages.load(Ordering::SeqCst) {
            return Err(unavailable("assistant"));
        }
        Ok(self.reply.lock().unwrap().clone())
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), RemoteError> {
        self.deleted.lock().unwrap().push(session_id.to_string());
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(unavailable("assistant"));
        }
        Ok(())
    }

    fn provider_name(&self) -> &str {
        "fake"
    }
}

/// Speech recognizer returning a fixed recognition.
pub struct FakeStt {
    recognition: Recognition,
    fail: bool,
    calls: AtomicUsize,
}

impl FakeStt {
    /// Recognizer that hears `transcript`.
    pub fn hearing(transcript: &str) -> Self {
        let recognition = serde_json::from_value(serde_json::json!({
            "results": [{"final": true, "alternatives": [{"transcript": transcript}]}]
        }))
        .expect("fixture is a valid recognition");
        Self {
            recognition,
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Recognizer that hears nothing.
    pub fn silent() -> Self {
        Self {
            recognition: Recognition::default(),
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Recognizer whose every call fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::silent()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechToText for FakeStt {
    async fn recognize(
        &self,
        _audio_bytes: &[u8],
        _content_type: &str,
    ) -> Result<Recognition, RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(unavailable("speech-to-text"));
        }
        Ok(self.recognition.clone())
    }

    fn provider_name(&self) -> &str {
        "fake"
    }
}

/// Synthesizer that returns `RIFF<voice>:<text>` so tests can see what was asked.
pub struct FakeTts {
    default_voice: String,
    fail: bool,
    calls: AtomicUsize,
}

impl FakeTts {
    pub fn new(default_voice: &str) -> Self {
        Self {
            default_voice: default_voice.to_string(),
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new("en-US_AllisonVoice")
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextToSpeech for FakeTts {
    async fn synthesize(
        &self,
        text: &str,
        options: SynthesisOptions,
    ) -> Result<Vec<u8>, RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(unavailable("text-to-speech"));
        }
        let voice = options.voice.as_deref().unwrap_or(&self.default_voice);
        Ok(format!("RIFF{voice}:{text}").into_bytes())
    }

    fn provider_name(&self) -> &str {
        "fake"
    }
}
