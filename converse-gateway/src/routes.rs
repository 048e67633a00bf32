//! HTTP routes for the gateway.
//!
//! - `GET /` landing page
//! - `GET /health`
//! - `GET|POST /api/conversation`
//! - `POST /api/text-to-speech`
//! - `POST /api/speech-to-text`

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderMap, StatusCode},
    middleware,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use converse_common::config::Config;
use converse_remote::{RemoteServices, SpeechToText, TextToSpeech};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;

use crate::caller::Caller;
use crate::chatlog::ChatLogger;
use crate::form::FormFields;
use crate::middleware::https_redirect;
use crate::session::SessionStore;
use crate::speech::{self, Synthesis, NOT_UNDERSTOOD_TEXT, SYNTHESIS_FAILED_TEXT};
use crate::turn::{TurnHandler, TurnReply};

/// Largest accepted request body (audio uploads included).
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

const WAV_CONTENT_TYPE: &str = "audio/x-wav";
const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

static INDEX_HTML: &str = include_str!("../static/index.html");

// ============================================================================
// State
// ============================================================================

/// Shared state for the gateway HTTP server.
pub struct AppState {
    /// Conversation sessions, one per caller
    pub sessions: SessionStore,
    pub turns: TurnHandler,
    pub speech_to_text: Arc<dyn SpeechToText>,
    pub text_to_speech: Arc<dyn TextToSpeech>,
}

/// Wire the remote services and chat log into the shared state.
pub fn create_state(
    config: &Config,
    services: RemoteServices,
    chat_log: ChatLogger,
) -> Arc<AppState> {
    let timeout = Duration::from_secs(config.assistant.session_timeout_secs);
    Arc::new(AppState {
        sessions: SessionStore::new(services.dialogue, timeout),
        turns: TurnHandler::new(Arc::new(chat_log)),
        speech_to_text: services.speech_to_text,
        text_to_speech: services.text_to_speech,
    })
}

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
struct ConversationForm {
    #[serde(rename = "convText", default)]
    conv_text: Option<String>,
}

#[derive(Debug, Serialize)]
struct ConversationResponse {
    results: TurnReply,
}

#[derive(Debug, Default, Deserialize)]
struct SynthesisForm {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    voice: Option<String>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
}

// ============================================================================
// Handlers
// ============================================================================

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        service: "converse-gateway",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// One conversational turn for the calling browser.
///
/// GET reads `convText` from the query string, POST from a urlencoded or
/// multipart form body.
async fn conversation(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    FormFields(form): FormFields<ConversationForm>,
) -> Response {
    let caller = Caller::from_headers(&headers);

    let session = state.sessions.session_for(&caller.key()).await;
    let reply = state
        .turns
        .handle_turn(&session, form.conv_text.as_deref())
        .await;

    let mut response = Json(ConversationResponse { results: reply }).into_response();
    if let Some(cookie) = caller.set_cookie() {
        tracing::debug!(caller = %caller.id, "Issued caller cookie");
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }
    response
}

async fn text_to_speech(
    State(state): State<Arc<AppState>>,
    FormFields(form): FormFields<SynthesisForm>,
) -> Response {
    match speech::synthesize(
        state.text_to_speech.as_ref(),
        form.text.as_deref(),
        form.voice.as_deref(),
    )
    .await
    {
        Ok(Synthesis::Audio(audio)) => {
            ([(header::CONTENT_TYPE, WAV_CONTENT_TYPE)], audio).into_response()
        }
        Ok(Synthesis::Placeholder(text)) => {
            ([(header::CONTENT_TYPE, WAV_CONTENT_TYPE)], text).into_response()
        }
        Err(e) => {
            tracing::error!(service = e.service(), error = %e, "Speech synthesis failed");
            (
                StatusCode::BAD_GATEWAY,
                [(header::CONTENT_TYPE, TEXT_CONTENT_TYPE)],
                SYNTHESIS_FAILED_TEXT,
            )
                .into_response()
        }
    }
}

async fn speech_to_text(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    tracing::debug!(bytes = body.len(), "Transcribing upload");

    match speech::transcribe(state.speech_to_text.as_ref(), &body).await {
        Ok(text) => ([(header::CONTENT_TYPE, TEXT_CONTENT_TYPE)], text).into_response(),
        Err(e) => {
            tracing::error!(service = e.service(), error = %e, "Speech recognition failed");
            (
                StatusCode::BAD_GATEWAY,
                [(header::CONTENT_TYPE, TEXT_CONTENT_TYPE)],
                NOT_UNDERSTOOD_TEXT,
            )
                .into_response()
        }
    }
}

// ============================================================================
// Router
// ============================================================================

/// Build the gateway router with all routes and middleware.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/conversation", get(conversation).post(conversation))
        .route("/api/text-to-speech", post(text_to_speech))
        .route("/api/speech-to-text", post(speech_to_text))
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(cors)
        .layer(middleware::from_fn(https_redirect))
}
