//! Integration tests for Converse Gateway.
//!
//! Drives the full router with in-memory remote services, plus one end-to-end
//! run against a wiremock stand-in for the Watson APIs.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use converse_common::config::{Config, RecordingMode};
use converse_gateway::testing::{reply_with, FakeDialogue, FakeStt, FakeTts};
use converse_gateway::{build_router, create_state, ChatLogger};
use converse_remote::RemoteServices;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn test_config(base_url: &str) -> Config {
    let base_url = base_url.to_string();
    Config::from_lookup(move |key| {
        let value = match key {
            "ASSISTANT_APIKEY" => "wa-key".to_string(),
            "ASSISTANT_URL" => format!("{base_url}/assistant"),
            "ASSISTANT_ID" => "asst-1".to_string(),
            "ASSISTANT_VERSION" => "2021-06-14".to_string(),
            "SPEECH_TO_TEXT_APIKEY" => "stt-key".to_string(),
            "SPEECH_TO_TEXT_URL" => format!("{base_url}/stt"),
            "TEXT_TO_SPEECH_APIKEY" => "tts-key".to_string(),
            "TEXT_TO_SPEECH_URL" => format!("{base_url}/tts"),
            "IAM_URL" => base_url.clone(),
            _ => return None,
        };
        Some(value)
    })
    .unwrap()
}

struct TestApp {
    router: Router,
    dialogue: Arc<FakeDialogue>,
}

fn app_with(dialogue: FakeDialogue, stt: FakeStt, tts: FakeTts, chat_log: ChatLogger) -> TestApp {
    let dialogue = Arc::new(dialogue);
    let services = RemoteServices {
        dialogue: dialogue.clone(),
        speech_to_text: Arc::new(stt),
        text_to_speech: Arc::new(tts),
    };
    let state = create_state(&test_config("http://127.0.0.1:1"), services, chat_log);
    TestApp {
        router: build_router(state),
        dialogue,
    }
}

fn default_app() -> TestApp {
    app_with(
        FakeDialogue::new(),
        FakeStt::hearing("what is the weather"),
        FakeTts::new("en-US_AllisonVoice"),
        ChatLogger::disabled(),
    )
}

fn form_request(method: Method, uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    request.body(Body::from(body.to_string())).unwrap()
}

const BOUNDARY: &str = "converse-test-boundary";

fn multipart_request(uri: &str, parts: &[(&str, &str)]) -> Request<Body> {
    let mut body = String::new();
    for (name, value) in parts {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        ));
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));

    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    (status, headers, body.to_vec())
}

/// Post one turn; returns the reply JSON and the `name=value` part of any new cookie.
async fn converse(router: &Router, text: &str, cookie: Option<&str>) -> (Value, Option<String>) {
    let body = format!("convText={text}");
    let (status, headers, body) = send(
        router,
        form_request(Method::POST, "/api/conversation", &body, cookie),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let set_cookie = headers
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::to_string);
    (serde_json::from_slice(&body).unwrap(), set_cookie)
}

// ─────────────────────────────────────────────────────────────────────────────
// Health and landing page
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_health_check() {
    let app = default_app();
    let request = Request::get("/health").body(Body::empty()).unwrap();
    let (status, _, body) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["service"], "converse-gateway");
}

#[tokio::test]
async fn test_landing_page() {
    let app = default_app();
    let (status, headers, body) =
        send(&app.router, Request::get("/").body(Body::empty()).unwrap()).await;

    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/html"));
    assert!(String::from_utf8(body).unwrap().contains("/api/conversation"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Conversation
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_conversation_reply_shape_and_cookie() {
    let app = default_app();
    app.dialogue
        .set_reply(reply_with(&["Hi!", "Ask me anything."], &[]));

    let (json, cookie) = converse(&app.router, "hi", None).await;
    assert_eq!(json["results"]["responseText"], "Hi!... Ask me anything.");
    assert_eq!(json["results"]["context"]["global"]["system"]["turn_count"], 1);

    let cookie = cookie.expect("first turn sets the caller cookie");
    assert!(cookie.starts_with("converse_session="));

    let (_, second_cookie) = converse(&app.router, "again", Some(&cookie)).await;
    assert!(second_cookie.is_none());
    assert_eq!(app.dialogue.creates(), 1);
}

#[tokio::test]
async fn test_conversation_get_reads_query() {
    let app = default_app();
    let request = Request::get("/api/conversation?convText=good%20morning")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.dialogue.messages()[0].1, "good morning");
}

#[tokio::test]
async fn test_conversation_without_text_says_hello() {
    let app = default_app();
    let request = Request::post("/api/conversation").body(Body::empty()).unwrap();
    let (status, _, _) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.dialogue.messages()[0].1, "hello");
}

#[tokio::test]
async fn test_conversation_reads_multipart_form() {
    let app = default_app();
    let request = multipart_request("/api/conversation", &[("convText", "what time is it")]);
    let (status, _, body) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert!(json["results"]["responseText"].is_string());
    assert_eq!(
        app.dialogue.messages(),
        vec![("S1".to_string(), "what time is it".to_string())]
    );
}

#[tokio::test]
async fn test_conversation_with_unsupported_body_says_hello() {
    let app = default_app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/conversation")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"convText":"ignored"}"#))
        .unwrap();
    let (status, _, _) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.dialogue.messages()[0].1, "hello");
}

#[tokio::test]
async fn test_callers_get_separate_sessions() {
    let app = default_app();

    let (_, alice) = converse(&app.router, "hi", None).await;
    let (_, bob) = converse(&app.router, "hi", None).await;
    let (alice, bob) = (alice.unwrap(), bob.unwrap());
    assert_ne!(alice, bob);

    converse(&app.router, "hi", Some(&alice)).await;
    converse(&app.router, "hi", Some(&bob)).await;

    let sessions: Vec<String> = app.dialogue.messages().into_iter().map(|(s, _)| s).collect();
    assert_eq!(sessions, vec!["S1", "S2", "S1", "S2"]);
    assert_eq!(app.dialogue.creates(), 2);
}

#[tokio::test]
async fn test_bye_closes_callers_session() {
    let app = default_app();

    let (_, cookie) = converse(&app.router, "hi", None).await;
    let cookie = cookie.unwrap();
    let (json, _) = converse(&app.router, "bye", Some(&cookie)).await;
    assert_eq!(json["results"]["responseText"], "Hello from the assistant.");
    assert_eq!(app.dialogue.deletes(), vec!["S1".to_string()]);

    converse(&app.router, "hi", Some(&cookie)).await;
    assert_eq!(app.dialogue.creates(), 2);
}

#[tokio::test]
async fn test_dialogue_failure_returns_fallback() {
    let app = default_app();
    let (_, cookie) = converse(&app.router, "hi", None).await;
    let cookie = cookie.unwrap();

    app.dialogue.fail_messages(true);
    let (json, _) = converse(&app.router, "hi", Some(&cookie)).await;
    assert_eq!(
        json["results"],
        json!({"responseText": "session failed, retry", "context": ""})
    );
    assert_eq!(app.dialogue.deletes(), vec!["S1".to_string()]);
}

#[tokio::test]
async fn test_turns_recorded_to_chat_log() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chatlog.csv");
    let app = app_with(
        FakeDialogue::with_reply(reply_with(&["hello"], &[])),
        FakeStt::silent(),
        FakeTts::new("en-US_AllisonVoice"),
        ChatLogger::open(RecordingMode::All, &path).unwrap(),
    );

    converse(&app.router, "hi", None).await;

    let contents = tokio::fs::read_to_string(&path).await.unwrap();
    assert_eq!(contents, "hi,hello\n");
}

// ─────────────────────────────────────────────────────────────────────────────
// Speech
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_text_to_speech_returns_wav() {
    let app = default_app();
    let request = form_request(
        Method::POST,
        "/api/text-to-speech",
        "text=hello&voice=en-GB_KateV3Voice",
        None,
    );
    let (status, headers, body) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "audio/x-wav");
    assert_eq!(body, b"RIFFen-GB_KateV3Voice:hello".to_vec());
}

#[tokio::test]
async fn test_text_to_speech_reads_multipart_form() {
    let app = default_app();
    let request = multipart_request(
        "/api/text-to-speech",
        &[("text", "hello"), ("voice", "en-GB_KateV3Voice")],
    );
    let (status, headers, body) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "audio/x-wav");
    assert_eq!(body, b"RIFFen-GB_KateV3Voice:hello".to_vec());
}

#[tokio::test]
async fn test_text_to_speech_without_text() {
    let app = default_app();
    let request = form_request(Method::POST, "/api/text-to-speech", "text=", None);
    let (status, headers, body) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "audio/x-wav");
    assert_eq!(body, b"I have no response to that.".to_vec());
}

#[tokio::test]
async fn test_text_to_speech_failure_is_bad_gateway() {
    let app = app_with(
        FakeDialogue::new(),
        FakeStt::silent(),
        FakeTts::failing(),
        ChatLogger::disabled(),
    );
    let request = form_request(Method::POST, "/api/text-to-speech", "text=hello", None);
    let (status, _, body) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(String::from_utf8(body).unwrap().contains("try again"));
}

#[tokio::test]
async fn test_speech_to_text_returns_transcript() {
    let app = default_app();
    let request = Request::post("/api/speech-to-text")
        .header(header::CONTENT_TYPE, "audio/wav")
        .body(Body::from(b"RIFF0000WAVEfmt ".to_vec()))
        .unwrap();
    let (status, headers, body) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/plain"));
    assert_eq!(body, b"what is the weather".to_vec());
}

#[tokio::test]
async fn test_speech_to_text_nothing_heard() {
    let app = app_with(
        FakeDialogue::new(),
        FakeStt::silent(),
        FakeTts::new("en-US_AllisonVoice"),
        ChatLogger::disabled(),
    );
    let request = Request::post("/api/speech-to-text")
        .body(Body::from(b"RIFF".to_vec()))
        .unwrap();
    let (status, _, body) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"Sorry, didn't get that. please try again!".to_vec());
}

#[tokio::test]
async fn test_speech_to_text_failure_is_bad_gateway() {
    let app = app_with(
        FakeDialogue::new(),
        FakeStt::failing(),
        FakeTts::new("en-US_AllisonVoice"),
        ChatLogger::disabled(),
    );
    let request = Request::post("/api/speech-to-text")
        .body(Body::from(b"RIFF".to_vec()))
        .unwrap();
    let (status, _, body) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body, b"Sorry, didn't get that. please try again!".to_vec());
}

#[tokio::test]
async fn test_oversized_upload_rejected() {
    let app = default_app();
    let request = Request::post("/api/speech-to-text")
        .body(Body::from(vec![0u8; 11 * 1024 * 1024]))
        .unwrap();
    let (status, _, _) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

// ─────────────────────────────────────────────────────────────────────────────
// Middleware
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_forwarded_http_redirects_to_https() {
    let app = default_app();
    let request = Request::get("/api/conversation?convText=hi")
        .header(header::HOST, "converse.example.com")
        .header("x-forwarded-proto", "http")
        .body(Body::empty())
        .unwrap();
    let (status, headers, _) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::MOVED_PERMANENTLY);
    assert_eq!(
        headers[header::LOCATION],
        "https://converse.example.com/api/conversation?convText=hi"
    );
    assert!(app.dialogue.messages().is_empty());
}

#[tokio::test]
async fn test_forwarded_https_passes_through() {
    let app = default_app();
    for proto in [Some("https"), None] {
        let mut request = Request::get("/health").header(header::HOST, "converse.example.com");
        if let Some(proto) = proto {
            request = request.header("x-forwarded-proto", proto);
        }
        let (status, _, _) = send(&app.router, request.body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// End to end against a mock Watson
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_conversation_against_mock_watson() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/identity/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/assistant/v2/assistants/asst-1/sessions"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"session_id": "live-1"})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path_regex(r"^/assistant/v2/assistants/asst-1/sessions/live-1/message$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "output": {
                "generic": [
                    {"response_type": "text", "text": "It is sunny"},
                    {"response_type": "pause", "time": 500},
                    {"response_type": "text", "text": "in Paris"}
                ],
                "entities": [{"entity": "city", "value": "Paris", "confidence": 1.0}]
            },
            "context": {"skills": {"main skill": {"user_defined": {"city": "Paris"}}}}
        })))
        .expect(2)
        .mount(&server)
        .await;

    let config = test_config(&server.uri());
    let state = create_state(
        &config,
        RemoteServices::from_config(&config).unwrap(),
        ChatLogger::disabled(),
    );
    let router = build_router(state);

    let (json, cookie) = converse(&router, "weather%20in%20Paris", None).await;
    assert_eq!(json["results"]["responseText"], "It is sunny... in Paris");
    assert_eq!(
        json["results"]["context"]["skills"]["main skill"]["user_defined"]["city"],
        "Paris"
    );

    let (json, _) = converse(&router, "and%20tomorrow", cookie.as_deref()).await;
    assert_eq!(json["results"]["responseText"], "It is sunny... in Paris");
}

#[tokio::test]
async fn test_rejected_token_falls_back_then_recovers() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/identity/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok",
            "expires_in": 3600
        })))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/assistant/v2/assistants/asst-1/sessions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/assistant/v2/assistants/asst-1/sessions"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"session_id": "live-2"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/assistant/v2/assistants/asst-1/sessions/live-2/message"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "output": {"generic": [{"response_type": "text", "text": "Welcome back"}]},
            "context": {}
        })))
        .mount(&server)
        .await;

    let config = test_config(&server.uri());
    let state = create_state(
        &config,
        RemoteServices::from_config(&config).unwrap(),
        ChatLogger::disabled(),
    );
    let router = build_router(state);

    let (json, cookie) = converse(&router, "hi", None).await;
    assert_eq!(json["results"]["responseText"], "session failed, retry");

    let (json, _) = converse(&router, "hi", cookie.as_deref()).await;
    assert_eq!(json["results"]["responseText"], "Welcome back");
}
