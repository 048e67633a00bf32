//! Converse Gateway - HTTP front for hosted dialogue and speech services.
//!
//! This crate provides the gateway service:
//! - Text conversation with a per-caller, idle-expiring remote session
//! - Text-to-speech and speech-to-text passthroughs
//! - Optional append-only chat log of conversation turns
//!
//! ## Architecture
//!
//! ```text
//! Browser → Gateway (caller cookie → SessionStore → TurnHandler) → Assistant
//!                                                       ↓
//!                                                   ChatLogger
//! ```

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod caller;
pub mod chatlog;
pub mod form;
pub mod middleware;
pub mod routes;
pub mod session;
pub mod speech;
pub mod turn;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use chatlog::ChatLogger;
pub use routes::{build_router, create_state, AppState};
pub use session::{Cleanup, SessionManager, SessionStore};
pub use turn::{TurnHandler, TurnReply};

use anyhow::Context;
use converse_common::config::Config;
use converse_remote::RemoteServices;
use std::sync::Arc;
use std::time::Duration;

/// How often idle callers are swept from the session store.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Periodically drop callers whose sessions have expired.
pub fn spawn_session_sweeper(state: Arc<AppState>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        interval.tick().await;
        loop {
            interval.tick().await;
            state.sessions.evict_idle().await;
        }
    })
}

/// Start the gateway server.
pub async fn start_server(config: &Config) -> anyhow::Result<()> {
    let addr = config.bind_address();

    let chat_log = ChatLogger::open(config.recording.mode, &config.recording.file)
        .with_context(|| format!("cannot open chat log {}", config.recording.file))?;
    let services =
        RemoteServices::from_config(config).context("failed to build remote service client")?;
    let state = create_state(config, services, chat_log);

    let sweeper = spawn_session_sweeper(state.clone());
    let router = build_router(state);

    tracing::info!("Starting Converse Gateway on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("cannot listen on {addr}"))?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    tracing::info!("Converse Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
