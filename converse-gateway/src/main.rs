//! Converse Gateway - Main entry point.

use anyhow::Result;
use converse_common::config::Config;
use converse_common::logging::init_logging;
use converse_common::util::mask_secret;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    init_logging(&config.observability.log_level, &config.observability.log_format);

    tracing::info!("Converse Gateway v{}", env!("CARGO_PKG_VERSION"));
    for warning in &config.warnings {
        tracing::warn!("{}", warning);
    }
    log_config_summary(&config);

    converse_gateway::start_server(&config).await
}

fn log_config_summary(config: &Config) {
    tracing::info!(
        url = %config.assistant.url,
        assistant_id = %config.assistant.assistant_id,
        version = %config.assistant.version,
        api_key = %mask_secret(&config.assistant.api_key),
        session_timeout_secs = config.assistant.session_timeout_secs,
        "Assistant"
    );
    tracing::info!(
        url = %config.speech_to_text.url,
        model = %config.speech_to_text.model,
        api_key = %mask_secret(&config.speech_to_text.api_key),
        "Speech to text"
    );
    tracing::info!(
        url = %config.text_to_speech.url,
        voice = %config.text_to_speech.voice,
        api_key = %mask_secret(&config.text_to_speech.api_key),
        "Text to speech"
    );
    tracing::info!(
        mode = %config.recording.mode,
        file = %config.recording.file,
        "Recording"
    );

    match serde_json::to_string(config) {
        Ok(settings) => tracing::debug!(%settings, "Effective configuration"),
        Err(e) => tracing::warn!(error = %e, "Could not serialize configuration"),
    }
}
