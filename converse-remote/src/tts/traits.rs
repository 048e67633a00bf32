//! Text-to-speech trait definition.

use async_trait::async_trait;

use crate::error::RemoteError;

/// Text-to-speech synthesis options.
#[derive(Debug, Clone, Default)]
pub struct SynthesisOptions {
    /// Voice to use; the provider default when unset
    pub voice: Option<String>,
}

impl SynthesisOptions {
    pub fn with_voice(voice: Option<String>) -> Self {
        Self { voice }
    }
}

/// Text-to-speech trait for converting text to WAV audio.
#[async_trait]
pub trait TextToSpeech: Send + Sync {
    /// Synthesize text to audio bytes.
    async fn synthesize(
        &self,
        text: &str,
        options: SynthesisOptions,
    ) -> Result<Vec<u8>, RemoteError>;

    /// Get the provider name.
    fn provider_name(&self) -> &str;
}
