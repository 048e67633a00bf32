//! Speech-to-text trait definition.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RemoteError;

/// One candidate transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechAlternative {
    pub transcript: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// One recognized segment of the audio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechResult {
    #[serde(default)]
    pub alternatives: Vec<SpeechAlternative>,
    #[serde(default, rename = "final")]
    pub is_final: bool,
}

/// Full recognition result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recognition {
    #[serde(default)]
    pub results: Vec<SpeechResult>,
}

impl Recognition {
    /// First alternative of the first result, trimmed.
    ///
    /// `None` when nothing was recognized.
    pub fn first_transcript(&self) -> Option<String> {
        self.results
            .first()
            .and_then(|result| result.alternatives.first())
            .map(|alt| alt.transcript.trim().to_string())
    }
}

/// Speech-to-text trait for transcribing audio to text.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Recognize speech in an audio payload.
    ///
    /// # Arguments
    /// * `audio_bytes` - Raw audio data
    /// * `content_type` - Audio MIME type (e.g., "audio/wav")
    async fn recognize(
        &self,
        audio_bytes: &[u8],
        content_type: &str,
    ) -> Result<Recognition, RemoteError>;

    /// Get the provider name.
    fn provider_name(&self) -> &str;
}
