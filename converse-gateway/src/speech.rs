//! Speech passthroughs: text to audio and audio to text.
//!
//! Neither direction touches conversation sessions.

use converse_remote::{RemoteError, SpeechToText, SynthesisOptions, TextToSpeech};

/// Spoken when there is nothing to synthesize.
pub const NO_RESPONSE_TEXT: &str = "I have no response to that.";
/// Returned when nothing intelligible was heard or recognition failed.
pub const NOT_UNDERSTOOD_TEXT: &str = "Sorry, didn't get that. please try again!";
/// Returned when synthesis failed.
pub const SYNTHESIS_FAILED_TEXT: &str = "Sorry, speech synthesis failed. please try again!";

/// Content type of uploaded recordings.
pub const RECORDING_CONTENT_TYPE: &str = "audio/wav";

/// What a synthesis request produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Synthesis {
    /// Audio bytes from the remote service.
    Audio(Vec<u8>),
    /// Nothing to synthesize; the fixed substitute text.
    Placeholder(&'static str),
}

/// Synthesize `text`, or return the placeholder when it is empty.
///
/// An empty or absent `voice` falls back to the service default.
pub async fn synthesize(
    tts: &dyn TextToSpeech,
    text: Option<&str>,
    voice: Option<&str>,
) -> Result<Synthesis, RemoteError> {
    let Some(text) = text.filter(|t| !t.is_empty()) else {
        return Ok(Synthesis::Placeholder(NO_RESPONSE_TEXT));
    };

    let voice = voice.filter(|v| !v.is_empty()).map(str::to_string);
    let audio = tts.synthesize(text, SynthesisOptions::with_voice(voice)).await?;
    tracing::debug!(bytes = audio.len(), provider = tts.provider_name(), "Synthesized speech");
    Ok(Synthesis::Audio(audio))
}

/// Transcribe a WAV recording.
///
/// Zero results, or an empty upload, yield the retry message instead of an
/// empty string.
pub async fn transcribe(stt: &dyn SpeechToText, audio: &[u8]) -> Result<String, RemoteError> {
    if audio.is_empty() {
        return Ok(NOT_UNDERSTOOD_TEXT.to_string());
    }

    let recognition = stt.recognize(audio, RECORDING_CONTENT_TYPE).await?;
    match recognition.first_transcript() {
        Some(transcript) => {
            tracing::debug!(chars = transcript.len(), "Transcribed speech");
            Ok(transcript)
        }
        None => Ok(NOT_UNDERSTOOD_TEXT.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeStt, FakeTts};

    #[tokio::test]
    async fn empty_text_returns_placeholder_without_remote_call() {
        let tts = FakeTts::new("en-US_AllisonVoice");
        for text in [None, Some("")] {
            let out = synthesize(&tts, text, None).await.unwrap();
            assert_eq!(out, Synthesis::Placeholder("I have no response to that."));
        }
        assert_eq!(tts.calls(), 0);
    }

    #[tokio::test]
    async fn whitespace_text_is_still_synthesized() {
        let tts = FakeTts::new("en-US_AllisonVoice");
        let out = synthesize(&tts, Some("  "), None).await.unwrap();
        assert_eq!(out, Synthesis::Audio(b"RIFFen-US_AllisonVoice:  ".to_vec()));
        assert_eq!(tts.calls(), 1);
    }

    #[tokio::test]
    async fn absent_or_blank_voice_uses_default() {
        let tts = FakeTts::new("en-US_AllisonVoice");
        for voice in [None, Some("")] {
            let out = synthesize(&tts, Some("hi"), voice).await.unwrap();
            assert_eq!(out, Synthesis::Audio(b"RIFFen-US_AllisonVoice:hi".to_vec()));
        }

        let out = synthesize(&tts, Some("hi"), Some("en-GB_KateV3Voice"))
            .await
            .unwrap();
        assert_eq!(out, Synthesis::Audio(b"RIFFen-GB_KateV3Voice:hi".to_vec()));
    }

    #[tokio::test]
    async fn synthesis_failure_propagates() {
        let tts = FakeTts::failing();
        assert!(synthesize(&tts, Some("hi"), None).await.is_err());
    }

    #[tokio::test]
    async fn transcript_is_returned_trimmed() {
        let stt = FakeStt::hearing("  turn on the lights ");
        assert_eq!(transcribe(&stt, b"RIFF").await.unwrap(), "turn on the lights");
    }

    #[tokio::test]
    async fn zero_results_yield_retry_message() {
        let stt = FakeStt::silent();
        assert_eq!(
            transcribe(&stt, b"RIFF").await.unwrap(),
            "Sorry, didn't get that. please try again!"
        );
        assert_eq!(stt.calls(), 1);
    }

    #[tokio::test]
    async fn empty_upload_skips_remote_call() {
        let stt = FakeStt::hearing("unused");
        assert_eq!(transcribe(&stt, b"").await.unwrap(), NOT_UNDERSTOOD_TEXT);
        assert_eq!(stt.calls(), 0);
    }
}
