//! Text-to-speech (TTS) clients.

mod traits;
mod watson;

pub use traits::{SynthesisOptions, TextToSpeech};
pub use watson::WatsonTts;
