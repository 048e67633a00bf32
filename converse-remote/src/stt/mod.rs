//! Speech-to-text (STT) clients.
//!
//! Trait-based so the gateway can be exercised against in-memory fakes;
//! [`WatsonStt`] is the hosted implementation.

mod traits;
mod watson;

pub use traits::{Recognition, SpeechAlternative, SpeechResult, SpeechToText};
pub use watson::WatsonStt;
