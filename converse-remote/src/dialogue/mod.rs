//! Dialogue service clients.
//!
//! The gateway only talks to the [`DialogueService`] trait; [`WatsonAssistant`]
//! is the hosted implementation.

mod traits;
mod watson;

pub use traits::{
    DialogueService, GenericItem, MessageInput, MessageOptions, MessageOutput, MessageResponse,
    RuntimeEntity, RuntimeIntent,
};
pub use watson::WatsonAssistant;
