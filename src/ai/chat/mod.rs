mod core;
mod models;
pub use self::core::{ChatSession, CompletionClient, CompletionClientBuilder, PendingCompletion};
pub use models::{ChatState, Role, Transcript, TranscriptEvent, Turn};
