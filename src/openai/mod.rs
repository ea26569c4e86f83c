pub mod client;
pub mod types;

pub use client::{CompletionClient, GenerationError, OpenAiClient};
pub use types::{CompletionRequest, ModelTier};
