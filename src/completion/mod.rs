//! Completion gateway: sends normalized prompts to the hosted chat model

pub mod cache;
pub mod client;
pub mod models;

pub use cache::ResponseCache;
pub use client::CompletionClient;
pub use models::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage};

use crate::error::CompletionError;
use async_trait::async_trait;

/// Instruction that limits the remote model to summarising text
pub const SYSTEM_PROMPT: &str = "You are SUSTAIN, a token-optimized AI wrapper. STRICTLY FOLLOW THESE RULES: \
1. You CANNOT schedule appointments, manage calendars, send emails, or interact with external services. \
2. If asked to perform an action, RESPOND: 'I cannot perform that action, but I can provide guidance.' \
3. Do NOT claim to automate anything. You ONLY summarize and optimize text.";

/// Appended to every user prompt
pub const BREVITY_SUFFIX: &str = " in <20 words.";

/// Text and usage returned by a successful completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub usage_tokens: u64,
}

/// Trait for completion providers
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Complete `prompt` with `model`. Failures are classified before they leave the provider.
    async fn complete(&self, model: &str, prompt: &str) -> Result<Completion, CompletionError>;
}

/// Messages sent upstream for an already-normalized prompt
pub fn build_messages(prompt: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(format!("{}{}", prompt, BREVITY_SUFFIX)),
    ]
}
