//! LLM Module - chat-completion abstraction used by every insight task
//!
//! The pipeline only needs one capability from a model: turn an ordered list
//! of role-tagged messages into text. Providers implement [`CompletionClient`];
//! the production one is [`OpenAIClient`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod openai;

pub use openai::OpenAIClient;

/// A chat message with role and content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into() }
    }
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }
    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: content.into() }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

/// One chat-completion call.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: usize,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>, max_tokens: usize) -> Self {
        Self {
            model: model.into(),
            messages,
            max_tokens,
        }
    }
}

/// Why a completion call produced no text.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("API key not configured")]
    MissingApiKey,

    #[error("request to {endpoint} timed out")]
    Timeout { endpoint: String },

    #[error("failed to connect to {endpoint}: {message}")]
    Connect { endpoint: String, message: String },

    #[error("request to {endpoint} failed: {message}")]
    Request { endpoint: String, message: String },

    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("invalid response from {endpoint}: {message}")]
    InvalidResponse { endpoint: String, message: String },

    #[error("completion returned no content")]
    EmptyResponse,
}

/// Core trait for chat-completion providers.
///
/// Calls are independent: implementations hold no per-conversation state, the
/// caller passes the full history every time.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError>;
}
