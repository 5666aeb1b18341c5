//! Completion backend trait and normalized request/response types.
//!
//! The [`CompletionBackend`] trait is the narrow contract the analyzer
//! depends on: submit a system instruction and a user message, ask for a
//! JSON object, get raw reply text back. Built-in implementations:
//! [`OpenAiBackend`] for OpenAI-compatible APIs and [`MockBackend`] for tests.
//!
//! ```text
//! Analyzer ──► CompletionRequest ──► CompletionBackend::complete() ──► Completion
//!                                           │
//!                                ┌──────────┴──────────┐
//!                          OpenAiBackend           MockBackend
//!                      /v1/chat/completions      canned replies
//! ```

pub mod mock;
pub mod openai;

pub use mock::{MockBackend, MockReply};
pub use openai::OpenAiBackend;

use crate::error::Result;
use async_trait::async_trait;

/// Sampling and output-format options for a completion call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LlmConfig {
    /// Temperature; `None` leaves the provider default in place.
    pub temperature: Option<f64>,

    /// Maximum tokens to generate; `None` leaves the provider default in place.
    pub max_tokens: Option<u32>,

    /// Request a JSON-object formatted reply.
    pub json_mode: bool,
}

impl LlmConfig {
    pub fn with_temperature(mut self, temp: f64) -> Self {
        self.temperature = Some(temp);
        self
    }

    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    pub fn with_json_mode(mut self, enabled: bool) -> Self {
        self.json_mode = enabled;
        self
    }
}

/// A provider-agnostic completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Model identifier (e.g. `"gpt-4.1-mini"`).
    pub model: String,

    /// Conversation sent to the model, in order.
    pub messages: Vec<ChatMessage>,

    /// Sampling and format options.
    pub config: LlmConfig,
}

impl CompletionRequest {
    /// Content of the last user message, if any.
    pub fn user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }

    /// Content of the first system message, if any.
    pub fn system_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
    }
}

/// A single message in a chat conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// The role of the message author.
    pub role: Role,
    /// The message content.
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// The role of a chat message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// System instructions.
    System,
    /// User input.
    User,
    /// Assistant (model) response.
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A normalized completion reply.
#[derive(Debug, Clone)]
pub struct Completion {
    /// The generated text content, exactly as returned.
    pub text: String,

    /// HTTP status code (for diagnostics/logging).
    pub status: u16,

    /// Provider-specific metadata (token usage, model, response id).
    pub metadata: Option<serde_json::Value>,
}

/// Abstraction over text-completion providers.
///
/// Implementors own whatever they need to reach the provider (HTTP client,
/// base URL, credentials); the analyzer holds one as `Arc<dyn CompletionBackend>`
/// built at startup and never mutated afterwards.
///
/// Every failure to obtain reply text must surface as an error whose
/// [`kind`](crate::AnalyzerError::kind) is `BackendUnavailable`.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Execute a single, non-streaming completion call.
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion>;

    /// Human-readable name for logging and diagnostics.
    fn name(&self) -> &'static str;
}
