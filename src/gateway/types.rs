//! Core types for the provider gateway.

use serde::{Deserialize, Serialize};
use std::time::Duration;

// =============================================================================
// CHAT TYPES
// =============================================================================

/// Chat message role.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
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

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Request for a single-turn chat completion.
///
/// The judge always sends one system prompt plus one user message with
/// deterministic decoding, but the request type stays general so adapters
/// can be reused outside the judge.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Model identifier, e.g. "claude-3-5-sonnet-latest".
    pub model: String,
    /// System prompt, sent out-of-band from the message list.
    pub system: Option<String>,
    /// Conversation messages.
    pub messages: Vec<Message>,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            system: None,
            messages,
            temperature: 0.0,
            max_tokens: 8192,
        }
    }

    pub fn system(mut self, prompt: impl Into<String>) -> Self {
        self.system = Some(prompt.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.temperature = t;
        self
    }

    pub fn max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = max;
        self
    }
}

/// Response from a chat completion.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// Generated content.
    pub content: String,
    /// Input tokens consumed.
    pub input_tokens: u32,
    /// Output tokens generated.
    pub output_tokens: u32,
    /// Time taken for the request.
    pub latency: Duration,
}

// =============================================================================
// EMBEDDING TYPES
// =============================================================================

/// Request to embed texts. Each text produces one embedding vector.
#[derive(Debug, Clone)]
pub struct EmbedRequest {
    /// Embedding model identifier, e.g. "voyage-3".
    pub model: String,
    /// Texts to embed, in order.
    pub texts: Vec<String>,
}

impl EmbedRequest {
    pub fn new(model: impl Into<String>, texts: Vec<String>) -> Self {
        Self {
            model: model.into(),
            texts,
        }
    }

    /// Convenience constructor for the similarity path: candidate and
    /// reference embedded in one batched call.
    pub fn pair(
        model: impl Into<String>,
        candidate: impl Into<String>,
        reference: impl Into<String>,
    ) -> Self {
        Self::new(model, vec![candidate.into(), reference.into()])
    }
}

/// Response from an embedding request.
#[derive(Debug, Clone)]
pub struct EmbedResponse {
    /// Embedding vectors, one per input text, in input order.
    pub embeddings: Vec<Vec<f32>>,
    /// Total tokens consumed.
    pub tokens: u32,
    /// Time taken for the request.
    pub latency: Duration,
}
