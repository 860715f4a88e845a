//! Provider gateway: traits and adapters for the LLM judge, the embedding
//! service, and the knowledge store.
//!
//! Each remote service sits behind a trait so the evaluation core can be
//! exercised with test doubles. Adapters speak the concrete wire formats
//! (Anthropic Messages, Voyage embeddings, knowledge-store HTTP API).
//!
//! The gateway itself does not retry. Transport failures surface to the
//! judge, where they share one retry budget with malformed responses.

pub mod anthropic;
pub mod error;
pub mod knowledge;
pub mod types;
pub mod voyage;

pub use anthropic::AnthropicAdapter;
pub use error::{ErrorContext, ProviderError};
pub use knowledge::{search_with_retries, HttpKnowledgeStore, KnowledgeStore};
pub use types::*;
pub use voyage::VoyageAdapter;

/// Chat completion provider used by the LLM judge.
#[async_trait::async_trait]
pub trait ChatGateway: Send + Sync {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, ProviderError>;
}

/// Embedding provider used for similarity scoring.
#[async_trait::async_trait]
pub trait EmbedGateway: Send + Sync {
    async fn embed(&self, req: EmbedRequest) -> Result<EmbedResponse, ProviderError>;
}
