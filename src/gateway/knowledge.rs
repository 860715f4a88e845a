//! Knowledge store client: semantic search over the chatbot's document base.
//!
//! The store is a black box behind one endpoint: `POST {query}` returns
//! `{documents}`. Any document list, including an empty one, is a valid
//! answer - claim and criteria judging handle "nothing retrieved" themselves.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::error::{ErrorContext, ProviderError};

/// Semantic search over the chatbot's knowledge base.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<String>, ProviderError>;
}

/// Search with a bounded retry loop.
///
/// Store transport failures get the same treatment as unusable judge
/// replies: log, consume an attempt, surface the last error once the budget
/// runs out.
pub async fn search_with_retries(
    store: &dyn KnowledgeStore,
    query: &str,
    max_retries: u32,
) -> Result<Vec<String>, ProviderError> {
    let mut last_error = None;

    for attempt in 1..=max_retries {
        match store.search(query).await {
            Ok(documents) => return Ok(documents),
            Err(e) => {
                warn!(
                    cause = "transport",
                    code = e.code(),
                    attempt,
                    max_retries,
                    error = %e,
                    "knowledge store query failed, retrying"
                );
                last_error = Some(e);
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| ProviderError::provider("knowledge_store", "no attempts made", false)))
}

/// HTTP adapter for the knowledge store endpoint.
#[derive(Debug, Clone)]
pub struct HttpKnowledgeStore {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpKnowledgeStore {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, ProviderError> {
        Self::with_timeout(endpoint, Duration::from_secs(60))
    }

    /// Create from the `CHATBOT_DB_API` environment variable.
    pub fn from_env() -> Result<Self, ProviderError> {
        let endpoint = std::env::var("CHATBOT_DB_API")
            .map_err(|_| ProviderError::config("CHATBOT_DB_API not set"))?;
        Self::new(endpoint)
    }

    pub fn with_timeout(
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
}

#[derive(Deserialize)]
struct SearchResponse {
    documents: Option<Vec<String>>,
}

#[async_trait]
impl KnowledgeStore for HttpKnowledgeStore {
    async fn search(&self, query: &str) -> Result<Vec<String>, ProviderError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&SearchRequest { query })
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let ctx = ErrorContext::new().with_status(status.as_u16());
            return Err(ProviderError::provider_with_context(
                "knowledge_store",
                format!("HTTP {}", status.as_u16()),
                status.as_u16() >= 500,
                ctx,
            ));
        }

        let parsed: SearchResponse = response.json().await.map_err(|e| {
            ProviderError::provider("knowledge_store", format!("Invalid JSON: {e}"), false)
        })?;

        Ok(parsed.documents.unwrap_or_default())
    }
}
