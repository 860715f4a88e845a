//! Voyage AI adapter for batched text embeddings.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use super::error::{ErrorContext, ProviderError};
use super::types::{EmbedRequest, EmbedResponse};
use super::EmbedGateway;

/// Voyage AI embeddings adapter.
#[derive(Debug, Clone)]
pub struct VoyageAdapter {
    client: reqwest::Client,
    base_url: String,
}

impl VoyageAdapter {
    /// Create from API key with default endpoint and timeout.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Self::with_config(api_key, "https://api.voyageai.com", Duration::from_secs(60))
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self, ProviderError> {
        let api_key = std::env::var("VOYAGE_API_KEY")
            .map_err(|_| ProviderError::config("VOYAGE_API_KEY not set"))?;

        let base_url = std::env::var("VOYAGE_BASE_URL")
            .unwrap_or_else(|_| "https://api.voyageai.com".into());

        Self::with_config(api_key, base_url, Duration::from_secs(60))
    }

    /// Create with custom endpoint and timeout (tests point this at a mock
    /// server).
    pub fn with_config(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let api_key = api_key.into();
        let base_url = base_url.into();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let auth_value = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|_| ProviderError::config("Invalid API key format"))?;
        headers.insert(AUTHORIZATION, auth_value);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ProviderError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, base_url })
    }

    fn embeddings_url(&self) -> String {
        format!("{}/v1/embeddings", self.base_url)
    }
}

// =============================================================================
// API TYPES
// =============================================================================

#[derive(Serialize)]
struct EmbedApiRequest<'a> {
    input: &'a [String],
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbedApiResponse {
    data: Option<Vec<EmbedDatum>>,
    usage: Option<EmbedUsage>,
    detail: Option<String>,
}

#[derive(Deserialize)]
struct EmbedDatum {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbedUsage {
    total_tokens: Option<u32>,
}

// =============================================================================
// EMBED GATEWAY IMPL
// =============================================================================

#[async_trait]
impl EmbedGateway for VoyageAdapter {
    async fn embed(&self, req: EmbedRequest) -> Result<EmbedResponse, ProviderError> {
        let start = Instant::now();

        let api_req = EmbedApiRequest {
            input: &req.texts,
            model: &req.model,
        };

        let response = self
            .client
            .post(self.embeddings_url())
            .json(&api_req)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let ctx = ErrorContext::new().with_status(status.as_u16());
            let detail = serde_json::from_str::<EmbedApiResponse>(&body)
                .ok()
                .and_then(|r| r.detail)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

            return Err(match status.as_u16() {
                429 => ProviderError::rate_limited(Duration::from_secs(60), ctx),
                _ => ProviderError::provider_with_context(
                    "voyage",
                    detail,
                    status.as_u16() >= 500,
                    ctx,
                ),
            });
        }

        let parsed: EmbedApiResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::provider("voyage", format!("Invalid JSON: {e}"), false))?;

        let embeddings: Vec<Vec<f32>> = parsed
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|d| d.embedding)
            .collect();

        let tokens = parsed.usage.and_then(|u| u.total_tokens).unwrap_or(0);

        Ok(EmbedResponse {
            embeddings,
            tokens,
            latency: start.elapsed(),
        })
    }
}
