//! Retry-tolerant structured judgments from the LLM.
//!
//! Every judgment is one system prompt plus one user message, decoded
//! deterministically, and must come back as JSON matching a call-site
//! specific shape. Transport errors, unparseable replies and well-formed
//! replies of the wrong shape all consume the same retry budget: each is an
//! unusable response, though they are told apart in the logs. A reply that
//! parses and validates with a negative `result` is a valid outcome and is
//! never retried.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::warn;

use crate::gateway::{ChatGateway, ChatRequest, Message};

/// Default judge retry budget.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

#[derive(Debug, Error)]
pub enum JudgeError {
    /// No valid response within the retry budget. Fatal for this judgment.
    #[error("judge retries exhausted after {attempts} attempts")]
    RetryExhausted { attempts: u32 },
}

/// Judge configuration: model, output bound, retry ceiling.
#[derive(Debug, Clone)]
pub struct JudgeConfig {
    /// Model identifier sent with every judgment.
    pub model: String,
    /// Maximum output tokens per judgment.
    pub max_tokens: u32,
    /// Attempts before giving up on a judgment.
    pub max_retries: u32,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            model: "claude-3-5-sonnet-latest".into(),
            max_tokens: 8192,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl JudgeConfig {
    /// Read model and output bound from `ANTHROPIC_MODEL` / `MAX_TOKEN_OUTPUT`,
    /// falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            model: std::env::var("ANTHROPIC_MODEL").unwrap_or(defaults.model),
            max_tokens: std::env::var("MAX_TOKEN_OUTPUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_tokens),
            max_retries: defaults.max_retries,
        }
    }
}

/// LLM judge with a bounded request/parse/validate retry loop.
#[derive(Clone)]
pub struct Judge {
    gateway: Arc<dyn ChatGateway>,
    config: JudgeConfig,
}

impl Judge {
    pub fn new(gateway: Arc<dyn ChatGateway>, config: JudgeConfig) -> Self {
        Self { gateway, config }
    }

    pub fn config(&self) -> &JudgeConfig {
        &self.config
    }

    /// Request a judgment of shape `R`.
    ///
    /// Sends `user` under `system`, parses the newline-stripped reply as
    /// JSON, and applies `validate`. Fails with
    /// [`JudgeError::RetryExhausted`] after `max_retries` consecutive
    /// unusable responses.
    pub async fn request<R, F>(
        &self,
        system: &str,
        user: &str,
        validate: F,
    ) -> Result<R, JudgeError>
    where
        R: DeserializeOwned,
        F: Fn(&R) -> bool,
    {
        for attempt in 1..=self.config.max_retries {
            let req = ChatRequest::new(&self.config.model, vec![Message::user(user)])
                .system(system)
                .temperature(0.0)
                .max_tokens(self.config.max_tokens);

            let content = match self.gateway.chat(req).await {
                Ok(resp) => resp.content,
                Err(e) => {
                    warn!(
                        cause = "transport",
                        code = e.code(),
                        attempt,
                        max_retries = self.config.max_retries,
                        error = %e,
                        "judge call failed, retrying"
                    );
                    continue;
                }
            };

            // Some judges wrap JSON across lines; strip newlines before parsing.
            let flattened = content.replace('\n', "");

            let parsed: R = match serde_json::from_str(&flattened) {
                Ok(v) => v,
                Err(e) => {
                    warn!(
                        cause = "parse",
                        attempt,
                        max_retries = self.config.max_retries,
                        error = %e,
                        "judge reply was not valid JSON, retrying"
                    );
                    continue;
                }
            };

            if validate(&parsed) {
                return Ok(parsed);
            }

            warn!(
                cause = "shape",
                attempt,
                max_retries = self.config.max_retries,
                "judge reply did not match the expected shape, retrying"
            );
        }

        Err(JudgeError::RetryExhausted {
            attempts: self.config.max_retries,
        })
    }
}

// =============================================================================
// RESPONSE SHAPES
// =============================================================================

/// Typed judge-response shapes and their validators.
///
/// Each judge call site expects exactly one of these; the shape is resolved
/// by typed deserialization plus an `is_valid` check rather than by probing
/// fields.
pub mod shapes {
    use serde::{Deserialize, Deserializer};

    /// Requires the field to be present; null still maps to `None`.
    fn nullable<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer)
    }

    /// `{result: bool}` - a plain true/false verdict. `null` is accepted and
    /// counts as a negative verdict, not a malformed reply.
    #[derive(Debug, Clone, Deserialize)]
    pub struct BoolVerdict {
        #[serde(deserialize_with = "nullable")]
        pub result: Option<bool>,
    }

    impl BoolVerdict {
        pub fn is_valid(&self) -> bool {
            true
        }

        pub fn passed(&self) -> bool {
            self.result == Some(true)
        }
    }

    /// `{thoughts: [text], result: bool}` - verdict with a chain-of-thought
    /// reasoning trail.
    #[derive(Debug, Clone, Deserialize)]
    pub struct ThoughtsVerdict {
        pub thoughts: Vec<String>,
        pub result: bool,
    }

    impl ThoughtsVerdict {
        pub fn is_valid(&self) -> bool {
            !self.thoughts.is_empty()
        }
    }

    /// `{claims: [text]}` - atomic claims extracted from a response. A
    /// single claim (or none) means extraction failed.
    #[derive(Debug, Clone, Deserialize)]
    pub struct ClaimList {
        pub claims: Vec<String>,
    }

    impl ClaimList {
        pub fn is_valid(&self) -> bool {
            self.claims.len() > 1
        }
    }

    /// `{db_query: text}` with an optional `{thoughts}` trail - whether a
    /// criterion needs supplemental knowledge-store lookup, and with what
    /// query.
    #[derive(Debug, Clone, Deserialize)]
    pub struct QueryPlan {
        #[serde(deserialize_with = "nullable")]
        pub db_query: Option<String>,
        #[serde(default, deserialize_with = "nullable")]
        pub thoughts: Option<Vec<String>>,
    }

    impl QueryPlan {
        pub fn is_valid(&self) -> bool {
            true
        }

        pub fn is_valid_with_cot(&self) -> bool {
            self.thoughts.is_some()
        }

        /// The lookup query, if the judge decided one is needed.
        pub fn query(&self) -> Option<&str> {
            self.db_query
                .as_deref()
                .map(str::trim)
                .filter(|q| !q.is_empty())
        }
    }
}
