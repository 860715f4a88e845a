#![allow(dead_code)]

//! Scripted test doubles for the provider traits.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use verdict_harness::gateway::{
    ChatGateway, ChatRequest, ChatResponse, EmbedGateway, EmbedRequest, EmbedResponse,
    KnowledgeStore, ProviderError,
};

/// Chat gateway that replays a fixed list of replies in order.
pub struct ScriptedChat {
    replies: Mutex<VecDeque<String>>,
    calls: AtomicUsize,
}

impl ScriptedChat {
    pub fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|s| s.to_string()).collect()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatGateway for ScriptedChat {
    async fn chat(&self, _req: ChatRequest) -> Result<ChatResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(content) => Ok(ChatResponse {
                content,
                input_tokens: 1,
                output_tokens: 1,
                latency: Duration::from_millis(0),
            }),
            None => Err(ProviderError::provider("scripted", "script exhausted", false)),
        }
    }
}

/// Embedding gateway that maps each input text to a fixed vector.
///
/// Unknown texts embed to the unit x vector, so two unknown texts score 1.0.
pub struct MapEmbed {
    vectors: HashMap<String, Vec<f32>>,
}

impl MapEmbed {
    pub fn new(entries: &[(&str, &[f32])]) -> Self {
        Self {
            vectors: entries
                .iter()
                .map(|(text, v)| (text.to_string(), v.to_vec()))
                .collect(),
        }
    }
}

#[async_trait]
impl EmbedGateway for MapEmbed {
    async fn embed(&self, req: EmbedRequest) -> Result<EmbedResponse, ProviderError> {
        let embeddings = req
            .texts
            .iter()
            .map(|text| {
                self.vectors
                    .get(text)
                    .cloned()
                    .unwrap_or_else(|| vec![1.0, 0.0])
            })
            .collect();
        Ok(EmbedResponse {
            embeddings,
            tokens: 1,
            latency: Duration::from_millis(0),
        })
    }
}

/// Embedding gateway that always returns too few vectors.
pub struct TruncatedEmbed;

#[async_trait]
impl EmbedGateway for TruncatedEmbed {
    async fn embed(&self, _req: EmbedRequest) -> Result<EmbedResponse, ProviderError> {
        Ok(EmbedResponse {
            embeddings: vec![vec![1.0, 0.0]],
            tokens: 1,
            latency: Duration::from_millis(0),
        })
    }
}

/// Knowledge store backed by a fixed query -> documents map.
///
/// Queries without an entry return no documents.
pub struct MapStore {
    docs: HashMap<String, Vec<String>>,
    queries: Mutex<Vec<String>>,
}

impl MapStore {
    pub fn new(entries: &[(&str, &[&str])]) -> Self {
        Self {
            docs: entries
                .iter()
                .map(|(query, docs)| {
                    (
                        query.to_string(),
                        docs.iter().map(|d| d.to_string()).collect(),
                    )
                })
                .collect(),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self::new(&[])
    }

    /// Queries received, in order.
    pub fn seen_queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl KnowledgeStore for MapStore {
    async fn search(&self, query: &str) -> Result<Vec<String>, ProviderError> {
        self.queries.lock().unwrap().push(query.to_string());
        Ok(self.docs.get(query).cloned().unwrap_or_default())
    }
}
