//! Claim extraction and two-phase verification against the knowledge store.
//!
//! Claims are extracted once per response, then verified in two passes:
//! first against documents retrieved for the original user queries, then -
//! for anything still unverified - against documents retrieved with a
//! broadened per-claim query. A claim confirmed once is never probed again,
//! and every extracted claim ends up in exactly one verdict.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::gateway::{knowledge::search_with_retries, KnowledgeStore, ProviderError};
use crate::judge::shapes::{BoolVerdict, ClaimList, ThoughtsVerdict};
use crate::judge::{Judge, JudgeError};
use crate::prompts;

#[derive(Debug, Error)]
pub enum FactCheckError {
    /// Claim extraction or claim checking ran out of judge retries.
    #[error(transparent)]
    Judge(#[from] JudgeError),

    /// Knowledge store could not be reached within the retry budget.
    #[error(transparent)]
    Store(#[from] ProviderError),
}

/// Final verdict for one extracted claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimVerdict {
    pub claim: String,
    pub verified: bool,
}

/// Result of fact-checking one assistant response.
#[derive(Debug, Clone)]
pub struct FactCheckReport {
    /// One verdict per extracted claim, in extraction order.
    pub claims: Vec<ClaimVerdict>,
    /// Verified claims as a percentage of all claims, in [0, 100].
    pub pass_rate: f64,
}

/// Fact checker: extracts claims and verifies them against retrieved
/// documents.
#[derive(Clone)]
pub struct ClaimVerifier {
    judge: Judge,
    store: Arc<dyn KnowledgeStore>,
}

impl ClaimVerifier {
    pub fn new(judge: Judge, store: Arc<dyn KnowledgeStore>) -> Self {
        Self { judge, store }
    }

    /// Verify the claims made in `response` using documents retrieved for
    /// `queries`.
    pub async fn verify(
        &self,
        queries: &[String],
        response: &str,
        use_cot: bool,
    ) -> Result<FactCheckReport, FactCheckError> {
        // The validator requires at least two claims; fewer exhausts the
        // retry budget and fails extraction.
        let extracted: ClaimList = self
            .judge
            .request(prompts::CLAIM_EXTRACTION, response, ClaimList::is_valid)
            .await?;

        let claims = extracted.claims;
        for claim in &claims {
            debug!(claim, "extracted claim");
        }

        let mut verified = vec![false; claims.len()];
        let max_retries = self.judge.config().max_retries;

        // Phase 1: documents retrieved for the original queries, probing
        // every still-unverified claim against each document.
        for query in queries {
            let documents = search_with_retries(self.store.as_ref(), query, max_retries).await?;
            debug!(query, documents = documents.len(), "direct retrieval");

            for document in &documents {
                for (i, claim) in claims.iter().enumerate() {
                    if verified[i] {
                        continue;
                    }
                    if self.check_claim(claim, document, use_cot).await? {
                        verified[i] = true;
                        info!(claim, "claim verified (direct)");
                    }
                }
            }
        }

        // Phase 2: broadened per-claim retrieval for whatever phase 1 left
        // unverified. First confirmation moves on to the next claim.
        for (i, claim) in claims.iter().enumerate() {
            if verified[i] {
                continue;
            }

            'queries: for query in queries {
                let extended = format!("{query}, {claim}");
                let documents =
                    search_with_retries(self.store.as_ref(), &extended, max_retries).await?;
                debug!(claim, query = %extended, documents = documents.len(), "broadened retrieval");

                for document in &documents {
                    if self.check_claim(claim, document, use_cot).await? {
                        verified[i] = true;
                        info!(claim, "claim verified (broadened)");
                        break 'queries;
                    }
                }
            }
        }

        let verdicts: Vec<ClaimVerdict> = claims
            .iter()
            .zip(&verified)
            .map(|(claim, &ok)| {
                if ok {
                    info!(claim, "claim check passed");
                } else {
                    info!(claim, "claim check failed");
                }
                ClaimVerdict {
                    claim: claim.clone(),
                    verified: ok,
                }
            })
            .collect();

        Ok(FactCheckReport {
            pass_rate: pass_rate(&verified),
            claims: verdicts,
        })
    }

    /// One claim-vs-document judgment. The chain-of-thought variant logs the
    /// reasoning trail before the verdict; control flow is identical.
    async fn check_claim(
        &self,
        claim: &str,
        document: &str,
        use_cot: bool,
    ) -> Result<bool, JudgeError> {
        let content = prompts::claim_check_content(claim, document);

        if use_cot {
            let verdict: ThoughtsVerdict = self
                .judge
                .request(prompts::claim_check(true), &content, ThoughtsVerdict::is_valid)
                .await?;
            for thought in &verdict.thoughts {
                debug!(claim, thought, "claim check reasoning");
            }
            Ok(verdict.result)
        } else {
            let verdict: BoolVerdict = self
                .judge
                .request(prompts::claim_check(false), &content, BoolVerdict::is_valid)
                .await?;
            Ok(verdict.passed())
        }
    }
}

/// Percentage of `true` entries, 0 for an empty list.
fn pass_rate(verified: &[bool]) -> f64 {
    if verified.is_empty() {
        return 0.0;
    }
    let passed = verified.iter().filter(|&&v| v).count();
    passed as f64 / verified.len() as f64 * 100.0
}
