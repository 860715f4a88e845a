//! Free-text criteria evaluation with optional knowledge-store lookup.
//!
//! Each criterion is judged against the assistant response. When lookup is
//! enabled, the judge first decides whether supplemental information is
//! needed and with what query; retrieved documents are then tried one by
//! one until the first satisfying judgment. A criterion approved once is
//! never re-checked.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::gateway::{knowledge::search_with_retries, KnowledgeStore, ProviderError};
use crate::judge::shapes::{BoolVerdict, QueryPlan, ThoughtsVerdict};
use crate::judge::{Judge, JudgeError};
use crate::prompts;

#[derive(Debug, Error)]
pub enum CriteriaError {
    #[error(transparent)]
    Judge(#[from] JudgeError),

    /// Knowledge store could not be reached within the retry budget.
    #[error(transparent)]
    Store(#[from] ProviderError),
}

/// Verdict for one criterion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CriterionVerdict {
    pub criterion: String,
    pub satisfied: bool,
}

/// Result of evaluating one assistant response against a criteria list.
#[derive(Debug, Clone)]
pub struct EvalReport {
    /// One verdict per criterion, in input order.
    pub criteria: Vec<CriterionVerdict>,
    /// Satisfied criteria as a percentage of all criteria, in [0, 100].
    pub pass_rate: f64,
}

#[derive(Clone)]
pub struct CriteriaEvaluator {
    judge: Judge,
    store: Arc<dyn KnowledgeStore>,
}

impl CriteriaEvaluator {
    pub fn new(judge: Judge, store: Arc<dyn KnowledgeStore>) -> Self {
        Self { judge, store }
    }

    /// Evaluate `criteria` against `response`.
    ///
    /// `knowledge_lookup` enables the per-criterion "does this need
    /// supplemental info" pre-check and document-augmented judging.
    pub async fn evaluate(
        &self,
        criteria: &[String],
        response: &str,
        use_cot: bool,
        knowledge_lookup: bool,
    ) -> Result<EvalReport, CriteriaError> {
        // Newlines in the response add nothing for the judge.
        let text = response.replace('\n', " ");

        for criterion in criteria {
            debug!(criterion, "criterion to check");
        }

        let mut satisfied = vec![false; criteria.len()];

        for (i, criterion) in criteria.iter().enumerate() {
            if satisfied[i] {
                continue;
            }

            let ok = if knowledge_lookup {
                self.check_with_lookup(criterion, &text, use_cot).await?
            } else {
                self.check_direct(criterion, &text, use_cot).await?
            };

            if ok {
                satisfied[i] = true;
                info!(criterion, "criterion satisfied");
            } else {
                info!(criterion, "criterion not satisfied");
            }
        }

        let verdicts: Vec<CriterionVerdict> = criteria
            .iter()
            .zip(&satisfied)
            .map(|(criterion, &ok)| CriterionVerdict {
                criterion: criterion.clone(),
                satisfied: ok,
            })
            .collect();

        Ok(EvalReport {
            pass_rate: pass_rate(&satisfied),
            criteria: verdicts,
        })
    }

    /// Judge the criterion against the response alone.
    async fn check_direct(
        &self,
        criterion: &str,
        text: &str,
        use_cot: bool,
    ) -> Result<bool, JudgeError> {
        let content = prompts::criteria_content(criterion, text);
        self.judge_verdict(prompts::criteria_check(use_cot), &content, use_cot)
            .await
    }

    /// Ask whether supplemental info is needed; if the judge returns a
    /// query, try each retrieved document until one satisfies the
    /// criterion, otherwise fall back to the direct check.
    async fn check_with_lookup(
        &self,
        criterion: &str,
        text: &str,
        use_cot: bool,
    ) -> Result<bool, CriteriaError> {
        let content = prompts::criteria_content(criterion, text);

        let plan: QueryPlan = if use_cot {
            self.judge
                .request(prompts::query_needed(true), &content, QueryPlan::is_valid_with_cot)
                .await?
        } else {
            self.judge
                .request(prompts::query_needed(false), &content, QueryPlan::is_valid)
                .await?
        };

        if let Some(thoughts) = &plan.thoughts {
            for thought in thoughts {
                debug!(criterion, thought, "lookup decision reasoning");
            }
        }

        let Some(query) = plan.query() else {
            debug!(criterion, "no supplemental info needed");
            return Ok(self.check_direct(criterion, text, use_cot).await?);
        };

        debug!(criterion, query, "supplemental info needed");

        let documents =
            search_with_retries(self.store.as_ref(), query, self.judge.config().max_retries)
                .await?;

        for document in &documents {
            let content = prompts::criteria_with_info_content(criterion, text, document);
            let ok = self
                .judge_verdict(prompts::criteria_check_with_info(use_cot), &content, use_cot)
                .await?;
            if ok {
                return Ok(true);
            }
            debug!(criterion, "document did not settle the criterion");
        }

        Ok(false)
    }

    /// One criterion judgment with the shape matching the CoT setting.
    async fn judge_verdict(
        &self,
        system: &'static str,
        content: &str,
        use_cot: bool,
    ) -> Result<bool, JudgeError> {
        if use_cot {
            let verdict: ThoughtsVerdict = self
                .judge
                .request(system, content, ThoughtsVerdict::is_valid)
                .await?;
            for thought in &verdict.thoughts {
                debug!(thought, "criterion check reasoning");
            }
            Ok(verdict.result)
        } else {
            let verdict: BoolVerdict = self
                .judge
                .request(system, content, BoolVerdict::is_valid)
                .await?;
            Ok(verdict.passed())
        }
    }
}

/// Percentage of `true` entries, 0 for an empty list.
fn pass_rate(satisfied: &[bool]) -> f64 {
    if satisfied.is_empty() {
        return 0.0;
    }
    let passed = satisfied.iter().filter(|&&v| v).count();
    passed as f64 / satisfied.len() as f64 * 100.0
}
