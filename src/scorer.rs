//! Per-scenario scoring session: run modes, reference cursor, threshold
//! reporting.
//!
//! One `Scorer` owns one scenario's reference file and cursor. The
//! conversation driver feeds each turn's assistant response into
//! [`Scorer::compare`], and optionally [`Scorer::fact_check`] and
//! [`Scorer::eval`]. What happens depends on the run mode; threshold
//! misses in evaluation mode are recorded and logged, never raised, so a
//! scenario always runs to completion and yields a full violation report.

use std::path::PathBuf;

use thiserror::Error;
use tracing::{info, warn};

use crate::criteria::{CriteriaError, CriteriaEvaluator, EvalReport};
use crate::factcheck::{ClaimVerifier, FactCheckError, FactCheckReport};
use crate::reference::{ReferenceRecord, ReferenceStore, RunLog, RunScore, StoreError};
use crate::similarity::{SimilarityClient, SimilarityError};

/// What a scoring session does with each turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Persist user/assistant text as new reference rows.
    Bootstrap,
    /// Score against the reference and accumulate run-log rows for later
    /// calibration.
    Baseline,
    /// Score and judge against calibrated thresholds.
    Evaluation,
    /// Compute and log similarity only; judging entry points are no-ops.
    #[default]
    Disabled,
}

impl RunMode {
    /// Parse the external run-mode flag. Exactly three values are
    /// recognized; anything else disables judging.
    pub fn from_flag(flag: &str) -> Self {
        match flag {
            "bootstrap" => RunMode::Bootstrap,
            "baseline" => RunMode::Baseline,
            "evaluation" => RunMode::Evaluation,
            _ => RunMode::Disabled,
        }
    }
}

/// Which check a violation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckKind {
    Similarity,
    FactCheck,
    Eval,
}

/// A below-threshold observation. Not an error: evaluation continues.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdViolation {
    /// Turn ordinal the check belongs to.
    pub turn: usize,
    pub kind: CheckKind,
    /// Threshold the score was expected to meet.
    pub expected: f64,
    /// Score actually observed.
    pub actual: f64,
}

#[derive(Debug, Error)]
pub enum ScorerError {
    #[error("reference file path is required")]
    MissingReferencePath,

    /// Bootstrap mode needs the user query to persist alongside the
    /// assistant text.
    #[error("user query must be provided in bootstrap mode")]
    MissingUserQuery,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Similarity(#[from] SimilarityError),

    #[error(transparent)]
    FactCheck(#[from] FactCheckError),

    #[error(transparent)]
    Criteria(#[from] CriteriaError),
}

/// Scorer configuration for one scenario.
#[derive(Debug, Clone)]
pub struct ScorerConfig {
    /// Reference CSV for this scenario.
    pub reference_path: PathBuf,
    /// Directory for baseline run logs.
    pub output_dir: PathBuf,
    pub run_mode: RunMode,
    /// Minimum fact-check pass rate (fraction of 1.0).
    pub fact_check_threshold: f64,
    /// Minimum criteria pass rate (fraction of 1.0).
    pub eval_threshold: f64,
}

impl ScorerConfig {
    pub fn new(reference_path: impl Into<PathBuf>, run_mode: RunMode) -> Self {
        Self {
            reference_path: reference_path.into(),
            output_dir: PathBuf::from("output"),
            run_mode,
            fact_check_threshold: 0.9,
            eval_threshold: 0.9,
        }
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn fact_check_threshold(mut self, threshold: f64) -> Self {
        self.fact_check_threshold = threshold;
        self
    }

    pub fn eval_threshold(mut self, threshold: f64) -> Self {
        self.eval_threshold = threshold;
        self
    }
}

/// Scoring session for one scenario.
pub struct Scorer {
    config: ScorerConfig,
    store: ReferenceStore,
    run_log: RunLog,
    reference: Vec<ReferenceRecord>,
    cursor: usize,
    similarity: SimilarityClient,
    fact_checker: ClaimVerifier,
    evaluator: CriteriaEvaluator,
    violations: Vec<ThresholdViolation>,
}

impl std::fmt::Debug for Scorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scorer")
            .field("config", &self.config)
            .field("cursor", &self.cursor)
            .finish_non_exhaustive()
    }
}

impl Scorer {
    /// Bootstrap the reference file if needed and load it into memory. The
    /// cursor starts before the first row.
    pub fn create(
        config: ScorerConfig,
        similarity: SimilarityClient,
        fact_checker: ClaimVerifier,
        evaluator: CriteriaEvaluator,
    ) -> Result<Self, ScorerError> {
        if config.reference_path.as_os_str().is_empty() {
            return Err(ScorerError::MissingReferencePath);
        }

        let store = ReferenceStore::new(&config.reference_path);
        store.create_if_missing()?;
        let reference = store.load()?;

        if config.run_mode == RunMode::Baseline {
            std::fs::create_dir_all(&config.output_dir).map_err(StoreError::Io)?;
        }
        let run_log = RunLog::for_reference(&config.reference_path, &config.output_dir);

        Ok(Self {
            config,
            store,
            run_log,
            reference,
            cursor: 0,
            similarity,
            fact_checker,
            evaluator,
            violations: Vec::new(),
        })
    }

    pub fn run_mode(&self) -> RunMode {
        self.config.run_mode
    }

    /// Loaded reference rows for this scenario.
    pub fn reference(&self) -> &[ReferenceRecord] {
        &self.reference
    }

    /// All below-threshold observations recorded so far.
    pub fn violations(&self) -> &[ThresholdViolation] {
        &self.violations
    }

    /// Score one turn's assistant response and advance the cursor.
    ///
    /// Returns the similarity score when one was computed (bootstrap mode
    /// and missing reference rows yield `None`).
    pub async fn compare(
        &mut self,
        candidate: &str,
        user_query: Option<&str>,
    ) -> Result<Option<f64>, ScorerError> {
        let turn = self.cursor;
        self.cursor += 1;

        if self.config.run_mode == RunMode::Bootstrap {
            let user = user_query.ok_or(ScorerError::MissingUserQuery)?;
            self.store.append_text_row(user, candidate)?;
            info!(turn, "reference row persisted");
            return Ok(None);
        }

        let Some(record) = self.reference.get(turn) else {
            warn!(turn, "no reference row for this turn, skipping comparison");
            return Ok(None);
        };
        let reference_text = record.assistant.clone();
        let threshold = record.threshold;

        let score = self.similarity.similarity(candidate, &reference_text).await?;
        info!(turn, score = (score * 100.0).floor() / 100.0, "similarity score");

        match self.config.run_mode {
            RunMode::Baseline => {
                self.run_log.append(RunScore {
                    id: turn as u32,
                    result: score,
                })?;
            }
            RunMode::Evaluation => {
                if let Some(threshold) = threshold {
                    if score < threshold {
                        warn!(
                            turn,
                            expected = threshold,
                            actual = score,
                            "similarity below calibrated threshold"
                        );
                        self.violations.push(ThresholdViolation {
                            turn,
                            kind: CheckKind::Similarity,
                            expected: threshold,
                            actual: score,
                        });
                    }
                }
            }
            RunMode::Disabled => {}
            RunMode::Bootstrap => unreachable!("handled above"),
        }

        Ok(Some(score))
    }

    /// Fact-check the response for the turn most recently compared.
    ///
    /// Judging is opt-in: outside evaluation mode this is a no-op.
    pub async fn fact_check(
        &mut self,
        queries: &[String],
        response: &str,
        use_cot: bool,
        threshold: Option<f64>,
    ) -> Result<Option<FactCheckReport>, ScorerError> {
        if self.config.run_mode != RunMode::Evaluation {
            return Ok(None);
        }

        let turn = self.cursor.saturating_sub(1);
        let expected = threshold.unwrap_or(self.config.fact_check_threshold);

        let report = self.fact_checker.verify(queries, response, use_cot).await?;
        let rate = report.pass_rate / 100.0;
        info!(turn, score = rate, "fact check score");

        if rate < expected {
            warn!(turn, expected, actual = rate, "fact check below threshold");
            self.violations.push(ThresholdViolation {
                turn,
                kind: CheckKind::FactCheck,
                expected,
                actual: rate,
            });
        }

        Ok(Some(report))
    }

    /// Evaluate free-text criteria for the turn most recently compared.
    ///
    /// Judging is opt-in: outside evaluation mode this is a no-op.
    pub async fn eval(
        &mut self,
        criteria: &[String],
        response: &str,
        use_cot: bool,
        knowledge_lookup: bool,
        threshold: Option<f64>,
    ) -> Result<Option<EvalReport>, ScorerError> {
        if self.config.run_mode != RunMode::Evaluation {
            return Ok(None);
        }

        let turn = self.cursor.saturating_sub(1);
        let expected = threshold.unwrap_or(self.config.eval_threshold);

        let report = self
            .evaluator
            .evaluate(criteria, response, use_cot, knowledge_lookup)
            .await?;
        let rate = report.pass_rate / 100.0;
        info!(turn, score = rate, "eval score");

        if rate < expected {
            warn!(turn, expected, actual = rate, "eval below threshold");
            self.violations.push(ThresholdViolation {
                turn,
                kind: CheckKind::Eval,
                expected,
                actual: rate,
            });
        }

        Ok(Some(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_mode_recognizes_exactly_three_flags() {
        assert_eq!(RunMode::from_flag("bootstrap"), RunMode::Bootstrap);
        assert_eq!(RunMode::from_flag("baseline"), RunMode::Baseline);
        assert_eq!(RunMode::from_flag("evaluation"), RunMode::Evaluation);
        assert_eq!(RunMode::from_flag("test"), RunMode::Disabled);
        assert_eq!(RunMode::from_flag(""), RunMode::Disabled);
    }

    #[test]
    fn config_builder_defaults() {
        let config = ScorerConfig::new("references/museum.csv", RunMode::Evaluation);
        assert_eq!(config.fact_check_threshold, 0.9);
        assert_eq!(config.eval_threshold, 0.9);
        assert_eq!(config.output_dir, PathBuf::from("output"));
    }
}
