#![forbid(unsafe_code)]

//! # verdict-harness
//!
//! Evaluation harness for scripted conversations against a live chatbot.
//!
//! Each assistant response is scored against a reference answer by
//! embedding cosine similarity, fact-checked claim by claim against a
//! knowledge store, and judged against free-text criteria by an LLM with a
//! bounded retry loop. Acceptance thresholds are not hand-picked: a
//! baseline mode repeats the scenario suite many times, accumulates
//! per-turn score distributions, and a calibration pass derives per-turn
//! thresholds (`mean - 1.96 * stddev`) that get written back into the
//! reference files.
//!
//! Threshold misses are observations, not errors - a scenario always runs
//! to completion and produces a full violation report.

pub mod calibrate;
pub mod criteria;
pub mod factcheck;
pub mod gateway;
pub mod judge;
pub mod prompts;
pub mod reference;
pub mod scorer;
pub mod similarity;
pub mod stats;

pub use calibrate::{CalibrateError, CalibrationOutcome, Calibrator};
pub use criteria::{CriteriaError, CriteriaEvaluator, CriterionVerdict, EvalReport};
pub use factcheck::{ClaimVerdict, ClaimVerifier, FactCheckError, FactCheckReport};
pub use gateway::{
    AnthropicAdapter, ChatGateway, EmbedGateway, HttpKnowledgeStore, KnowledgeStore,
    ProviderError, VoyageAdapter,
};
pub use judge::{Judge, JudgeConfig, JudgeError};
pub use reference::{ReferenceRecord, ReferenceStore, RunLog, RunScore};
pub use scorer::{CheckKind, RunMode, Scorer, ScorerConfig, ScorerError, ThresholdViolation};
pub use similarity::{SimilarityClient, SimilarityError};
