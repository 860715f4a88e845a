//! Score statistics and threshold derivation.
//!
//! Two threshold formulas coexist on purpose: the intermediate baseline
//! summary uses `min(scores) - stddev`, the final reference calibration
//! uses `mean - 1.96 * stddev`. They belong to different pipeline stages
//! and must not be unified.

/// Z multiplier for the final calibration threshold (two-sided 95%).
pub const FINAL_THRESHOLD_Z: f64 = 1.96;

/// Arithmetic mean. `None` for an empty slice.
pub fn mean(scores: &[f64]) -> Option<f64> {
    if scores.is_empty() {
        return None;
    }
    Some(scores.iter().sum::<f64>() / scores.len() as f64)
}

/// Population standard deviation: `sqrt(sum((x - mean)^2) / n)`.
pub fn std_dev(scores: &[f64]) -> Option<f64> {
    let m = mean(scores)?;
    let variance = scores.iter().map(|x| (x - m) * (x - m)).sum::<f64>() / scores.len() as f64;
    Some(variance.sqrt())
}

/// Final calibration threshold: `mean - 1.96 * stddev`.
pub fn threshold_final(scores: &[f64]) -> Option<f64> {
    Some(mean(scores)? - FINAL_THRESHOLD_Z * std_dev(scores)?)
}

/// Baseline summary threshold: `min(scores) - stddev`.
pub fn threshold_baseline(scores: &[f64]) -> Option<f64> {
    let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
    if !min.is_finite() {
        return None;
    }
    Some(min - std_dev(scores)?)
}

/// Per-turn statistics derived from one turn's baseline scores.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurnStats {
    pub mean: f64,
    pub std_dev: f64,
    /// Final calibration threshold (`mean - 1.96 * stddev`).
    pub threshold: f64,
}

impl TurnStats {
    /// `None` when `scores` is empty.
    pub fn from_scores(scores: &[f64]) -> Option<Self> {
        Some(Self {
            mean: mean(scores)?,
            std_dev: std_dev(scores)?,
            threshold: threshold_final(scores)?,
        })
    }
}
