//! Post-baseline calibration: turn accumulated run-log scores into
//! per-turn statistics and acceptance thresholds.
//!
//! Runs once after all baseline repetitions complete. For every run log in
//! the output directory the scores are grouped by turn id, summarized, and
//! written twice: an intermediate baseline summary (threshold
//! `min - stddev`) beside the run log, and a full rewrite of the matching
//! reference file (threshold `mean - 1.96 * stddev`, plus the iteration
//! count). The rewrite preserves row order so turn ids stay aligned with
//! reference ordinals.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::reference::{CalibratedRecord, ReferenceStore, RunLog, StoreError};
use crate::stats::{self, TurnStats};

#[derive(Debug, Error)]
pub enum CalibrateError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// A run log references more turns than its reference file has rows.
    #[error("run log {log} has {turns} turns but reference {reference} has {rows} rows")]
    ReferenceMismatch {
        log: String,
        reference: String,
        turns: usize,
        rows: usize,
    },
}

/// Intermediate per-turn summary written beside the run log.
#[derive(Debug, Clone, Serialize)]
pub struct BaselineSummaryRow {
    pub id: u32,
    pub mean: f64,
    #[serde(rename = "stdDev")]
    pub std_dev: f64,
    /// Baseline-stage threshold: `min(scores) - stddev`.
    pub threshold: f64,
}

/// What one scenario's calibration produced.
#[derive(Debug, Clone)]
pub struct CalibrationOutcome {
    pub reference_path: PathBuf,
    pub turns: usize,
}

/// Calibration pass over one output directory.
#[derive(Debug, Clone)]
pub struct Calibrator {
    output_dir: PathBuf,
    references_dir: PathBuf,
    /// Number of baseline repetitions the scores came from; recorded in the
    /// rewritten reference.
    iterations: u32,
}

impl Calibrator {
    pub fn new(
        output_dir: impl Into<PathBuf>,
        references_dir: impl Into<PathBuf>,
        iterations: u32,
    ) -> Self {
        Self {
            output_dir: output_dir.into(),
            references_dir: references_dir.into(),
            iterations,
        }
    }

    /// Calibrate every run log in the output directory.
    pub fn run(&self) -> Result<Vec<CalibrationOutcome>, CalibrateError> {
        let mut outcomes = Vec::new();

        let mut log_paths: Vec<PathBuf> = fs::read_dir(&self.output_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with("-baseline.csv"))
            })
            .collect();
        log_paths.sort();

        for path in log_paths {
            outcomes.push(self.calibrate_log(&path)?);
        }

        Ok(outcomes)
    }

    /// Calibrate one run log and rewrite its reference file.
    pub fn calibrate_log(&self, log_path: &Path) -> Result<CalibrationOutcome, CalibrateError> {
        let log = RunLog::new(log_path);
        let by_turn = group_scores(&log)?;

        let reference_name = log.reference_file_name().unwrap_or_else(|| {
            // Run logs outside the naming convention map to themselves.
            log_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        });
        let reference_path = self.references_dir.join(&reference_name);

        let store = ReferenceStore::new(&reference_path);
        let reference = store.load()?;

        if by_turn.len() > reference.len() {
            return Err(CalibrateError::ReferenceMismatch {
                log: log_path.display().to_string(),
                reference: reference_path.display().to_string(),
                turns: by_turn.len(),
                rows: reference.len(),
            });
        }

        // Intermediate artifact: baseline-stage thresholds beside the log.
        let summary: Vec<BaselineSummaryRow> = by_turn
            .iter()
            .filter_map(|(&id, scores)| {
                Some(BaselineSummaryRow {
                    id,
                    mean: stats::mean(scores)?,
                    std_dev: stats::std_dev(scores)?,
                    threshold: stats::threshold_baseline(scores)?,
                })
            })
            .collect();
        self.write_summary(log_path, &summary)?;

        // Final artifact: reference rows enriched with z-score thresholds,
        // aligned by ordinal.
        let calibrated: Vec<CalibratedRecord> = by_turn
            .values()
            .zip(reference.iter())
            .filter_map(|(scores, record)| {
                let stats = TurnStats::from_scores(scores)?;
                Some(CalibratedRecord {
                    user: record.user.clone(),
                    assistant: record.assistant.clone(),
                    mean: stats.mean,
                    std_dev: stats.std_dev,
                    threshold: stats.threshold,
                    iterations: self.iterations,
                })
            })
            .collect();

        store.rewrite_calibrated(&calibrated)?;
        info!(
            reference = %reference_path.display(),
            turns = calibrated.len(),
            iterations = self.iterations,
            "reference calibrated"
        );

        Ok(CalibrationOutcome {
            reference_path,
            turns: calibrated.len(),
        })
    }

    fn write_summary(
        &self,
        log_path: &Path,
        rows: &[BaselineSummaryRow],
    ) -> Result<(), CalibrateError> {
        let stem = log_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("scenario-baseline");
        let path = self.output_dir.join(format!("{stem}-summary.csv"));

        let mut writer = csv::Writer::from_path(&path).map_err(StoreError::Csv)?;
        for row in rows {
            writer.serialize(row).map_err(StoreError::Csv)?;
        }
        writer.flush().map_err(StoreError::Io)?;
        Ok(())
    }
}

/// Group a run log's scores by turn id, ascending.
fn group_scores(log: &RunLog) -> Result<BTreeMap<u32, Vec<f64>>, CalibrateError> {
    let mut by_turn: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
    for score in log.load()? {
        by_turn.entry(score.id).or_default().push(score.result);
    }
    Ok(by_turn)
}
