use std::fs;
use std::path::Path;

use tempfile::tempdir;

use verdict_harness::calibrate::{CalibrateError, Calibrator};
use verdict_harness::reference::{ReferenceStore, RunLog, RunScore};

fn seed_reference(path: &Path) {
    let store = ReferenceStore::new(path);
    store.append_text_row("hello", "hi there").unwrap();
    store
        .append_text_row("when do you open?", "we open at 9am")
        .unwrap();
}

fn seed_run_log(path: &Path, per_turn: &[(u32, &[f64])]) {
    let log = RunLog::new(path);
    // Interleave turns the way repeated baseline runs would.
    let runs = per_turn.iter().map(|(_, s)| s.len()).max().unwrap_or(0);
    for run in 0..runs {
        for (id, scores) in per_turn {
            if let Some(&score) = scores.get(run) {
                log.append(RunScore { id: *id, result: score }).unwrap();
            }
        }
    }
}

#[test]
fn calibration_rewrites_the_reference_with_final_thresholds() {
    let dir = tempdir().unwrap();
    let output_dir = dir.path().join("output");
    let references_dir = dir.path().join("references");
    fs::create_dir_all(&output_dir).unwrap();
    fs::create_dir_all(&references_dir).unwrap();

    seed_reference(&references_dir.join("museum.csv"));
    seed_run_log(
        &output_dir.join("museum-baseline.csv"),
        &[
            (0, &[0.8, 0.85, 0.9, 0.75][..]),
            (1, &[0.9, 0.9, 0.9, 0.9][..]),
        ],
    );

    let calibrator = Calibrator::new(&output_dir, &references_dir, 4);
    let outcomes = calibrator.run().unwrap();

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].turns, 2);
    assert_eq!(
        outcomes[0].reference_path,
        references_dir.join("museum.csv")
    );

    let records = ReferenceStore::new(references_dir.join("museum.csv"))
        .load()
        .unwrap();
    assert_eq!(records.len(), 2);

    // Turn 0: mean 0.825, population stddev ~0.0559, threshold
    // mean - 1.96 * stddev ~0.7154.
    assert_eq!(records[0].user, "hello");
    assert!((records[0].mean.unwrap() - 0.825).abs() < 1e-9);
    assert!((records[0].std_dev.unwrap() - 0.0559).abs() < 1e-3);
    assert!((records[0].threshold.unwrap() - 0.7154).abs() < 1e-3);
    assert_eq!(records[0].iterations, Some(4));

    // Turn 1: no spread, so the threshold equals the mean.
    assert!((records[1].mean.unwrap() - 0.9).abs() < 1e-9);
    assert!(records[1].std_dev.unwrap().abs() < 1e-9);
    assert!((records[1].threshold.unwrap() - 0.9).abs() < 1e-9);
}

#[test]
fn calibration_writes_an_intermediate_baseline_summary() {
    let dir = tempdir().unwrap();
    let output_dir = dir.path().join("output");
    let references_dir = dir.path().join("references");
    fs::create_dir_all(&output_dir).unwrap();
    fs::create_dir_all(&references_dir).unwrap();

    seed_reference(&references_dir.join("museum.csv"));
    seed_run_log(
        &output_dir.join("museum-baseline.csv"),
        &[
            (0, &[0.8, 0.85, 0.9, 0.75][..]),
            (1, &[0.9, 0.9, 0.9, 0.9][..]),
        ],
    );

    Calibrator::new(&output_dir, &references_dir, 4)
        .run()
        .unwrap();

    let summary_path = output_dir.join("museum-baseline-summary.csv");
    let raw = fs::read_to_string(&summary_path).unwrap();

    let mut reader = csv::Reader::from_path(&summary_path).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(&headers, &vec!["id", "mean", "stdDev", "threshold"]);

    // Baseline-stage threshold is min - stddev: 0.75 - 0.0559 ~0.6941.
    let rows: Vec<Vec<String>> = raw
        .lines()
        .skip(1)
        .map(|l| l.split(',').map(str::to_string).collect())
        .collect();
    assert_eq!(rows.len(), 2);
    let threshold: f64 = rows[0][3].parse().unwrap();
    assert!((threshold - 0.6941).abs() < 1e-3);
}

#[test]
fn calibration_is_idempotent_over_the_reference_file() {
    let dir = tempdir().unwrap();
    let output_dir = dir.path().join("output");
    let references_dir = dir.path().join("references");
    fs::create_dir_all(&output_dir).unwrap();
    fs::create_dir_all(&references_dir).unwrap();

    let reference_path = references_dir.join("museum.csv");
    seed_reference(&reference_path);
    seed_run_log(
        &output_dir.join("museum-baseline.csv"),
        &[(0, &[0.8, 0.9][..]), (1, &[0.7, 0.7][..])],
    );

    let calibrator = Calibrator::new(&output_dir, &references_dir, 2);
    calibrator.run().unwrap();
    let first = fs::read_to_string(&reference_path).unwrap();

    calibrator.run().unwrap();
    let second = fs::read_to_string(&reference_path).unwrap();

    assert_eq!(first, second);
}

#[test]
fn run_log_with_more_turns_than_reference_rows_is_rejected() {
    let dir = tempdir().unwrap();
    let output_dir = dir.path().join("output");
    let references_dir = dir.path().join("references");
    fs::create_dir_all(&output_dir).unwrap();
    fs::create_dir_all(&references_dir).unwrap();

    seed_reference(&references_dir.join("museum.csv"));
    seed_run_log(
        &output_dir.join("museum-baseline.csv"),
        &[(0, &[0.8][..]), (1, &[0.9][..]), (2, &[0.7][..])],
    );

    let err = Calibrator::new(&output_dir, &references_dir, 1)
        .run()
        .unwrap_err();

    match err {
        CalibrateError::ReferenceMismatch { turns, rows, .. } => {
            assert_eq!(turns, 3);
            assert_eq!(rows, 2);
        }
        other => panic!("expected ReferenceMismatch, got {other:?}"),
    }
}

#[test]
fn empty_output_directory_yields_no_outcomes() {
    let dir = tempdir().unwrap();
    let output_dir = dir.path().join("output");
    fs::create_dir_all(&output_dir).unwrap();

    let outcomes = Calibrator::new(&output_dir, dir.path().join("references"), 1)
        .run()
        .unwrap();
    assert!(outcomes.is_empty());
}
