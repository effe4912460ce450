//! Batch drivers: fetch outcomes in, one [`ReportRow`] per identifier out.
//!
//! Transport failures become rows without evaluation. A panic while
//! evaluating one identifier is caught and recorded on that row; the rest of
//! the batch is unaffected. Serial and parallel drivers produce identical
//! reports.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

use indexmap::IndexMap;
use rayon::prelude::*;
use serde_json::{Map, Value};
use streamwatch_core::FetchOutcome;

use crate::evaluator::Detector;
use crate::report::{BatchReport, ReportRow};

/// Evaluate every outcome in input order.
pub fn analyze_batch(detector: &Detector, outcomes: &IndexMap<String, FetchOutcome>) -> BatchReport {
    analyze_batch_with_history(detector, outcomes, &HashMap::new())
}

/// As [`analyze_batch`], with prior-period responses for drop-off detection.
pub fn analyze_batch_with_history(
    detector: &Detector,
    outcomes: &IndexMap<String, FetchOutcome>,
    previous: &HashMap<String, Value>,
) -> BatchReport {
    let rows = outcomes
        .iter()
        .map(|(isrc, outcome)| analyze_row(detector, isrc, outcome, previous.get(isrc)))
        .collect();
    finish(rows)
}

/// Parallel variant of [`analyze_batch`] on the rayon pool. Row order still
/// follows the input.
pub fn analyze_batch_parallel(
    detector: &Detector,
    outcomes: &IndexMap<String, FetchOutcome>,
) -> BatchReport {
    analyze_batch_parallel_with_history(detector, outcomes, &HashMap::new())
}

/// Parallel variant of [`analyze_batch_with_history`].
pub fn analyze_batch_parallel_with_history(
    detector: &Detector,
    outcomes: &IndexMap<String, FetchOutcome>,
    previous: &HashMap<String, Value>,
) -> BatchReport {
    let items: Vec<(&String, &FetchOutcome)> = outcomes.iter().collect();
    let rows = items
        .into_par_iter()
        .map(|(isrc, outcome)| analyze_row(detector, isrc, outcome, previous.get(isrc)))
        .collect();
    finish(rows)
}

fn analyze_row(
    detector: &Detector,
    isrc: &str,
    outcome: &FetchOutcome,
    previous: Option<&Value>,
) -> ReportRow {
    let empty = Value::Object(Map::new());
    let response = match outcome {
        FetchOutcome::Data { response } => response,
        FetchOutcome::Empty => &empty,
        FetchOutcome::Failed { reason } => {
            tracing::warn!(isrc, %reason, "skipping identifier after fetch failure");
            return ReportRow::fetch_failed(isrc, reason);
        }
    };

    match catch_unwind(AssertUnwindSafe(|| detector.analyze(isrc, response, previous))) {
        Ok(result) => ReportRow::from_analysis(result),
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(isrc, %message, "evaluation panicked");
            ReportRow::evaluation_failed(isrc, &message)
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn finish(rows: Vec<ReportRow>) -> BatchReport {
    let report = BatchReport { rows };
    let summary = report.summary();
    tracing::info!(
        total = summary.total,
        flagged = summary.flagged,
        no_data = summary.no_data,
        fetch_failed = summary.fetch_failed,
        evaluation_failed = summary.evaluation_failed,
        "batch analysis complete"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{DiagnosticEvent, DiagnosticSink};
    use crate::report::RowStatus;
    use serde_json::json;
    use std::sync::Arc;

    fn streams(total: u64) -> FetchOutcome {
        FetchOutcome::Data {
            response: json!({ "metrics": [ { "name": "Streams", "value": [
                { "name": "total", "value": total },
                { "name": "commercial_model", "value": [
                    { "name": "ad_supported", "value": total / 2 },
                    { "name": "premium", "value": total / 2 }
                ]}
            ]}]}),
        }
    }

    fn outcomes() -> IndexMap<String, FetchOutcome> {
        let mut map = IndexMap::new();
        map.insert("B".to_string(), streams(1000));
        map.insert("A".to_string(), FetchOutcome::Empty);
        map.insert("C".to_string(), FetchOutcome::failed("HTTP 500"));
        map.insert("D".to_string(), streams(0));
        map
    }

    #[test]
    fn rows_follow_input_order() {
        let report = analyze_batch(&Detector::default(), &outcomes());
        let ids: Vec<_> = report.rows.iter().map(|r| r.identifier.as_str()).collect();
        assert_eq!(ids, vec!["B", "A", "C", "D"]);
        assert_eq!(report.rows[0].status, RowStatus::Analyzed);
        assert!(!report.rows[0].flagged);
        assert_eq!(report.rows[1].status, RowStatus::NoData);
        assert_eq!(report.rows[2].detail, "fetch failed: HTTP 500");
        assert_eq!(report.rows[2].flag_count, 0);
        assert!(report.rows[3].flagged);
    }

    #[test]
    fn history_is_matched_by_identifier() {
        let mut current = IndexMap::new();
        current.insert("X".to_string(), streams(0));
        let mut previous = HashMap::new();
        if let FetchOutcome::Data { response } = streams(900) {
            previous.insert("X".to_string(), response);
        }
        let report = analyze_batch_with_history(&Detector::default(), &current, &previous);
        assert!(report.rows[0]
            .messages
            .contains("Streams dropped to zero (possible content removal)"));
    }

    #[test]
    fn parallel_matches_serial() {
        let detector = Detector::default();
        let mut many = outcomes();
        for i in 0..50 {
            many.insert(format!("ID{i:03}"), streams(i * 10));
        }
        let serial = analyze_batch(&detector, &many);
        let parallel = analyze_batch_parallel(&detector, &many);
        assert_eq!(serial, parallel);
    }

    #[test]
    fn parallel_history_matches_serial_history() {
        let detector = Detector::default();
        let mut current = outcomes();
        current.insert("X".to_string(), streams(0));
        let mut previous = HashMap::new();
        if let FetchOutcome::Data { response } = streams(900) {
            previous.insert("X".to_string(), response);
        }
        let serial = analyze_batch_with_history(&detector, &current, &previous);
        let parallel = analyze_batch_parallel_with_history(&detector, &current, &previous);
        assert_eq!(serial, parallel);
        assert!(parallel.rows[4]
            .messages
            .contains("Streams dropped to zero (possible content removal)"));
    }

    struct PanickingSink;

    impl DiagnosticSink for PanickingSink {
        fn record(&self, event: DiagnosticEvent) {
            if let DiagnosticEvent::StreamsSelected { name, .. } = &event {
                if name == "Streams (poison)" {
                    panic!("sink exploded");
                }
            }
        }
    }

    #[test]
    fn panic_is_isolated_to_its_row() {
        let detector = Detector::default().with_sink(Arc::new(PanickingSink));
        let mut map = outcomes();
        map.insert(
            "P".to_string(),
            FetchOutcome::Data {
                response: json!({ "metrics": [ { "name": "Streams (poison)", "value": [] } ] }),
            },
        );
        let report = analyze_batch(&detector, &map);
        let last = report.rows.last().unwrap();
        assert_eq!(last.status, RowStatus::EvaluationFailed);
        assert_eq!(last.detail, "evaluation failed: sink exploded");
        assert_eq!(report.summary().evaluation_failed, 1);
        assert_eq!(report.rows[0].status, RowStatus::Analyzed);
    }
}
