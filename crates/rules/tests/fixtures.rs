//! End-to-end detection over the recorded responses in `data/fixtures/`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;
use streamwatch_core::{isrcs_from_csv, FetchOutcome};
use streamwatch_rules::{
    analyze_batch, analyze_batch_parallel, analyze_batch_with_history, Detector, DetectorConfig,
    DiagnosticEvent, DiagnosticLog, RuleKind, RowStatus,
};

/// Integration tests run from the crate directory, so go up two levels.
fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../data/fixtures")
}

fn load(relative: &str) -> Value {
    let path = fixtures_dir().join(relative);
    let text = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e));
    serde_json::from_str(&text)
        .unwrap_or_else(|e| panic!("Failed to parse {}: {}", path.display(), e))
}

fn isrcs() -> Vec<String> {
    let text = std::fs::read_to_string(fixtures_dir().join("isrcs.csv")).unwrap();
    isrcs_from_csv(&text).unwrap()
}

fn outcomes() -> IndexMap<String, FetchOutcome> {
    isrcs()
        .into_iter()
        .map(|isrc| {
            let path = fixtures_dir().join(format!("{isrc}.json"));
            let outcome = if path.exists() {
                FetchOutcome::from_body(load(&format!("{isrc}.json")))
            } else {
                FetchOutcome::failed("no recorded response")
            };
            (isrc, outcome)
        })
        .collect()
}

// ── Input ───────────────────────────────────────────────────────────

#[test]
fn csv_input_is_deduplicated_in_order() {
    assert_eq!(
        isrcs(),
        vec![
            "USRC17607839",
            "GBUM71029604",
            "QZES81947261",
            "USAT21300959",
            "USUM70000001",
            "USXX00000000",
        ]
    );
}

// ── Per-identifier analysis ─────────────────────────────────────────

#[test]
fn concentrated_dma_from_flattened_location_tree() {
    let result = Detector::default().analyze("USRC17607839", &load("USRC17607839.json"), None);
    assert_eq!(result.flag_count, 1);
    assert_eq!(result.flags[0].kind, RuleKind::DmaConcentration);
    assert_eq!(
        result.flags[0].message,
        "91.0% of streams from DMA: Houston (threshold: 80%)"
    );
}

#[test]
fn all_free_recording() {
    let result = Detector::default().analyze("GBUM71029604", &load("GBUM71029604.json"), None);
    assert_eq!(result.flag_count, 1);
    assert_eq!(result.flags[0].kind, RuleKind::FreeServiceAnomaly);
    assert_eq!(
        result.flags[0].message,
        "100% free service streams (suspicious - no premium users)"
    );
}

#[test]
fn low_free_share_with_list_shaped_dma() {
    let log = Arc::new(DiagnosticLog::new());
    let detector = Detector::default().with_sink(log.clone());
    let result = detector.analyze("USAT21300959", &load("USAT21300959.json"), None);

    assert_eq!(result.flag_count, 1);
    assert_eq!(
        result.flags[0].message,
        "Only 0.4% free service streams (suspiciously low)"
    );
    assert!(log.events().contains(&DiagnosticEvent::MetricsLocated {
        strategy: "results"
    }));
}

#[test]
fn drop_off_needs_previous_period() {
    let detector = Detector::default();
    let current = load("QZES81947261.json");

    let alone = detector.analyze("QZES81947261", &current, None);
    assert_eq!(
        alone.flags[0].message,
        "No streams found (may indicate content removal)"
    );

    let previous = load("previous/QZES81947261.json");
    let with_history = detector.analyze("QZES81947261", &current, Some(&previous));
    assert_eq!(with_history.flag_count, 1);
    assert_eq!(
        with_history.flags[0].message,
        "Streams dropped to zero (possible content removal)"
    );
}

#[test]
fn lower_threshold_flags_more() {
    let detector = Detector::new(DetectorConfig::new(0.5, 0.03, 1.0).unwrap());
    let result = detector.analyze("USAT21300959", &load("USAT21300959.json"), None);
    assert_eq!(result.flag_count, 2);
    assert_eq!(result.dma_detail().unwrap().max_dma_name.as_deref(), Some("Boston"));
}

// ── Batch ───────────────────────────────────────────────────────────

#[test]
fn batch_report_over_fixture_set() {
    let mut previous = HashMap::new();
    previous.insert("QZES81947261".to_string(), load("previous/QZES81947261.json"));

    let report = analyze_batch_with_history(&Detector::default(), &outcomes(), &previous);
    let statuses: Vec<_> = report.rows.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![
            RowStatus::Analyzed,
            RowStatus::Analyzed,
            RowStatus::Analyzed,
            RowStatus::Analyzed,
            RowStatus::NoData,
            RowStatus::FetchFailed,
        ]
    );

    let summary = report.summary();
    assert_eq!(summary.total, 6);
    assert_eq!(summary.flagged, 4);
    assert_eq!(summary.no_data, 1);
    assert_eq!(summary.fetch_failed, 1);

    assert_eq!(report.rows[0].dma_summary, "Houston: 91.0%");
    assert_eq!(report.rows[5].detail, "fetch failed: no recorded response");

    let csv = report.to_csv();
    assert_eq!(csv.lines().count(), 7);
    assert!(csv
        .lines()
        .any(|l| l.starts_with("USUM70000001,False,0,None,N/A,no extractable data,no_data")));
}

#[test]
fn parallel_batch_matches_serial_batch() {
    let detector = Detector::default();
    let outcomes = outcomes();
    assert_eq!(
        analyze_batch(&detector, &outcomes),
        analyze_batch_parallel(&detector, &outcomes)
    );
}
