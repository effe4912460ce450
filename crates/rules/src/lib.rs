//! Streaming anomaly detection for recordings identified by ISRC.
//!
//! This crate provides:
//! - A metric normalizer turning loosely shaped analytics responses into
//!   flat `name -> value` maps
//! - Ordered key probes for fields the producer names inconsistently
//! - Three detection rules: DMA concentration, free/premium mix, and
//!   zero-stream drop-off
//! - Serial and rayon-parallel batch drivers with CSV / JSON reports
//! - Structured diagnostic events for every fallback the engine takes

pub mod batch;
pub mod config;
pub mod diagnostics;
pub mod evaluator;
pub mod flat;
pub mod normalizer;
pub mod probe;
pub mod report;
pub mod verdict;

pub use batch::{
    analyze_batch, analyze_batch_parallel, analyze_batch_parallel_with_history,
    analyze_batch_with_history,
};
pub use config::{ConfigError, DetectorConfig};
pub use diagnostics::{DiagnosticEvent, DiagnosticLog, DiagnosticSink, NullSink, TracingSink};
pub use evaluator::Detector;
pub use flat::FlatMetrics;
pub use normalizer::extract;
pub use report::{BatchReport, BatchSummary, ReportRow, RowStatus};
pub use verdict::{AnalysisResult, FlagRecord, RuleDetail, RuleKind, RuleVerdict};
