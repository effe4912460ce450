//! Rule evaluator: runs the detection rules over normalized metrics.
//!
//! Each rule lives in its own module and is a stateless function of the
//! current (and for drop-off, previous) [`FlatMetrics`], the thresholds and a
//! diagnostic sink. [`Detector`] owns the thresholds and the sink and
//! aggregates the three verdicts into an [`AnalysisResult`].
//!
//! Rules never error: missing or oddly shaped data produces a not-flagged
//! verdict with an explanatory reason.

pub mod dma;
pub mod free_service;
pub mod zero_streams;

use std::sync::Arc;

use serde_json::Value;
use tracing::debug_span;

use crate::config::DetectorConfig;
use crate::diagnostics::{DiagnosticEvent, DiagnosticSink, TracingSink};
use crate::flat::FlatMetrics;
use crate::normalizer;
use crate::verdict::{AnalysisResult, RuleKind, RuleVerdict};

pub(crate) const NO_STREAMING_DATA: &str = "No streaming data available";
pub(crate) const NO_STREAMS_FOUND: &str = "No streams found";

// ── Detector ────────────────────────────────────────────────────────

/// Thresholds plus a diagnostic sink. Cheap to share across threads.
#[derive(Clone)]
pub struct Detector {
    config: DetectorConfig,
    sink: Arc<dyn DiagnosticSink>,
}

impl Default for Detector {
    fn default() -> Self {
        Self::new(DetectorConfig::default())
    }
}

impl std::fmt::Debug for Detector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Detector")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Detector {
    /// A detector reporting diagnostics through `tracing`.
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            sink: Arc::new(TracingSink),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Replace the thresholds. Applies from the next evaluation on.
    pub fn set_config(&mut self, config: DetectorConfig) {
        tracing::info!(
            dma_threshold = config.dma_concentration_threshold(),
            free_ratio_min = config.free_ratio_min(),
            free_ratio_max = config.free_ratio_max(),
            "detector thresholds updated"
        );
        self.config = config;
    }

    pub(crate) fn sink(&self) -> &dyn DiagnosticSink {
        self.sink.as_ref()
    }

    /// Normalize a raw response, reporting into this detector's sink.
    pub fn extract(&self, response: &Value) -> Option<FlatMetrics> {
        normalizer::extract_with(response, self.sink())
    }

    // ── Rules ───────────────────────────────────────────────────────

    /// Evaluate one rule. `previous` only matters for [`RuleKind::ZeroStreams`].
    pub fn evaluate_rule(
        &self,
        kind: RuleKind,
        current: Option<&FlatMetrics>,
        previous: Option<&FlatMetrics>,
    ) -> RuleVerdict {
        let verdict = match kind {
            RuleKind::DmaConcentration => dma::evaluate(current, &self.config, self.sink()),
            RuleKind::FreeServiceAnomaly => {
                free_service::evaluate(current, &self.config, self.sink())
            }
            RuleKind::ZeroStreams => zero_streams::evaluate(current, previous),
        };
        self.sink.record(DiagnosticEvent::RuleEvaluated {
            rule: kind,
            flagged: verdict.flagged,
        });
        verdict
    }

    pub fn check_dma_concentration(&self, current: Option<&FlatMetrics>) -> RuleVerdict {
        self.evaluate_rule(RuleKind::DmaConcentration, current, None)
    }

    pub fn check_free_service_ratio(&self, current: Option<&FlatMetrics>) -> RuleVerdict {
        self.evaluate_rule(RuleKind::FreeServiceAnomaly, current, None)
    }

    pub fn check_zero_streams(
        &self,
        current: Option<&FlatMetrics>,
        previous: Option<&FlatMetrics>,
    ) -> RuleVerdict {
        self.evaluate_rule(RuleKind::ZeroStreams, current, previous)
    }

    // ── Aggregation ─────────────────────────────────────────────────

    /// Normalize both periods and run every rule for one identifier.
    pub fn analyze(
        &self,
        identifier: &str,
        response: &Value,
        previous: Option<&Value>,
    ) -> AnalysisResult {
        let _span = debug_span!("analyze", isrc = identifier).entered();
        let current = self.extract(response);
        let previous = previous.and_then(|p| self.extract(p));
        self.analyze_flat(identifier, current.as_ref(), previous.as_ref())
    }

    /// Run every rule over already-normalized metrics. All rules run.
    pub fn analyze_flat(
        &self,
        identifier: &str,
        current: Option<&FlatMetrics>,
        previous: Option<&FlatMetrics>,
    ) -> AnalysisResult {
        let verdicts = RuleKind::ALL
            .into_iter()
            .map(|kind| (kind, self.evaluate_rule(kind, current, previous)));
        let result = AnalysisResult::from_verdicts(identifier, current.is_some(), verdicts);

        if result.is_anomalous() {
            tracing::info!(
                isrc = identifier,
                flag_count = result.flag_count,
                "anomalies detected"
            );
        }
        result
    }
}
