//! Metric normalizer: raw analytics response -> [`FlatMetrics`].
//!
//! The producer does not commit to one response shape, so normalization runs
//! three steps, each with an explicit fallback order:
//!
//! 1. **Locate** the metrics list ([`MetricsLocator`], first non-empty list wins).
//! 2. **Select** the streams node ([`StreamsMatch`]: exact, case-insensitive,
//!    substring).
//! 3. **Flatten** the node's value tree, joining ancestor names with `_`.
//!
//! Any failure along the way yields `None`, the "no data for this period"
//! outcome. Nothing here errors or panics on malformed input.

mod flatten;
mod locate;


use serde_json::Value;

use crate::diagnostics::{DiagnosticEvent, DiagnosticSink, TracingSink};
use crate::flat::FlatMetrics;
use crate::probe::value_kind;

pub use flatten::flatten;
pub use locate::{
    locate_metrics, metrics_locators, select_streams, MetricsLocator, StreamsMatch,
    CONTAINER_KEYS,
};

/// Normalize a response, reporting diagnostics through `tracing`.
pub fn extract(response: &Value) -> Option<FlatMetrics> {
    extract_with(response, &TracingSink)
}

/// Normalize a response, reporting diagnostics to `sink`.
///
/// Returns `None` for `null`, `{}`, non-object input, or when no streams
/// metric can be found. A streams node whose value is not a list yields an
/// empty map.
pub fn extract_with(response: &Value, sink: &dyn DiagnosticSink) -> Option<FlatMetrics> {
    match response {
        Value::Object(map) if !map.is_empty() => {}
        Value::Object(_) => {
            sink.record(DiagnosticEvent::ResponseRejected {
                reason: "empty response".to_string(),
            });
            return None;
        }
        other => {
            sink.record(DiagnosticEvent::ResponseRejected {
                reason: format!("{} response is not an object", value_kind(other)),
            });
            return None;
        }
    }

    let metrics = locate_metrics(response, sink)?;
    let streams = select_streams(metrics, sink)?;

    match streams.get("value") {
        Some(Value::Array(children)) => Some(flatten(children, sink)),
        other => {
            sink.record(DiagnosticEvent::NodeSkipped {
                path: flatten::node_name(streams),
                reason: format!(
                    "streams value is {}, not a list",
                    other.map(value_kind).unwrap_or("missing")
                ),
            });
            Some(FlatMetrics::new())
        }
    }
}
