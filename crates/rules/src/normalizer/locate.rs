//! Locating the metrics list and the streams node inside a raw response.

use serde_json::Value;

use crate::diagnostics::{DiagnosticEvent, DiagnosticSink};

/// Alternate top-level containers scanned by [`MetricsLocator::Container`].
pub const CONTAINER_KEYS: &[&str] = &["data", "results", "streaming_data", "consumption"];

/// Strategies for finding the list of metric nodes, in the order tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricsLocator {
    /// `response.metrics`
    TopLevel,
    /// `response.consumption_data.metrics`
    ConsumptionData,
    /// `response.<key>.metrics`, or `response.<key>` itself when it is a list.
    Container(&'static str),
    /// The response is already the metrics list.
    WholeResponse,
}

impl MetricsLocator {
    pub fn name(&self) -> &'static str {
        match self {
            MetricsLocator::TopLevel => "metrics",
            MetricsLocator::ConsumptionData => "consumption_data.metrics",
            MetricsLocator::Container(key) => *key,
            MetricsLocator::WholeResponse => "whole_response",
        }
    }

    fn find<'a>(&self, response: &'a Value) -> Option<&'a Vec<Value>> {
        let found = match self {
            MetricsLocator::TopLevel => response.get("metrics")?.as_array(),
            MetricsLocator::ConsumptionData => response
                .get("consumption_data")?
                .get("metrics")?
                .as_array(),
            MetricsLocator::Container(key) => {
                let container = response.get(*key)?;
                match container {
                    Value::Object(map) => map.get("metrics").and_then(Value::as_array),
                    Value::Array(list) => Some(list),
                    _ => None,
                }
            }
            MetricsLocator::WholeResponse => response.as_array(),
        };
        found.filter(|list| !list.is_empty())
    }
}

/// Every locator, in resolution order.
pub fn metrics_locators() -> Vec<MetricsLocator> {
    let mut order = vec![MetricsLocator::TopLevel, MetricsLocator::ConsumptionData];
    order.extend(CONTAINER_KEYS.iter().map(|k| MetricsLocator::Container(*k)));
    order.push(MetricsLocator::WholeResponse);
    order
}

/// Find the metrics list using the first locator that yields a non-empty list.
pub fn locate_metrics<'a>(
    response: &'a Value,
    sink: &dyn DiagnosticSink,
) -> Option<&'a Vec<Value>> {
    for locator in metrics_locators() {
        if let Some(list) = locator.find(response) {
            sink.record(DiagnosticEvent::MetricsLocated {
                strategy: locator.name(),
            });
            return Some(list);
        }
    }

    let top_level_keys = response
        .as_object()
        .map(|m| m.keys().cloned().collect())
        .unwrap_or_default();
    sink.record(DiagnosticEvent::MetricsNotFound { top_level_keys });
    None
}

/// Passes used to pick the streams node, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamsMatch {
    /// `name == "Streams"`
    Exact,
    /// `name` equals `streams` ignoring case.
    CaseInsensitive,
    /// `name` contains `stream` ignoring case.
    Contains,
}

impl StreamsMatch {
    pub const ORDER: [StreamsMatch; 3] = [
        StreamsMatch::Exact,
        StreamsMatch::CaseInsensitive,
        StreamsMatch::Contains,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StreamsMatch::Exact => "exact",
            StreamsMatch::CaseInsensitive => "case_insensitive",
            StreamsMatch::Contains => "contains",
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            StreamsMatch::Exact => name == "Streams",
            StreamsMatch::CaseInsensitive => name.eq_ignore_ascii_case("streams"),
            StreamsMatch::Contains => name.to_lowercase().contains("stream"),
        }
    }
}

/// Pick the streams node: each pass scans the whole list before the next runs.
pub fn select_streams<'a>(
    metrics: &'a [Value],
    sink: &dyn DiagnosticSink,
) -> Option<&'a serde_json::Map<String, Value>> {
    let named: Vec<(&str, &serde_json::Map<String, Value>)> = metrics
        .iter()
        .filter_map(Value::as_object)
        .map(|node| (node.get("name").and_then(Value::as_str).unwrap_or(""), node))
        .collect();

    for pass in StreamsMatch::ORDER {
        if let Some((name, node)) = named.iter().find(|(name, _)| pass.matches(name)) {
            sink.record(DiagnosticEvent::StreamsSelected {
                strategy: pass.name(),
                name: name.to_string(),
            });
            return Some(*node);
        }
    }

    sink.record(DiagnosticEvent::StreamsNotFound {
        names: named.iter().map(|(n, _)| n.to_string()).collect(),
    });
    None
}
