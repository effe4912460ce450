//! Geographic concentration: too large a share of streams from one DMA.

use serde_json::Value;

use crate::config::DetectorConfig;
use crate::diagnostics::DiagnosticSink;
use crate::flat::{as_positive, FlatMetrics};
use crate::probe::{Probe, ProbeStrategy};
use crate::verdict::{DmaDetail, DmaUnavailableDetail, RuleDetail, RuleVerdict};

use super::{NO_STREAMING_DATA, NO_STREAMS_FOUND};

/// Where a DMA breakdown may live, in the order tried.
pub const DMA_BREAKDOWN: Probe = Probe {
    field: "dma_breakdown",
    strategies: &[
        ProbeStrategy::Key("dma"),
        ProbeStrategy::Key("location_dma"),
        ProbeStrategy::Key("dma_location"),
        ProbeStrategy::Key("location_dma_location"),
        ProbeStrategy::Key("geographic_dma"),
        ProbeStrategy::Key("dma_breakdown"),
        ProbeStrategy::Key("location_breakdown"),
        ProbeStrategy::Nested {
            parent: "location",
            child: "dma",
        },
        ProbeStrategy::Nested {
            parent: "location",
            child: "dma_breakdown",
        },
        ProbeStrategy::Nested {
            parent: "location",
            child: "markets",
        },
        // Flattened forms of the keys above, longest prefix first.
        ProbeStrategy::Prefixed("location_dma_breakdown_"),
        ProbeStrategy::Prefixed("location_dma_location_"),
        ProbeStrategy::Prefixed("location_breakdown_"),
        ProbeStrategy::Prefixed("location_markets_"),
        ProbeStrategy::Prefixed("geographic_dma_"),
        ProbeStrategy::Prefixed("dma_breakdown_"),
        ProbeStrategy::Prefixed("dma_location_"),
        ProbeStrategy::Prefixed("location_dma_"),
        ProbeStrategy::Prefixed("dma_"),
    ],
    hints: &["dma", "location", "market"],
};

const NAME_FIELDS: [&str; 3] = ["name", "dma", "market"];
const COUNT_FIELDS: [&str; 3] = ["value", "streams", "count"];

/// Positive per-DMA stream counts, in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct Breakdown(Vec<(String, f64)>);

impl Breakdown {
    /// Accept a non-empty object (`name -> count`) or a non-empty list of
    /// objects exposing a name-like and a count-like field.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Object(map) if !map.is_empty() => Some(Self(
                map.iter()
                    .filter_map(|(name, count)| Some((name.clone(), as_positive(count)?)))
                    .collect(),
            )),
            Value::Array(items) if !items.is_empty() => Some(Self(
                items
                    .iter()
                    .filter_map(Value::as_object)
                    .filter_map(|item| {
                        let name = NAME_FIELDS.iter().find_map(|f| label(item.get(*f)?))?;
                        let count = COUNT_FIELDS.iter().find_map(|f| as_positive(item.get(*f)?))?;
                        Some((name, count))
                    })
                    .collect(),
            )),
            _ => None,
        }
    }

    /// Largest share of `total` and its DMA. Ties keep the first maximum.
    pub fn leader(&self, total: f64) -> (f64, Option<&str>) {
        let mut max_share = 0.0;
        let mut max_name = None;
        for (name, count) in &self.0 {
            let share = count / total;
            if share > max_share {
                max_share = share;
                max_name = Some(name.as_str());
            }
        }
        (max_share, max_name)
    }
}

fn label(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub(crate) fn evaluate(
    current: Option<&FlatMetrics>,
    config: &DetectorConfig,
    sink: &dyn DiagnosticSink,
) -> RuleVerdict {
    let Some(flat) = current else {
        return RuleVerdict::clear(NO_STREAMING_DATA);
    };
    let total = match flat.total() {
        Some(t) if t > 0.0 => t,
        _ => return RuleVerdict::clear(NO_STREAMS_FOUND),
    };

    let Some(breakdown) = DMA_BREAKDOWN.resolve(flat, sink, Breakdown::from_value) else {
        return RuleVerdict::new(
            false,
            "DMA data not available in response",
            RuleDetail::DmaUnavailable(DmaUnavailableDetail {
                available_keys: flat.key_list(),
                total_streams: total,
            }),
        );
    };

    let threshold = config.dma_concentration_threshold();
    let (max_share, max_name) = breakdown.value.leader(total);
    let flagged = max_share > threshold;

    let reason = match (flagged, max_name) {
        (true, Some(name)) => format!(
            "{:.1}% of streams from DMA: {} (threshold: {:.0}%)",
            max_share * 100.0,
            name,
            threshold * 100.0
        ),
        (true, None) => format!(
            "{:.1}% of streams from single DMA (threshold: {:.0}%)",
            max_share * 100.0,
            threshold * 100.0
        ),
        (false, name) => format!(
            "DMA distribution normal (max: {:.1}% from {})",
            max_share * 100.0,
            name.unwrap_or("unknown")
        ),
    };

    RuleVerdict::new(
        flagged,
        reason,
        RuleDetail::Dma(DmaDetail {
            max_dma_share: max_share,
            max_dma_percentage: max_share * 100.0,
            max_dma_name: max_name.map(str::to_string),
            threshold,
            threshold_percentage: threshold * 100.0,
        }),
    )
}
