//! Rule outputs: verdicts, detail payloads, and per-identifier results.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The detection rules, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    DmaConcentration,
    FreeServiceAnomaly,
    ZeroStreams,
}

impl RuleKind {
    pub const ALL: [RuleKind; 3] = [
        RuleKind::DmaConcentration,
        RuleKind::FreeServiceAnomaly,
        RuleKind::ZeroStreams,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::DmaConcentration => "dma_concentration",
            RuleKind::FreeServiceAnomaly => "free_service_anomaly",
            RuleKind::ZeroStreams => "zero_streams",
        }
    }
}

impl std::fmt::Display for RuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one rule for one identifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleVerdict {
    pub flagged: bool,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<RuleDetail>,
}

impl RuleVerdict {
    pub(crate) fn clear(reason: impl Into<String>) -> Self {
        Self {
            flagged: false,
            reason: reason.into(),
            detail: None,
        }
    }

    pub(crate) fn new(flagged: bool, reason: impl Into<String>, detail: RuleDetail) -> Self {
        Self {
            flagged,
            reason: reason.into(),
            detail: Some(detail),
        }
    }
}

/// Structured payload attached to a verdict.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RuleDetail {
    Dma(DmaDetail),
    DmaUnavailable(DmaUnavailableDetail),
    FreeService(FreeServiceDetail),
    ZeroStreams(ZeroStreamsDetail),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DmaDetail {
    pub max_dma_share: f64,
    pub max_dma_percentage: f64,
    pub max_dma_name: Option<String>,
    pub threshold: f64,
    pub threshold_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DmaUnavailableDetail {
    pub available_keys: Vec<String>,
    pub total_streams: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FreeServiceDetail {
    pub free_ratio: f64,
    pub ad_supported_streams: f64,
    pub premium_streams: f64,
    pub total_streams: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZeroStreamsDetail {
    pub current_streams: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub had_previous_streams: Option<bool>,
}

/// A flagged rule as it appears in a result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlagRecord {
    #[serde(rename = "type")]
    pub kind: RuleKind,
    pub message: String,
}

/// Aggregate of all rule verdicts for one identifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub identifier: String,
    pub flags: Vec<FlagRecord>,
    pub flag_count: usize,
    /// Detail payloads of the flagged rules only.
    pub details: IndexMap<RuleKind, RuleDetail>,
    /// False when the response normalized to nothing.
    pub data_available: bool,
}

impl AnalysisResult {
    pub(crate) fn from_verdicts(
        identifier: &str,
        data_available: bool,
        verdicts: impl IntoIterator<Item = (RuleKind, RuleVerdict)>,
    ) -> Self {
        let mut flags = Vec::new();
        let mut details = IndexMap::new();
        for (kind, verdict) in verdicts {
            if !verdict.flagged {
                continue;
            }
            flags.push(FlagRecord {
                kind,
                message: verdict.reason,
            });
            if let Some(detail) = verdict.detail {
                details.insert(kind, detail);
            }
        }
        Self {
            identifier: identifier.to_string(),
            flag_count: flags.len(),
            flags,
            details,
            data_available,
        }
    }

    pub fn is_anomalous(&self) -> bool {
        self.flag_count > 0
    }

    /// The DMA detail, when the concentration rule flagged.
    pub fn dma_detail(&self) -> Option<&DmaDetail> {
        match self.details.get(&RuleKind::DmaConcentration) {
            Some(RuleDetail::Dma(d)) => Some(d),
            _ => None,
        }
    }
}
