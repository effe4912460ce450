//! Free/premium mix: all-free or almost-no-free traffic is suspicious.

use crate::config::DetectorConfig;
use crate::diagnostics::DiagnosticSink;
use crate::flat::{as_positive, FlatMetrics};
use crate::probe::{Probe, ProbeStrategy};
use crate::verdict::{FreeServiceDetail, RuleDetail, RuleVerdict};

use super::{NO_STREAMING_DATA, NO_STREAMS_FOUND};

pub const AD_SUPPORTED: Probe = Probe {
    field: "ad_supported_streams",
    strategies: &[
        ProbeStrategy::Key("commercial_model_ad_supported"),
        ProbeStrategy::Key("ad_supported"),
        ProbeStrategy::Key("commercial_model_ad-supported"),
        ProbeStrategy::Key("free"),
        ProbeStrategy::Key("ad_supported_streams"),
        ProbeStrategy::Key("commercial_model_free"),
    ],
    hints: &["ad", "free"],
};

pub const PREMIUM: Probe = Probe {
    field: "premium_streams",
    strategies: &[
        ProbeStrategy::Key("commercial_model_premium"),
        ProbeStrategy::Key("premium"),
        ProbeStrategy::Key("premium_streams"),
        ProbeStrategy::Key("paid"),
        ProbeStrategy::Key("commercial_model_paid"),
    ],
    hints: &["premium", "paid"],
};

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

    let ad_supported = AD_SUPPORTED
        .resolve(flat, sink, as_positive)
        .map_or(0.0, |p| p.value);
    let premium = PREMIUM
        .resolve(flat, sink, as_positive)
        .map_or(0.0, |p| p.value);

    let free_ratio = ad_supported / total;
    let pct = free_ratio * 100.0;

    let (flagged, reason) = if free_ratio >= config.free_ratio_max() {
        (
            true,
            "100% free service streams (suspicious - no premium users)".to_string(),
        )
    } else if free_ratio < config.free_ratio_min() {
        (
            true,
            format!("Only {pct:.1}% free service streams (suspiciously low)"),
        )
    } else {
        (false, format!("Free service ratio normal ({pct:.1}%)"))
    };

    RuleVerdict::new(
        flagged,
        reason,
        RuleDetail::FreeService(FreeServiceDetail {
            free_ratio,
            ad_supported_streams: ad_supported,
            premium_streams: premium,
            total_streams: total,
        }),
    )
}
