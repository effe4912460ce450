//! Drop-off detection: a recording whose streams vanished.

use crate::flat::{format_count, FlatMetrics};
use crate::verdict::{RuleDetail, RuleVerdict, ZeroStreamsDetail};

use super::NO_STREAMING_DATA;

pub(crate) fn evaluate(current: Option<&FlatMetrics>, previous: Option<&FlatMetrics>) -> RuleVerdict {
    let Some(total) = current.and_then(FlatMetrics::total) else {
        return RuleVerdict::clear(NO_STREAMING_DATA);
    };

    if total > 0.0 {
        return RuleVerdict::new(
            false,
            format!("Active streams: {}", format_count(total)),
            RuleDetail::ZeroStreams(ZeroStreamsDetail {
                current_streams: total,
                had_previous_streams: None,
            }),
        );
    }

    let had_previous = previous
        .and_then(FlatMetrics::total)
        .is_some_and(|t| t > 0.0);
    let reason = if had_previous {
        "Streams dropped to zero (possible content removal)"
    } else {
        "No streams found (may indicate content removal)"
    };

    RuleVerdict::new(
        true,
        reason,
        RuleDetail::ZeroStreams(ZeroStreamsDetail {
            current_streams: total,
            had_previous_streams: Some(had_previous),
        }),
    )
}
