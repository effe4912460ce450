//! Batch report rows, summary counts and CSV / JSON export.

use serde::Serialize;

use crate::verdict::AnalysisResult;

pub const CSV_HEADER: [&str; 7] = [
    "ISRC",
    "Flagged",
    "Flag Count",
    "Flags",
    "DMA Info",
    "Details",
    "Status",
];

/// How a row came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowStatus {
    Analyzed,
    NoData,
    FetchFailed,
    EvaluationFailed,
}

impl RowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RowStatus::Analyzed => "analyzed",
            RowStatus::NoData => "no_data",
            RowStatus::FetchFailed => "fetch_failed",
            RowStatus::EvaluationFailed => "evaluation_failed",
        }
    }
}

/// One identifier's line in the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub identifier: String,
    pub flagged: bool,
    pub flag_count: usize,
    /// Flag messages joined by `"; "`, or `"None"`.
    pub messages: String,
    /// `"{name}: {pct:.1}%"` for a flagged DMA concentration, else `"N/A"`.
    pub dma_summary: String,
    pub detail: String,
    pub status: RowStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisResult>,
}

impl ReportRow {
    /// Row for an evaluated identifier. Rows without extractable metrics are
    /// marked [`RowStatus::NoData`].
    pub fn from_analysis(result: AnalysisResult) -> Self {
        let messages = if result.flags.is_empty() {
            "None".to_string()
        } else {
            result
                .flags
                .iter()
                .map(|f| f.message.as_str())
                .collect::<Vec<_>>()
                .join("; ")
        };

        let dma_summary = result
            .dma_detail()
            .and_then(|d| {
                let name = d.max_dma_name.as_deref()?;
                Some(format!("{name}: {:.1}%", d.max_dma_percentage))
            })
            .unwrap_or_else(|| "N/A".to_string());

        let (status, detail) = if result.data_available {
            let detail = serde_json::to_string(&result.details)
                .unwrap_or_else(|e| format!("unserializable details: {e}"));
            (RowStatus::Analyzed, detail)
        } else {
            (RowStatus::NoData, "no extractable data".to_string())
        };

        Self {
            identifier: result.identifier.clone(),
            flagged: result.is_anomalous(),
            flag_count: result.flag_count,
            messages,
            dma_summary,
            detail,
            status,
            analysis: Some(result),
        }
    }

    /// Row for a transport failure. Never evaluated.
    pub fn fetch_failed(identifier: &str, reason: &str) -> Self {
        Self::unevaluated(
            identifier,
            format!("fetch failed: {reason}"),
            RowStatus::FetchFailed,
        )
    }

    /// Row for an evaluation that panicked.
    pub fn evaluation_failed(identifier: &str, message: &str) -> Self {
        Self::unevaluated(
            identifier,
            format!("evaluation failed: {message}"),
            RowStatus::EvaluationFailed,
        )
    }

    fn unevaluated(identifier: &str, detail: String, status: RowStatus) -> Self {
        Self {
            identifier: identifier.to_string(),
            flagged: false,
            flag_count: 0,
            messages: "None".to_string(),
            dma_summary: "N/A".to_string(),
            detail,
            status,
            analysis: None,
        }
    }

    fn csv_fields(&self) -> [String; 7] {
        [
            self.identifier.clone(),
            if self.flagged { "True" } else { "False" }.to_string(),
            self.flag_count.to_string(),
            self.messages.clone(),
            self.dma_summary.clone(),
            self.detail.clone(),
            self.status.as_str().to_string(),
        ]
    }
}

/// Counts over a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub flagged: usize,
    pub no_data: usize,
    pub fetch_failed: usize,
    pub evaluation_failed: usize,
}

/// Rows in input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub rows: Vec<ReportRow>,
}

impl BatchReport {
    pub fn summary(&self) -> BatchSummary {
        let mut summary = BatchSummary {
            total: self.rows.len(),
            ..Default::default()
        };
        for row in &self.rows {
            if row.flagged {
                summary.flagged += 1;
            }
            match row.status {
                RowStatus::Analyzed => {}
                RowStatus::NoData => summary.no_data += 1,
                RowStatus::FetchFailed => summary.fetch_failed += 1,
                RowStatus::EvaluationFailed => summary.evaluation_failed += 1,
            }
        }
        summary
    }

    pub fn flagged(&self) -> impl Iterator<Item = &ReportRow> {
        self.rows.iter().filter(|r| r.flagged)
    }

    /// Identifiers whose fetch failed, in input order.
    pub fn failed_identifiers(&self) -> Vec<&str> {
        self.rows
            .iter()
            .filter(|r| r.status == RowStatus::FetchFailed)
            .map(|r| r.identifier.as_str())
            .collect()
    }

    /// CSV with a header line and RFC 4180 quoting, `\n` line endings.
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        push_record(&mut out, CSV_HEADER.iter().copied());
        for row in &self.rows {
            let fields = row.csv_fields();
            push_record(&mut out, fields.iter().map(String::as_str));
        }
        out
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn push_record<'a>(out: &mut String, fields: impl Iterator<Item = &'a str>) {
    for (i, field) in fields.enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&quote(field));
    }
    out.push('\n');
}

fn quote(field: &str) -> std::borrow::Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\"")).into()
    } else {
        field.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verdict::{DmaDetail, RuleDetail, RuleKind, RuleVerdict};

    fn dma_flagged(identifier: &str) -> AnalysisResult {
        AnalysisResult::from_verdicts(
            identifier,
            true,
            vec![(
                RuleKind::DmaConcentration,
                RuleVerdict::new(
                    true,
                    "85.0% of streams from DMA: Chicago, IL (threshold: 80%)",
                    RuleDetail::Dma(DmaDetail {
                        max_dma_share: 0.85,
                        max_dma_percentage: 85.0,
                        max_dma_name: Some("Chicago, IL".into()),
                        threshold: 0.8,
                        threshold_percentage: 80.0,
                    }),
                ),
            )],
        )
    }

    #[test]
    fn analyzed_row_fields() {
        let row = ReportRow::from_analysis(dma_flagged("A"));
        assert!(row.flagged);
        assert_eq!(row.flag_count, 1);
        assert_eq!(row.dma_summary, "Chicago, IL: 85.0%");
        assert_eq!(row.status, RowStatus::Analyzed);
        assert!(row.detail.starts_with("{\"dma_concentration\":"));
    }

    #[test]
    fn clean_and_empty_rows() {
        let clean = ReportRow::from_analysis(AnalysisResult::from_verdicts("B", true, vec![]));
        assert_eq!(clean.messages, "None");
        assert_eq!(clean.dma_summary, "N/A");
        assert_eq!(clean.detail, "{}");

        let empty = ReportRow::from_analysis(AnalysisResult::from_verdicts("C", false, vec![]));
        assert_eq!(empty.status, RowStatus::NoData);
        assert_eq!(empty.detail, "no extractable data");
    }

    #[test]
    fn summary_counts() {
        let report = BatchReport {
            rows: vec![
                ReportRow::from_analysis(dma_flagged("A")),
                ReportRow::from_analysis(AnalysisResult::from_verdicts("B", false, vec![])),
                ReportRow::fetch_failed("C", "HTTP 500"),
                ReportRow::evaluation_failed("D", "boom"),
            ],
        };
        assert_eq!(
            report.summary(),
            BatchSummary {
                total: 4,
                flagged: 1,
                no_data: 1,
                fetch_failed: 1,
                evaluation_failed: 1,
            }
        );
        assert_eq!(report.failed_identifiers(), vec!["C"]);
        assert_eq!(report.flagged().count(), 1);
    }

    #[test]
    fn csv_quotes_fields_that_need_it() {
        let report = BatchReport {
            rows: vec![
                ReportRow::from_analysis(dma_flagged("USRC1")),
                ReportRow::fetch_failed("USRC2", "HTTP 401 \"unauthorized\""),
            ],
        };
        let csv = report.to_csv();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "ISRC,Flagged,Flag Count,Flags,DMA Info,Details,Status");
        assert!(lines[1].starts_with(
            "USRC1,True,1,\"85.0% of streams from DMA: Chicago, IL (threshold: 80%)\",\"Chicago, IL: 85.0%\","
        ));
        assert!(lines[1].ends_with(",analyzed"));
        assert_eq!(
            lines[2],
            "USRC2,False,0,None,N/A,\"fetch failed: HTTP 401 \"\"unauthorized\"\"\",fetch_failed"
        );
    }

    #[test]
    fn json_export_includes_status() {
        let report = BatchReport {
            rows: vec![ReportRow::fetch_failed("X", "timeout")],
        };
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["rows"][0]["status"], "fetch_failed");
        assert!(json["rows"][0].get("analysis").is_none());
    }
}
