//! Fetch outcome model shared between the connector and the batch driver.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StreamwatchError};

/// Result of asking the analytics API for one identifier.
///
/// `Empty` is a successful answer with no data for the period and must be
/// passed through to analysis; `Failed` never reaches the detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FetchOutcome {
    Data { response: serde_json::Value },
    Empty,
    Failed { reason: String },
}

impl FetchOutcome {
    /// Wrap a decoded body, collapsing `{}` / `null` into `Empty`.
    pub fn from_body(body: serde_json::Value) -> Self {
        let empty = match &body {
            serde_json::Value::Null => true,
            serde_json::Value::Object(map) => map.is_empty(),
            _ => false,
        };
        if empty {
            FetchOutcome::Empty
        } else {
            FetchOutcome::Data { response: body }
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        FetchOutcome::Failed {
            reason: reason.into(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, FetchOutcome::Failed { .. })
    }

    /// The response to hand to the detector, or `None` for failures.
    ///
    /// `Empty` maps to an empty JSON object so the normalizer sees exactly
    /// what the producer sent.
    pub fn response(&self) -> Option<serde_json::Value> {
        match self {
            FetchOutcome::Data { response } => Some(response.clone()),
            FetchOutcome::Empty => Some(serde_json::Value::Object(Default::default())),
            FetchOutcome::Failed { .. } => None,
        }
    }
}

/// Optional query window for a fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Location code such as `US`.
    pub location: Option<String>,
}

impl FetchQuery {
    /// Build a query from `YYYY-MM-DD` strings, validating the window.
    pub fn parse(start: Option<&str>, end: Option<&str>, location: Option<&str>) -> Result<Self> {
        let query = Self {
            start_date: start.map(parse_date).transpose()?,
            end_date: end.map(parse_date).transpose()?,
            location: location
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty()),
        };
        query.validate()?;
        Ok(query)
    }

    pub fn validate(&self) -> Result<()> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(StreamwatchError::Query(format!(
                    "start date {start} is after end date {end}"
                )));
            }
        }
        Ok(())
    }

    /// Query-string pairs for the populated fields only.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(start) = self.start_date {
            params.push(("start_date", start.format("%Y-%m-%d").to_string()));
        }
        if let Some(end) = self.end_date {
            params.push(("end_date", end.format("%Y-%m-%d").to_string()));
        }
        if let Some(location) = &self.location {
            params.push(("location", location.clone()));
        }
        params
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| StreamwatchError::Query(format!("invalid date '{raw}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_bodies_collapse_to_empty() {
        assert_eq!(FetchOutcome::from_body(json!({})), FetchOutcome::Empty);
        assert_eq!(FetchOutcome::from_body(json!(null)), FetchOutcome::Empty);
        assert!(matches!(
            FetchOutcome::from_body(json!({"metrics": []})),
            FetchOutcome::Data { .. }
        ));
    }

    #[test]
    fn empty_outcome_hands_over_empty_object() {
        assert_eq!(FetchOutcome::Empty.response(), Some(json!({})));
        assert_eq!(FetchOutcome::failed("timeout").response(), None);
    }

    #[test]
    fn query_parse_and_params() {
        let q = FetchQuery::parse(Some("2024-01-01"), Some("2024-03-31"), Some(" US ")).unwrap();
        assert_eq!(
            q.params(),
            vec![
                ("start_date", "2024-01-01".to_string()),
                ("end_date", "2024-03-31".to_string()),
                ("location", "US".to_string()),
            ]
        );
        assert!(FetchQuery::default().params().is_empty());
    }

    #[test]
    fn query_rejects_inverted_window() {
        let err = FetchQuery::parse(Some("2024-05-01"), Some("2024-01-01"), None).unwrap_err();
        assert!(matches!(err, StreamwatchError::Query(_)));
    }

    #[test]
    fn query_rejects_bad_date() {
        assert!(FetchQuery::parse(Some("01/02/2024"), None, None).is_err());
    }
}
