//! Flat metric model produced by the normalizer.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Mapping from `_`-joined ancestor path to the terminal value found there.
///
/// Insertion order follows traversal order of the source tree. Rules never
/// depend on it, but it keeps diagnostic key listings stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlatMetrics(IndexMap<String, Value>);

impl FlatMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a leaf. Returns the displaced value when the key already existed.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Numeric reading of a key (see [`as_number`]).
    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(as_number)
    }

    /// The `total` stream count, when present and numeric.
    pub fn total(&self) -> Option<f64> {
        self.number("total")
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn key_list(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }
}

impl FromIterator<(String, Value)> for FlatMetrics {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Tolerant numeric reading: JSON numbers, or strings holding a finite float.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

/// Numeric reading restricted to strictly positive values.
pub fn as_positive(value: &Value) -> Option<f64> {
    as_number(value).filter(|v| *v > 0.0)
}

/// Render a stream count with `,` thousands separators (`1234567` -> `1,234,567`).
pub fn format_count(value: f64) -> String {
    // Beyond u64 the integer cast saturates.
    if value.fract() != 0.0 || !value.is_finite() || value.abs() >= u64::MAX as f64 {
        return format!("{value}");
    }
    let digits = format!("{}", value.abs() as u64);
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if value < 0.0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}
