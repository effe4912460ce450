//! Ordered key-resolution strategies over [`FlatMetrics`].
//!
//! The producer names the same figure differently from one response to the
//! next. Each logical field is described by a [`Probe`]: a fixed list of
//! strategies tried in order, the first one yielding an acceptable value
//! winning. The probe order is data, so it can be reviewed and tested
//! without walking through nested conditionals.

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::diagnostics::{DiagnosticEvent, DiagnosticSink};
use crate::flat::{as_number, FlatMetrics};

/// One place a probe may look.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStrategy {
    /// A flat key, verbatim.
    Key(&'static str),
    /// A member of an object stored under `parent`.
    Nested {
        parent: &'static str,
        child: &'static str,
    },
    /// Numeric keys starting with the prefix, grouped by the first
    /// `_`-separated segment after it and summed. Recovers breakdowns that
    /// were flattened, including entries split further below each name.
    Prefixed(&'static str),
}

impl ProbeStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            ProbeStrategy::Key(_) => "key",
            ProbeStrategy::Nested { .. } => "nested",
            ProbeStrategy::Prefixed(_) => "prefixed",
        }
    }

    /// Human-readable location, e.g. `location.dma` or `dma_*`.
    pub fn describe(&self) -> String {
        match self {
            ProbeStrategy::Key(key) => key.to_string(),
            ProbeStrategy::Nested { parent, child } => format!("{parent}.{child}"),
            ProbeStrategy::Prefixed(prefix) => format!("{prefix}*"),
        }
    }

    /// The raw candidate this strategy sees, if any.
    fn candidate(&self, flat: &FlatMetrics) -> Candidate {
        match self {
            ProbeStrategy::Key(key) => match flat.get(key) {
                Some(v) => Candidate::Found(v.clone()),
                None => Candidate::Missing,
            },
            ProbeStrategy::Nested { parent, child } => match flat.get(parent) {
                Some(Value::Object(map)) => match map.get(*child) {
                    Some(v) => Candidate::Found(v.clone()),
                    None => Candidate::Missing,
                },
                Some(other) => Candidate::Unusable(format!(
                    "parent '{parent}' is {}, not an object",
                    value_kind(other)
                )),
                None => Candidate::Missing,
            },
            ProbeStrategy::Prefixed(prefix) => {
                let mut sums: IndexMap<&str, f64> = IndexMap::new();
                for (key, value) in flat.iter() {
                    let Some(rest) = key.strip_prefix(prefix) else {
                        continue;
                    };
                    let name = rest.split('_').next().unwrap_or_default();
                    if name.is_empty() {
                        continue;
                    }
                    if let Some(n) = as_number(value) {
                        *sums.entry(name).or_default() += n;
                    }
                }
                if sums.is_empty() {
                    return Candidate::Missing;
                }
                let gathered: Map<String, Value> = sums
                    .into_iter()
                    .map(|(name, total)| (name.to_string(), Value::from(total)))
                    .collect();
                Candidate::Found(Value::Object(gathered))
            }
        }
    }
}

enum Candidate {
    Missing,
    Found(Value),
    Unusable(String),
}

/// A value resolved by a probe, with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Probed<T> {
    pub key: String,
    pub strategy: &'static str,
    pub value: T,
}

/// Ordered resolution strategies for one logical field.
#[derive(Debug, Clone, Copy)]
pub struct Probe {
    /// Field name used in diagnostics.
    pub field: &'static str,
    pub strategies: &'static [ProbeStrategy],
    /// Substrings marking keys worth listing when nothing resolves.
    pub hints: &'static [&'static str],
}

impl Probe {
    /// Try each strategy in order; `accept` decides whether a candidate is usable.
    ///
    /// Present-but-unusable candidates are reported and skipped. When nothing
    /// resolves, the keys matching `hints` are reported for diagnosis.
    pub fn resolve<T>(
        &self,
        flat: &FlatMetrics,
        sink: &dyn DiagnosticSink,
        accept: impl Fn(&Value) -> Option<T>,
    ) -> Option<Probed<T>> {
        for strategy in self.strategies {
            let reason = match strategy.candidate(flat) {
                Candidate::Missing => continue,
                Candidate::Unusable(reason) => reason,
                Candidate::Found(raw) => match accept(&raw) {
                    Some(value) => {
                        let key = strategy.describe();
                        sink.record(DiagnosticEvent::ProbeResolved {
                            field: self.field,
                            strategy: strategy.name(),
                            key: key.clone(),
                        });
                        return Some(Probed {
                            key,
                            strategy: strategy.name(),
                            value,
                        });
                    }
                    None => format!("unusable {} value", value_kind(&raw)),
                },
            };
            sink.record(DiagnosticEvent::ProbeRejected {
                field: self.field,
                key: strategy.describe(),
                reason,
            });
        }

        sink.record(DiagnosticEvent::ProbeUnresolved {
            field: self.field,
            related_keys: self.related_keys(flat),
        });
        None
    }

    /// Keys whose lowercase form contains any hint.
    pub fn related_keys(&self, flat: &FlatMetrics) -> Vec<String> {
        flat.keys()
            .filter(|key| {
                let lower = key.to_lowercase();
                self.hints.iter().any(|h| lower.contains(h))
            })
            .map(str::to_string)
            .collect()
    }
}

pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{DiagnosticLog, NullSink};
    use crate::flat::as_positive;
    use serde_json::json;

    const PROBE: Probe = Probe {
        field: "example",
        strategies: &[
            ProbeStrategy::Key("first"),
            ProbeStrategy::Key("second"),
            ProbeStrategy::Nested {
                parent: "group",
                child: "third",
            },
            ProbeStrategy::Prefixed("part_"),
        ],
        hints: &["first", "part"],
    };

    fn flat(pairs: &[(&str, Value)]) -> FlatMetrics {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn first_acceptable_strategy_wins() {
        let f = flat(&[("second", json!(5)), ("first", json!(7))]);
        let hit = PROBE.resolve(&f, &NullSink, as_positive).unwrap();
        assert_eq!(hit.key, "first");
        assert_eq!(hit.value, 7.0);
    }

    #[test]
    fn rejected_candidates_fall_through() {
        let log = DiagnosticLog::new();
        let f = flat(&[("first", json!(0)), ("second", json!(3))]);
        let hit = PROBE.resolve(&f, &log, as_positive).unwrap();
        assert_eq!(hit.key, "second");
        assert!(log.events().contains(&DiagnosticEvent::ProbeRejected {
            field: "example",
            key: "first".into(),
            reason: "unusable number value".into(),
        }));
    }

    #[test]
    fn nested_lookup() {
        let f = flat(&[("group", json!({"third": 9}))]);
        let hit = PROBE.resolve(&f, &NullSink, as_positive).unwrap();
        assert_eq!(hit.key, "group.third");
        assert_eq!(hit.strategy, "nested");
    }

    #[test]
    fn prefixed_gathers_numeric_keys() {
        let f = flat(&[
            ("part_a", json!(1)),
            ("part_b", json!("2")),
            ("part_c", json!("x")),
            ("other", json!(4)),
        ]);
        let hit = PROBE
            .resolve(&f, &NullSink, |v| v.as_object().cloned())
            .unwrap();
        assert_eq!(hit.key, "part_*");
        assert_eq!(hit.value.len(), 2);
        assert!(hit.value.contains_key("a") && hit.value.contains_key("b"));
    }

    #[test]
    fn prefixed_sums_deeper_segments_into_first() {
        let f = flat(&[
            ("part_a_free", json!(450)),
            ("part_b", json!(100)),
            ("part_a_premium", json!("450")),
            ("part_", json!(7)),
        ]);
        let hit = PROBE
            .resolve(&f, &NullSink, |v| v.as_object().cloned())
            .unwrap();
        let keys: Vec<&str> = hit.value.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(hit.value["a"].as_f64(), Some(900.0));
        assert_eq!(hit.value["b"].as_f64(), Some(100.0));
    }

    #[test]
    fn unresolved_reports_related_keys() {
        let log = DiagnosticLog::new();
        let f = flat(&[("FIRST_ish", json!("nope")), ("unrelated", json!(1))]);
        assert!(PROBE.resolve(&f, &log, as_positive).is_none());
        assert_eq!(
            log.events().last(),
            Some(&DiagnosticEvent::ProbeUnresolved {
                field: "example",
                related_keys: vec!["FIRST_ish".into()],
            })
        );
    }
}
