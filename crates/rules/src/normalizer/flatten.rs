//! Recursive flattening of a metric subtree into [`FlatMetrics`].

use serde_json::{Map, Value};

use crate::diagnostics::{DiagnosticEvent, DiagnosticSink};
use crate::flat::FlatMetrics;
use crate::probe::value_kind;

/// Flatten a list of metric nodes. Nested lists contribute `<name>_` to the
/// keys of their descendants; every other value is stored as a leaf.
///
/// On key collision the leaf visited later replaces the earlier value.
pub fn flatten(children: &[Value], sink: &dyn DiagnosticSink) -> FlatMetrics {
    let mut out = FlatMetrics::new();
    flatten_into(children, "", &mut out, sink);
    out
}

fn flatten_into(children: &[Value], prefix: &str, out: &mut FlatMetrics, sink: &dyn DiagnosticSink) {
    for (idx, child) in children.iter().enumerate() {
        let Some(node) = child.as_object() else {
            sink.record(DiagnosticEvent::NodeSkipped {
                path: format!("{prefix}[{idx}]"),
                reason: format!("{} item is not a metric node", value_kind(child)),
            });
            continue;
        };

        let key = format!("{prefix}{}", node_name(node));
        match node.get("value") {
            Some(Value::Array(grandchildren)) => {
                flatten_into(grandchildren, &format!("{key}_"), out, sink);
            }
            leaf => {
                let value = leaf.cloned().unwrap_or(Value::Null);
                if out.insert(key.clone(), value).is_some() {
                    sink.record(DiagnosticEvent::KeyCollision { key });
                }
            }
        }
    }
}

/// Path segment for a node: string names verbatim, scalar names as JSON text,
/// anything else as the empty string.
pub(crate) fn node_name(node: &Map<String, Value>) -> String {
    match node.get("name") {
        Some(Value::String(s)) => s.clone(),
        Some(v @ (Value::Number(_) | Value::Bool(_))) => v.to_string(),
        _ => String::new(),
    }
}
