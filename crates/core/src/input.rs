//! ISRC list extraction from uploaded CSV text.
//!
//! Only one column matters: the first header containing `isrc`
//! (case-insensitive), or the first column when no header matches.

use std::collections::HashSet;

use crate::error::{Result, StreamwatchError};

/// Extract unique, trimmed identifiers from CSV text, preserving first-seen order.
pub fn isrcs_from_csv(text: &str) -> Result<Vec<String>> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());

    let header = lines
        .next()
        .ok_or_else(|| StreamwatchError::Input("CSV input is empty".to_string()))?;
    let header = split_record(header.trim_start_matches('\u{feff}'));

    let column = match header
        .iter()
        .position(|name| name.to_lowercase().contains("isrc"))
    {
        Some(idx) => idx,
        None => {
            tracing::warn!(
                column = header.first().map(String::as_str).unwrap_or(""),
                "no ISRC column found, using first column"
            );
            0
        }
    };

    let mut seen = HashSet::new();
    let mut isrcs = Vec::new();
    for line in lines {
        let fields = split_record(line);
        let Some(value) = fields.get(column) else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        if seen.insert(value.to_string()) {
            isrcs.push(value.to_string());
        }
    }

    Ok(isrcs)
}

/// Split one CSV record, honouring double-quoted fields and `""` escapes.
pub(crate) fn split_record(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.trim_end_matches('\r').chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' if current.trim().is_empty() => {
                current.clear();
                in_quotes = true;
            }
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}
