//! Structured diagnostic events emitted by the normalizer and the rules.
//!
//! The engine never prints. Every probe outcome and fallback choice is
//! reported as a [`DiagnosticEvent`] to a [`DiagnosticSink`]; the default
//! sink forwards to `tracing`, and [`DiagnosticLog`] keeps a capped in-memory
//! history that can be inspected after a batch. The log uses
//! `std::sync::RwLock` so rayon worker threads can share it.

use std::collections::VecDeque;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::verdict::RuleKind;

/// One observable step of normalization or rule evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DiagnosticEvent {
    /// Response was null, empty, or not an object.
    ResponseRejected { reason: String },
    /// The metrics list was found by the named strategy.
    MetricsLocated { strategy: &'static str },
    /// No strategy produced a metrics list.
    MetricsNotFound { top_level_keys: Vec<String> },
    /// The streams node was chosen by the named match pass.
    StreamsSelected { strategy: &'static str, name: String },
    /// No metric node looked like streams.
    StreamsNotFound { names: Vec<String> },
    /// A node in the tree could not be flattened.
    NodeSkipped { path: String, reason: String },
    /// Two leaves produced the same key; the later one was kept.
    KeyCollision { key: String },
    /// A probe found its value under `key` using the named strategy.
    ProbeResolved {
        field: &'static str,
        strategy: &'static str,
        key: String,
    },
    /// A candidate existed but had an unusable shape.
    ProbeRejected {
        field: &'static str,
        key: String,
        reason: String,
    },
    /// Nothing matched; lists the keys an operator may want to inspect.
    ProbeUnresolved {
        field: &'static str,
        related_keys: Vec<String>,
    },
    /// Final verdict of a rule.
    RuleEvaluated { rule: RuleKind, flagged: bool },
}

/// Consumer of diagnostic events.
pub trait DiagnosticSink: Send + Sync {
    fn record(&self, event: DiagnosticEvent);
}

/// Forwards events to `tracing` at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn record(&self, event: DiagnosticEvent) {
        match &event {
            DiagnosticEvent::ProbeRejected { .. } | DiagnosticEvent::NodeSkipped { .. } => {
                tracing::debug!(?event, "ambiguous metric shape");
            }
            _ => tracing::debug!(?event, "diagnostic"),
        }
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn record(&self, _event: DiagnosticEvent) {}
}

/// A recorded event with its capture time.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticEntry {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: DiagnosticEvent,
}

/// In-memory event history with FIFO eviction (default cap 1000).
pub struct DiagnosticLog {
    entries: RwLock<VecDeque<DiagnosticEntry>>,
    max_entries: usize,
}

impl DiagnosticLog {
    pub fn new() -> Self {
        Self::with_max_entries(1000)
    }

    pub fn with_max_entries(max: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::new()),
            max_entries: max,
        }
    }

    /// Snapshot of all retained entries, oldest first.
    pub fn entries(&self) -> Vec<DiagnosticEntry> {
        let guard = self.entries.read().unwrap_or_else(|e| e.into_inner());
        guard.iter().cloned().collect()
    }

    /// Retained events only, oldest first.
    pub fn events(&self) -> Vec<DiagnosticEvent> {
        let guard = self.entries.read().unwrap_or_else(|e| e.into_inner());
        guard.iter().map(|e| e.event.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

impl Default for DiagnosticLog {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticSink for DiagnosticLog {
    fn record(&self, event: DiagnosticEvent) {
        let entry = DiagnosticEntry {
            timestamp: Utc::now(),
            event,
        };
        let mut guard = self.entries.write().unwrap_or_else(|e| e.into_inner());
        guard.push_back(entry);
        while guard.len() > self.max_entries {
            guard.pop_front();
        }
    }
}
