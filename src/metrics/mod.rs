//! Prometheus metrics for monitoring.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Metrics collector.
#[derive(Debug, Default)]
pub struct Metrics {
    /// Total requests processed
    pub requests_total: AtomicU64,
    /// Requests answered with a JSON-RPC error
    pub requests_failed: AtomicU64,
    /// Tool calls
    pub tool_calls: AtomicU64,
    /// Tool calls that returned an error result
    pub tool_failures: AtomicU64,
    /// Dialogs shown to the human
    pub dialogs_shown: AtomicU64,
    /// Dialogs the human confirmed
    pub dialogs_answered: AtomicU64,
    /// Dialogs the human cancelled or closed
    pub dialogs_cancelled: AtomicU64,
    /// Elicitation requests sent to the client
    pub elicitations: AtomicU64,
    /// Sampling requests sent to the client
    pub samplings: AtomicU64,
}

impl Metrics {
    /// Create a new metrics collector.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_requests(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_failed(&self) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_tool_calls(&self) {
        self.tool_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_tool_failures(&self) {
        self.tool_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one dialog and how it ended.
    pub fn record_dialog(&self, answered: bool) {
        self.dialogs_shown.fetch_add(1, Ordering::Relaxed);
        if answered {
            self.dialogs_answered.fetch_add(1, Ordering::Relaxed);
        } else {
            self.dialogs_cancelled.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn inc_elicitations(&self) {
        self.elicitations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_samplings(&self) {
        self.samplings.fetch_add(1, Ordering::Relaxed);
    }

    /// Get all metrics as a snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
            tool_calls: self.tool_calls.load(Ordering::Relaxed),
            tool_failures: self.tool_failures.load(Ordering::Relaxed),
            dialogs_shown: self.dialogs_shown.load(Ordering::Relaxed),
            dialogs_answered: self.dialogs_answered.load(Ordering::Relaxed),
            dialogs_cancelled: self.dialogs_cancelled.load(Ordering::Relaxed),
            elicitations: self.elicitations.load(Ordering::Relaxed),
            samplings: self.samplings.load(Ordering::Relaxed),
        }
    }

    /// Export metrics in Prometheus format.
    pub fn to_prometheus(&self) -> String {
        let s = self.snapshot();
        let series: [(&str, &str, &str, u64); 9] = [
            ("requests_total", "counter", "Total number of requests", s.requests_total),
            ("requests_failed", "counter", "Requests answered with an error", s.requests_failed),
            ("tool_calls", "counter", "Tool calls count", s.tool_calls),
            ("tool_failures", "counter", "Tool calls that failed", s.tool_failures),
            ("dialogs_shown", "counter", "Dialogs shown to the human", s.dialogs_shown),
            ("dialogs_answered", "counter", "Dialogs confirmed by the human", s.dialogs_answered),
            ("dialogs_cancelled", "counter", "Dialogs cancelled by the human", s.dialogs_cancelled),
            ("elicitations", "counter", "Elicitation requests sent", s.elicitations),
            ("samplings", "counter", "Sampling requests sent", s.samplings),
        ];

        let mut out = String::new();
        for (name, kind, help, value) in series {
            out.push_str(&format!(
                "# HELP human_in_the_loop_{name} {help}\n# TYPE human_in_the_loop_{name} {kind}\nhuman_in_the_loop_{name} {value}\n\n"
            ));
        }
        out
    }
}

/// Metrics snapshot.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub requests_failed: u64,
    pub tool_calls: u64,
    pub tool_failures: u64,
    pub dialogs_shown: u64,
    pub dialogs_answered: u64,
    pub dialogs_cancelled: u64,
    pub elicitations: u64,
    pub samplings: u64,
}

/// Timer for measuring durations.
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed time in milliseconds.
    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}
