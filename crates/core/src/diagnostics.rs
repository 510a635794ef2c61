// ABOUTME: Injected diagnostics sink receiving per-strategy extraction telemetry.
// ABOUTME: TracingSink forwards events to tracing; CollectingSink keeps them in memory for tests.

use std::fmt;
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::error::ErrorCode;
use crate::platform::Platform;

/// What happened when a fallback strategy ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The strategy produced this many format candidates, ending the chain.
    Yielded { formats: usize },
    /// The strategy ran but found no format candidates.
    Empty,
    /// The strategy failed and the failure was recovered locally.
    Failed { code: ErrorCode, message: String },
    /// The strategy was never run because an earlier one yielded formats.
    Skipped,
}

/// One telemetry event emitted by the fallback chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub platform: Platform,
    pub strategy: &'static str,
    pub outcome: Outcome,
}

/// Receiver for extraction telemetry, passed into the client through `Options`.
pub trait DiagnosticSink: Send + Sync + fmt::Debug {
    fn record(&self, event: &Diagnostic);
}

/// Default sink: structured `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn record(&self, event: &Diagnostic) {
        match &event.outcome {
            Outcome::Yielded { formats } => debug!(
                platform = %event.platform,
                strategy = event.strategy,
                formats = *formats,
                "strategy yielded formats"
            ),
            Outcome::Empty => debug!(
                platform = %event.platform,
                strategy = event.strategy,
                "strategy found no formats"
            ),
            Outcome::Failed { code, message } => warn!(
                platform = %event.platform,
                strategy = event.strategy,
                code = %code,
                "strategy failed: {}",
                message
            ),
            Outcome::Skipped => debug!(
                platform = %event.platform,
                strategy = event.strategy,
                "strategy skipped"
            ),
        }
    }
}

/// Sink that stores every event, for assertions in tests.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<Diagnostic>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events recorded so far.
    pub fn events(&self) -> Vec<Diagnostic> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Outcomes recorded for one strategy name.
    pub fn outcomes_for(&self, strategy: &str) -> Vec<Outcome> {
        self.events()
            .into_iter()
            .filter(|e| e.strategy == strategy)
            .map(|e| e.outcome)
            .collect()
    }
}

impl DiagnosticSink for CollectingSink {
    fn record(&self, event: &Diagnostic) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
