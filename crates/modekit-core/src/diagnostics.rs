//! Diagnostics sink for configuration errors and load failures.
//!
//! ## Learning: Reporting Instead of Returning
//!
//! Most problems in a mode catalog should not stop anything: a broken glob
//! disables one matcher, a missing rule file disables one highlighter. Those
//! call sites report through [`Diagnostics`] and keep going, so the trait
//! method returns `()` and implementations must never panic.

use std::fmt;

use parking_lot::Mutex;

/// How bad a reported problem is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Debug,
    Message,
    Notice,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Debug => "debug",
            Severity::Message => "message",
            Severity::Notice => "notice",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(label)
    }
}

/// A single report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Component that reported it, e.g. `catalog` or a mode name
    pub source: String,
    pub message: String,
}

/// Receiver of diagnostics.
///
/// `Send + Sync` so one sink can be shared by the registry and every
/// editing session resolving modes through it.
pub trait Diagnostics: Send + Sync {
    /// Records a problem. Must not fail.
    fn report(&self, severity: Severity, source: &str, message: &str);
}

/// Forwards every report to `tracing` at the matching level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn report(&self, severity: Severity, source: &str, message: &str) {
        emit(severity, source, message);
    }
}

fn emit(severity: Severity, source: &str, message: &str) {
    match severity {
        Severity::Debug => tracing::debug!(source, "{}", message),
        Severity::Message | Severity::Notice => tracing::info!(source, "{}", message),
        Severity::Warning => tracing::warn!(source, "{}", message),
        Severity::Error => tracing::error!(source, "{}", message),
    }
}

/// Keeps every report in memory and also logs it.
#[derive(Debug, Default)]
pub struct DiagnosticLog {
    entries: Mutex<Vec<Diagnostic>>,
}

impl DiagnosticLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything reported so far.
    pub fn entries(&self) -> Vec<Diagnostic> {
        self.entries.lock().clone()
    }

    /// Returns reports at or above `severity`.
    pub fn at_least(&self, severity: Severity) -> Vec<Diagnostic> {
        self.entries
            .lock()
            .iter()
            .filter(|d| d.severity >= severity)
            .cloned()
            .collect()
    }

    /// Number of error-level reports.
    pub fn error_count(&self) -> usize {
        self.entries
            .lock()
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    /// Drops all recorded reports.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl Diagnostics for DiagnosticLog {
    fn report(&self, severity: Severity, source: &str, message: &str) {
        emit(severity, source, message);
        self.entries.lock().push(Diagnostic {
            severity,
            source: source.to_string(),
            message: message.to_string(),
        });
    }
}
