//! Event log handed to the session.
//!
//! The session reports progress through an [`EventLog`] it receives at
//! construction instead of a process-wide logger. Severities are fixed:
//! [`Severity::Info`], [`Severity::Error`] and [`Severity::Critical`].
//! Messages keep the collector's `action: … | result: …` shape.
//!
//! [`TracingLog`] forwards to `tracing`; [`MemoryLog`] keeps entries in
//! memory for inspection.

use std::fmt;
use std::sync::Mutex;

/// Log severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Error,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Info => "INFO",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        })
    }
}

/// Observational sink for session events. Has no effect on control flow.
pub trait EventLog: Send + Sync {
    fn log(&self, severity: Severity, message: fmt::Arguments<'_>);

    fn info(&self, message: fmt::Arguments<'_>) {
        self.log(Severity::Info, message);
    }

    fn error(&self, message: fmt::Arguments<'_>) {
        self.log(Severity::Error, message);
    }

    fn critical(&self, message: fmt::Arguments<'_>) {
        self.log(Severity::Critical, message);
    }
}

/// Forwards events to `tracing`. Critical events are emitted at error level
/// with `critical = true`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLog;

impl EventLog for TracingLog {
    fn log(&self, severity: Severity, message: fmt::Arguments<'_>) {
        match severity {
            Severity::Info => tracing::info!("{}", message),
            Severity::Error => tracing::error!("{}", message),
            Severity::Critical => tracing::error!(critical = true, "{}", message),
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemoryLog {
    entries: Mutex<Vec<(Severity, String)>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded events, oldest first.
    pub fn entries(&self) -> Vec<(Severity, String)> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// Whether any event of `severity` contains `needle`.
    pub fn contains(&self, severity: Severity, needle: &str) -> bool {
        self.entries()
            .iter()
            .any(|(s, m)| *s == severity && m.contains(needle))
    }
}

impl EventLog for MemoryLog {
    fn log(&self, severity: Severity, message: fmt::Arguments<'_>) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push((severity, message.to_string()));
        }
    }
}

impl<L: EventLog + ?Sized> EventLog for std::sync::Arc<L> {
    fn log(&self, severity: Severity, message: fmt::Arguments<'_>) {
        (**self).log(severity, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_memory_log_records_in_order() {
        let log = MemoryLog::new();
        log.info(format_args!("action: connect | result: success"));
        log.critical(format_args!("action: connect | result: fail"));

        let entries = log.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, Severity::Info);
        assert_eq!(entries[1].1, "action: connect | result: fail");
        assert!(log.contains(Severity::Critical, "result: fail"));
        assert!(!log.contains(Severity::Error, "result: fail"));
    }

    #[test]
    fn test_arc_forwarding() {
        let log = Arc::new(MemoryLog::new());
        let shared: Arc<MemoryLog> = log.clone();
        shared.error(format_args!("boom {}", 1));
        assert!(log.contains(Severity::Error, "boom 1"));
    }

    #[test]
    fn test_tracing_log_does_not_panic_without_subscriber() {
        TracingLog.info(format_args!("action: test | result: success"));
        TracingLog.critical(format_args!("action: test | result: fail"));
    }

    #[test]
    fn test_severity_display() {
        assert_eq!(Severity::Critical.to_string(), "CRITICAL");
    }
}
