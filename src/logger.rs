//! The logging collaborator of the ping controller.
//!
//! The controller only ever talks to a [`PingLogger`]. Three implementations
//! ship with the crate:
//!
//! - [`TracingLogger`]: production sink, emits `tracing` events.
//! - [`NullLogger`]: discards everything; substituted when no logger is
//!   configured so the controller never has to special-case absence.
//! - [`BufferingLogger`]: keeps records in memory until drained with
//!   [`BufferingLogger::clean_logs`].
//!
//! [`GatedLogger`] wraps any of them for a single probe run that may be
//! abandoned before it finishes.

use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, PoisonError,
    },
};

use crate::error::Fault;

/// Syslog-style log levels, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Critical,
    Alert,
    Emergency,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Notice => "notice",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
            Self::Alert => "alert",
            Self::Emergency => "emergency",
        })
    }
}

/// Structured context attached to a log entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogContext<'a> {
    /// The fault that made the ping fail, if any.
    pub fault: Option<&'a Fault>,
}

impl<'a> LogContext<'a> {
    pub fn with_fault(fault: &'a Fault) -> Self {
        Self { fault: Some(fault) }
    }

    pub fn is_empty(&self) -> bool {
        self.fault.is_none()
    }
}

/// Sink for the controller's log emissions.
///
/// Implementations must not fail; logging is a side effect the ping result
/// never depends on.
pub trait PingLogger: Send + Sync {
    fn log(&self, level: LogLevel, message: &str, context: &LogContext<'_>);
}

/// Discards every entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLogger;

impl PingLogger for NullLogger {
    fn log(&self, _level: LogLevel, _message: &str, _context: &LogContext<'_>) {}
}

/// Forwards entries to `tracing` under the `ping_probe::ping` target.
///
/// `tracing` has no notice/critical/alert/emergency levels, so the original
/// level travels in the `severity` field.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl PingLogger for TracingLogger {
    fn log(&self, level: LogLevel, message: &str, context: &LogContext<'_>) {
        let fault = context.fault.map(tracing::field::display);
        let fault_kind = context.fault.map(Fault::kind);
        match level {
            LogLevel::Debug => {
                tracing::debug!(target: "ping_probe::ping", severity = %level, fault_kind, fault, "{message}")
            }
            LogLevel::Info | LogLevel::Notice => {
                tracing::info!(target: "ping_probe::ping", severity = %level, fault_kind, fault, "{message}")
            }
            LogLevel::Warning => {
                tracing::warn!(target: "ping_probe::ping", severity = %level, fault_kind, fault, "{message}")
            }
            LogLevel::Error | LogLevel::Critical | LogLevel::Alert | LogLevel::Emergency => {
                tracing::error!(target: "ping_probe::ping", severity = %level, fault_kind, fault, "{message}")
            }
        }
    }
}

/// An owned copy of one log emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub level: LogLevel,
    pub message: String,
    pub fault: Option<Fault>,
}

impl LogRecord {
    pub fn new(level: LogLevel, message: impl Into<String>, fault: Option<Fault>) -> Self {
        Self {
            level,
            message: message.into(),
            fault,
        }
    }
}

/// Keeps every entry in memory, in emission order.
#[derive(Debug, Default)]
pub struct BufferingLogger {
    records: Mutex<Vec<LogRecord>>,
}

impl BufferingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take all records logged so far, leaving the buffer empty.
    pub fn clean_logs(&self) -> Vec<LogRecord> {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *records)
    }
}

impl PingLogger for BufferingLogger {
    fn log(&self, level: LogLevel, message: &str, context: &LogContext<'_>) {
        let record = LogRecord::new(level, message, context.fault.cloned());
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }
}

/// Forwards to an inner logger until [`GatedLogger::close`] is called.
///
/// Entries arriving after the gate closes are dropped. Used for a probe run
/// whose request has already been answered.
pub struct GatedLogger {
    inner: Arc<dyn PingLogger>,
    open: AtomicBool,
}

impl GatedLogger {
    pub fn new(inner: Arc<dyn PingLogger>) -> Self {
        Self {
            inner,
            open: AtomicBool::new(true),
        }
    }

    pub fn close(&self) {
        self.open.store(false, Ordering::Release);
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }
}

impl PingLogger for GatedLogger {
    fn log(&self, level: LogLevel, message: &str, context: &LogContext<'_>) {
        if self.is_open() {
            self.inner.log(level, message, context);
        }
    }
}

impl fmt::Debug for GatedLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatedLogger")
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}
