//! The ping controller: invoke → classify → render.
//!
//! ```text
//! Probe ──▶ invoker::invoke ──▶ Outcome ──▶ classify ──▶ Classification
//!                │                                          │
//!                └─ notice: suppressed deprecations         ├─ log "Ping failed"
//!                                                           ▼
//!                                                 render ──▶ ResponseSpec
//! ```
//!
//! Nothing here keeps state between calls. Every [`PingController::check`]
//! runs the probe once, synchronously, and may block for as long as the
//! probe does; callers that need a deadline apply it around the call.

pub mod classify;
pub mod invoker;
pub mod render;

use std::sync::Arc;

use axum::http::Version;

use crate::{
    error::{Fault, ProbeError},
    logger::{LogContext, NullLogger, PingLogger},
};

pub use classify::{classify, Classification, PONG};
pub use invoker::invoke;
pub use render::{render, ResponseSpec};

/// Caller-supplied health check.
pub type Probe = Arc<dyn Fn() -> Result<(), ProbeError> + Send + Sync>;

/// Result of one probe invocation; `Ok(())` is success.
pub type Outcome = Result<(), Fault>;

/// Message of every fault log entry.
pub const FAILURE_MESSAGE: &str = "Ping failed";

/// Answers pings by running an optional probe.
#[derive(Clone)]
pub struct PingController {
    probe: Option<Probe>,
    logger: Arc<dyn PingLogger>,
}

impl PingController {
    /// No probe means the ping always succeeds; no logger means log entries
    /// are discarded.
    pub fn new(probe: Option<Probe>, logger: Option<Arc<dyn PingLogger>>) -> Self {
        Self {
            probe,
            logger: logger.unwrap_or_else(|| Arc::new(NullLogger)),
        }
    }

    /// Always healthy, nothing logged.
    pub fn always_healthy() -> Self {
        Self::new(None, None)
    }

    pub fn has_probe(&self) -> bool {
        self.probe.is_some()
    }

    /// The sink fault entries are written to.
    pub fn logger(&self) -> &Arc<dyn PingLogger> {
        &self.logger
    }

    /// Run the probe once and render the response.
    pub fn check(&self, version: Option<Version>) -> ResponseSpec {
        let outcome = invoke(self.probe.as_ref(), &self.logger);
        self.respond(&outcome, version)
    }

    /// Run the probe once without classifying the outcome.
    ///
    /// Deprecations raised by the probe go to `logger` rather than the
    /// controller's own sink. Pair with [`PingController::respond`], which
    /// must then be called at most once for the returned outcome.
    pub fn run_probe(&self, logger: &Arc<dyn PingLogger>) -> Outcome {
        invoke(self.probe.as_ref(), logger)
    }

    /// Classify an outcome, log it if it is a fault, and render it.
    ///
    /// Exposed so a caller that gives up on the probe (e.g. on a deadline)
    /// can answer through the same policy.
    pub fn respond(&self, outcome: &Outcome, version: Option<Version>) -> ResponseSpec {
        let classification = classify(outcome);
        if let (Err(fault), Some(level)) = (outcome, classification.log_level) {
            self.logger
                .log(level, FAILURE_MESSAGE, &LogContext::with_fault(fault));
        }
        render(&classification, version)
    }
}

impl std::fmt::Debug for PingController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PingController")
            .field("has_probe", &self.has_probe())
            .finish_non_exhaustive()
    }
}
