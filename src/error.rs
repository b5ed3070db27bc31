//! Error types for probes and for the outcome of a ping.
//!
//! A probe reports failure by returning a [`ProbeError`]. The invoker turns
//! whatever the probe produced (a returned error, a panic or an aborting
//! diagnostic) into a [`Fault`], the closed set of outcomes the classifier
//! knows how to map onto a response.

use std::any::Any;

use crate::diagnostic::{Aborted, Diagnostic};

/// Error returned by a probe.
///
/// `Failed` converts from [`anyhow::Error`], so probes written against
/// `anyhow` can use `?` and `.context(..)` directly:
///
/// ```rust,ignore
/// let probe = || -> Result<(), ProbeError> {
///     std::fs::metadata("/var/run/app.ready").context("readiness marker")?;
///     Ok(())
/// };
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// An external dependency is unreachable. Answered with 503 so load
    /// balancers route around the instance while it recovers.
    #[error("dependency unavailable")]
    Unavailable(#[source] anyhow::Error),

    /// Any other application-level failure.
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

impl ProbeError {
    pub fn unavailable(err: impl Into<anyhow::Error>) -> Self {
        Self::Unavailable(err.into())
    }

    pub fn failed(err: impl Into<anyhow::Error>) -> Self {
        Self::Failed(err.into())
    }
}

/// Terminal abnormal outcome of a probe.
///
/// Messages are for the log sink only; they never reach the response body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Fault {
    /// Known, recoverable dependency failure ([`ProbeError::Unavailable`]).
    #[error("{0}")]
    Recoverable(String),

    /// Application-level failure ([`ProbeError::Failed`]).
    #[error("{0}")]
    Ordinary(String),

    /// Not recognised as an application failure: the probe panicked.
    #[error("probe panicked: {0}")]
    Severe(String),

    /// A non-deprecation diagnostic that aborted the probe.
    #[error(transparent)]
    PromotedDiagnostic(Diagnostic),
}

impl Fault {
    /// Short, stable name of the variant, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Recoverable(_) => "recoverable",
            Self::Ordinary(_) => "ordinary",
            Self::Severe(_) => "severe",
            Self::PromotedDiagnostic(_) => "promoted_diagnostic",
        }
    }

    /// Classify an unwind payload caught around a probe call.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let payload = match payload.downcast::<Aborted>() {
            Ok(aborted) => return Self::PromotedDiagnostic(aborted.0),
            Err(other) => other,
        };
        if let Some(msg) = payload.downcast_ref::<&'static str>() {
            Self::Severe((*msg).to_owned())
        } else if let Some(msg) = payload.downcast_ref::<String>() {
            Self::Severe(msg.clone())
        } else {
            Self::Severe("non-string panic payload".to_owned())
        }
    }
}

impl From<ProbeError> for Fault {
    fn from(err: ProbeError) -> Self {
        match err {
            // Alternate form keeps the whole `.context()` chain.
            ProbeError::Unavailable(inner) => {
                Self::Recoverable(format!("dependency unavailable: {inner:#}"))
            }
            ProbeError::Failed(inner) => Self::Ordinary(format!("{inner:#}")),
        }
    }
}
