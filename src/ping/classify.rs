//! Outcome → (status, log level, body) decision table.

use axum::http::StatusCode;

use crate::{error::Fault, logger::LogLevel};

use super::Outcome;

/// Body sent when the probe succeeds.
pub const PONG: &str = "pong";

/// How a ping outcome is answered and logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub status: StatusCode,
    /// `None` means nothing is logged for this outcome.
    pub log_level: Option<LogLevel>,
    pub body: &'static str,
}

/// Map an outcome onto its classification.
///
/// | outcome              | status | log level |
/// |----------------------|--------|-----------|
/// | success              | 200    | none      |
/// | recoverable          | 503    | critical  |
/// | ordinary             | 500    | error     |
/// | severe               | 500    | critical  |
/// | promoted diagnostic  | 500    | error     |
///
/// Failure bodies are the status' reason phrase; the fault message is never
/// part of the classification.
pub fn classify(outcome: &Outcome) -> Classification {
    let (status, log_level) = match outcome {
        Ok(()) => {
            return Classification {
                status: StatusCode::OK,
                log_level: None,
                body: PONG,
            }
        }
        Err(Fault::Recoverable(_)) => (StatusCode::SERVICE_UNAVAILABLE, LogLevel::Critical),
        Err(Fault::Ordinary(_)) => (StatusCode::INTERNAL_SERVER_ERROR, LogLevel::Error),
        Err(Fault::Severe(_)) => (StatusCode::INTERNAL_SERVER_ERROR, LogLevel::Critical),
        Err(Fault::PromotedDiagnostic(_)) => (StatusCode::INTERNAL_SERVER_ERROR, LogLevel::Error),
    };

    Classification {
        status,
        log_level: Some(log_level),
        body: status.canonical_reason().unwrap_or_default(),
    }
}
