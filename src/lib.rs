//! Uncacheable ping endpoint around a pluggable health probe.
//!
//! The core lives in [`ping`]: a [`PingController`] runs an optional
//! [`Probe`] once per request, classifies what happened and renders a
//! plain-text response that no cache will keep. [`diagnostic`] supplies the
//! soft-failure channel probes report through, [`logger`] the sink the
//! controller reports to. [`api`], [`checks`] and [`config`] wrap the core
//! into a standalone service.

pub mod api;
pub mod checks;
pub mod config;
pub mod diagnostic;
pub mod error;
pub mod logger;
pub mod ping;

pub use config::Config;
pub use error::{Fault, ProbeError};
pub use ping::{PingController, Probe};
