//! HTTP surface: the ping route plus request-id and tracing layers.

pub mod ping;
pub mod request_id;

use std::{
    path::PathBuf,
    sync::{Arc, RwLock},
    time::{Duration, SystemTime},
};

use axum::{routing::get, Router};

use crate::{checks, config::Config, logger::PingLogger, ping::PingController};

/// Result of one poll of the config file.
#[derive(Debug)]
pub enum Reload {
    /// Missing, or mtime unchanged since the last poll.
    Unchanged,
    /// The checks were rebuilt from the new file.
    Applied { checks: usize },
    /// The new file failed to load; the previous checks stay active.
    Rejected(anyhow::Error),
}

/// Shared state behind the router.
pub struct AppState {
    /// Swappable on config reload; the lock is held only for `Arc::clone`.
    controller: RwLock<Arc<PingController>>,
    /// Used when rebuilding the controller from a reloaded config.
    logger: Arc<dyn PingLogger>,
    /// Deadline for one probe run. `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
    /// Path to the config file on disk, used by the hot-reload task.
    pub config_path: PathBuf,
}

impl AppState {
    pub fn new(config: &Config, config_path: PathBuf, logger: Arc<dyn PingLogger>) -> Self {
        let controller = Self::build_controller(config, &logger);
        if controller.has_probe() {
            tracing::info!(checks = config.checks.len(), "ping checks configured");
        }
        Self {
            controller: RwLock::new(Arc::new(controller)),
            logger,
            request_timeout: config.server.request_timeout_ms.map(Duration::from_millis),
            config_path,
        }
    }

    /// State around an existing controller, with no config file behind it.
    pub fn from_controller(controller: PingController, request_timeout: Option<Duration>) -> Self {
        Self {
            controller: RwLock::new(Arc::new(controller)),
            logger: Arc::new(crate::logger::NullLogger),
            request_timeout,
            config_path: PathBuf::new(),
        }
    }

    fn build_controller(config: &Config, logger: &Arc<dyn PingLogger>) -> PingController {
        PingController::new(checks::build_probe(&config.checks), Some(Arc::clone(logger)))
    }

    /// The controller pings should use right now.
    pub fn controller(&self) -> Arc<PingController> {
        let guard = self
            .controller
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Rebuild the controller from a reloaded config.
    ///
    /// Only the checks are picked up; port, route and timeout need a restart.
    pub fn replace_config(&self, config: &Config) {
        let controller = Arc::new(Self::build_controller(config, &self.logger));
        *self
            .controller
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = controller;
    }

    /// Reload the config file if its mtime moved past `last_seen`.
    ///
    /// `last_seen` advances whether or not the new file loads, so a broken
    /// file is reported once rather than on every poll.
    pub fn reload_if_changed(&self, last_seen: &mut Option<SystemTime>) -> Reload {
        let mtime = std::fs::metadata(&self.config_path)
            .and_then(|m| m.modified())
            .ok();
        if mtime.is_none() || mtime == *last_seen {
            return Reload::Unchanged;
        }
        *last_seen = mtime;

        match Config::load(&self.config_path) {
            Ok(config) => {
                self.replace_config(&config);
                Reload::Applied {
                    checks: config.checks.len(),
                }
            }
            Err(e) => Reload::Rejected(e),
        }
    }
}

/// Build the axum router serving the ping on `path` (GET and HEAD).
pub fn router(state: Arc<AppState>, path: &str) -> Router {
    Router::new()
        .route(path, get(ping::ping))
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .with_state(state)
}
