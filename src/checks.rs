//! Probes assembled from `[[checks]]` configuration entries.
//!
//! Checks run in the order they are configured; the first failing check
//! ends the probe. How each kind fails determines the response:
//!
//! | kind   | failure                        | answered as |
//! |--------|--------------------------------|-------------|
//! | `tcp`  | connect refused / timed out    | 503         |
//! | `path` | path missing or unreadable     | 500         |
//! | `file` | as `path`, plus a deprecation  | 500         |
//! | `env`  | variable unset (warning)       | 500         |

use std::{
    net::{SocketAddr, TcpStream, ToSocketAddrs},
    path::Path,
    sync::Arc,
    time::Duration,
};

use anyhow::{anyhow, Context};

use crate::{config::CheckConfig, diagnostic, error::ProbeError, ping::Probe};

/// Build a probe running `checks` in order, or `None` when there are none.
pub fn build_probe(checks: &[CheckConfig]) -> Option<Probe> {
    if checks.is_empty() {
        return None;
    }
    let checks: Arc<[CheckConfig]> = checks.into();
    Some(Arc::new(move || checks.iter().try_for_each(run)))
}

/// Run a single check.
pub fn run(check: &CheckConfig) -> Result<(), ProbeError> {
    tracing::debug!(kind = check.kind(), "running check");
    match check {
        CheckConfig::Tcp { address, timeout_ms } => {
            tcp(address, Duration::from_millis(*timeout_ms)).map_err(ProbeError::unavailable)
        }
        CheckConfig::Path { path } => path_exists(path).map_err(ProbeError::failed),
        CheckConfig::File { path } => {
            diagnostic::deprecated("check kind `file` is deprecated; use `path`");
            path_exists(path).map_err(ProbeError::failed)
        }
        CheckConfig::Env { var } => {
            if std::env::var_os(var).map_or(true, |v| v.is_empty()) {
                diagnostic::warning(format!("environment variable `{var}` is not set"));
            }
            Ok(())
        }
    }
}

fn tcp(address: &str, timeout: Duration) -> anyhow::Result<()> {
    let addrs: Vec<SocketAddr> = address
        .to_socket_addrs()
        .with_context(|| format!("resolving {address}"))?
        .collect();

    let mut last_err = None;
    for addr in &addrs {
        match TcpStream::connect_timeout(addr, timeout) {
            Ok(_) => return Ok(()),
            Err(e) => last_err = Some(anyhow::Error::new(e).context(format!("connecting to {addr}"))),
        }
    }
    Err(last_err.unwrap_or_else(|| anyhow!("{address} resolved to no addresses")))
}

fn path_exists(path: &Path) -> anyhow::Result<()> {
    std::fs::metadata(path).with_context(|| format!("checking {}", path.display()))?;
    Ok(())
}
