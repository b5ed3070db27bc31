use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ping_probe::{
    api::{self, AppState, Reload},
    config::LogFormat,
    logger::{PingLogger, TracingLogger},
    Config,
};

const DEFAULT_CONFIG_PATH: &str = "/etc/ping-probe/config.toml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let explicit_path = std::env::var("PING_PROBE_CONFIG").ok().map(PathBuf::from);
    let config_path = explicit_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    // An explicitly named config file must exist; the default one is optional.
    let config = match &explicit_path {
        Some(path) => Config::load(path),
        None => Config::load_or_default(&config_path),
    }
    .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    // When invoked as a Docker HEALTHCHECK, ping ourselves and exit immediately.
    // This avoids needing any external tool (curl/wget) in the container image.
    if std::env::args().nth(1).as_deref() == Some("--healthcheck") {
        return healthcheck(&config).await;
    }

    init_tracing(&config);

    info!(
        port = config.server.port,
        path = %config.server.path,
        checks = config.checks.len(),
        "ping-probe starting"
    );

    let logger: Arc<dyn PingLogger> = Arc::new(TracingLogger);
    let state = Arc::new(AppState::new(&config, config_path, logger));

    // Spawn hot-reload watcher; polls the config file every 5 seconds
    tokio::spawn(config_watcher(Arc::clone(&state)));

    let addr: SocketAddr = format!("0.0.0.0:{}", config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "listening");

    let app = api::router(state, &config.server.path).layer(
        tower_http::trace::TraceLayer::new_for_http()
            .make_span_with(tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::DEBUG))
            .on_response(tower_http::trace::DefaultOnResponse::new().level(tracing::Level::DEBUG)),
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("ping server error")?;

    info!("shutdown complete");
    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        config
            .server
            .log_level
            .as_deref()
            .map(EnvFilter::new)
            .unwrap_or_else(|| "ping_probe=info,tower_http=warn".into())
    });

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match config.server.log_format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}

/// Lightweight healthcheck: GET the local ping route and exit 0 on 200, 1 otherwise.
/// Invoked via `ping-probe --healthcheck` from Docker HEALTHCHECK.
async fn healthcheck(config: &Config) -> anyhow::Result<()> {
    let url = format!("http://127.0.0.1:{}{}", config.server.port, config.server.path);
    let resp = reqwest::get(&url).await?;

    if resp.status().is_success() {
        std::process::exit(0);
    } else {
        std::process::exit(1);
    }
}

/// Background task: polls the config file every 5 seconds and hot-reloads the checks on change.
///
/// Uses filesystem `mtime` for change detection, no inotify/kqueue dependencies.
/// Parse failures are logged once per file change; the running checks are unchanged.
async fn config_watcher(state: Arc<AppState>) {
    let path = &state.config_path;

    let mut last_mtime = std::fs::metadata(path).and_then(|m| m.modified()).ok();

    // Initial tick fires immediately; skip it so we don't reload on startup.
    let mut interval = tokio::time::interval(Duration::from_secs(5));
    interval.tick().await;

    loop {
        interval.tick().await;

        match state.reload_if_changed(&mut last_mtime) {
            Reload::Unchanged => {}
            Reload::Applied { checks } => {
                info!(path = %path.display(), checks, "config hot-reloaded");
            }
            Reload::Rejected(e) => {
                warn!(path = %path.display(), error = %e, "config reload failed, keeping previous checks");
            }
        }
    }
}
