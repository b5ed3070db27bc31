use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Top-level service configuration.
///
/// ```toml
/// [server]
/// port = 8080
/// path = "/ping"
///
/// [[checks]]
/// kind    = "tcp"
/// address = "db:5432"
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    /// Checks run in order by every ping. Empty = always healthy.
    #[serde(default)]
    pub checks: Vec<CheckConfig>,
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let config: Self = toml::from_str(&content).context("parsing config TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`Config::load`], but a file that does not exist yields the
    /// default configuration.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.path.starts_with('/'),
            "[server] path `{}` must start with `/`",
            self.server.path
        );
        anyhow::ensure!(
            self.server.request_timeout_ms != Some(0),
            "[server] request_timeout_ms must be greater than zero"
        );

        for (i, check) in self.checks.iter().enumerate() {
            match check {
                CheckConfig::Tcp { address, timeout_ms } => {
                    anyhow::ensure!(!address.trim().is_empty(), "check #{i}: tcp address is empty");
                    anyhow::ensure!(*timeout_ms > 0, "check #{i}: tcp timeout_ms must be greater than zero");
                }
                CheckConfig::Path { path } | CheckConfig::File { path } => {
                    anyhow::ensure!(!path.as_os_str().is_empty(), "check #{i}: path is empty");
                }
                CheckConfig::Env { var } => {
                    anyhow::ensure!(!var.is_empty(), "check #{i}: env var name is empty");
                }
            }
        }

        Ok(())
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Listen port (default: 8080).
    #[serde(default = "defaults::port")]
    pub port: u16,

    /// Route the ping is served on (default: `/ping`).
    #[serde(default = "defaults::path")]
    pub path: String,

    /// Give up on a probe after this many milliseconds and answer 503.
    ///
    /// Unset: wait for the probe however long it takes.
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,

    /// Log level override (also controlled by `RUST_LOG` env var).
    #[serde(default)]
    pub log_level: Option<String>,

    #[serde(default)]
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: defaults::port(),
            path: defaults::path(),
            request_timeout_ms: None,
            log_level: None,
            log_format: LogFormat::default(),
        }
    }
}

/// Output format of the process log.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// One health check, selected by its `kind` key.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckConfig {
    /// A TCP connection to `address` (`host:port`) must succeed.
    ///
    /// Failure means a dependency is down: answered with 503.
    Tcp {
        address: String,
        #[serde(default = "defaults::tcp_timeout_ms")]
        timeout_ms: u64,
    },

    /// A file or directory must exist.
    Path { path: PathBuf },

    /// Deprecated spelling of [`CheckConfig::Path`].
    File { path: PathBuf },

    /// An environment variable must be set and non-empty.
    Env { var: String },
}

impl CheckConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Tcp { .. } => "tcp",
            Self::Path { .. } => "path",
            Self::File { .. } => "file",
            Self::Env { .. } => "env",
        }
    }
}

mod defaults {
    pub fn port() -> u16 { 8080 }
    pub fn path() -> String { "/ping".into() }
    pub fn tcp_timeout_ms() -> u64 { 1_000 }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn parse(toml_src: &str) -> Config {
        toml::from_str(toml_src).expect("config should parse")
    }

    // -----------------------------------------------------------------------
    // Parsing & defaults
    // -----------------------------------------------------------------------

    #[test]
    fn parse_example_config() {
        let content = include_str!("../config.example.toml");
        let config: Config = toml::from_str(content).expect("example config should parse");
        config.validate().expect("example config should be valid");
        assert_eq!(config.checks.len(), 3);
    }

    #[test]
    fn empty_file_is_always_healthy_on_default_route() {
        let config = parse("");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.path, "/ping");
        assert_eq!(config.server.request_timeout_ms, None);
        assert_eq!(config.server.log_format, LogFormat::Text);
        assert!(config.checks.is_empty());
        config.validate().expect("defaults should be valid");
    }

    #[test]
    fn parses_every_check_kind() {
        let config = parse(
            r#"
            [server]
            port = 9000
            path = "/healthz"
            request_timeout_ms = 2500
            log_format = "json"

            [[checks]]
            kind    = "tcp"
            address = "db:5432"

            [[checks]]
            kind       = "tcp"
            address    = "cache:6379"
            timeout_ms = 250

            [[checks]]
            kind = "path"
            path = "/var/run/app.ready"

            [[checks]]
            kind = "file"
            path = "/var/run/legacy.ready"

            [[checks]]
            kind = "env"
            var  = "DATABASE_URL"
            "#,
        );
        config.validate().expect("should be valid");

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.request_timeout_ms, Some(2500));
        assert_eq!(config.server.log_format, LogFormat::Json);
        assert_eq!(
            config.checks,
            vec![
                CheckConfig::Tcp { address: "db:5432".into(), timeout_ms: 1_000 },
                CheckConfig::Tcp { address: "cache:6379".into(), timeout_ms: 250 },
                CheckConfig::Path { path: "/var/run/app.ready".into() },
                CheckConfig::File { path: "/var/run/legacy.ready".into() },
                CheckConfig::Env { var: "DATABASE_URL".into() },
            ]
        );
    }

    #[test]
    fn unknown_check_kind_fails_to_parse() {
        let result: Result<Config, _> = toml::from_str(
            r#"
            [[checks]]
            kind = "dns"
            "#,
        );
        assert!(result.is_err());
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    #[test]
    fn validation_rejects_relative_route() {
        let mut config = Config::default();
        config.server.path = "ping".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validation_rejects_zero_request_timeout() {
        let mut config = Config::default();
        config.server.request_timeout_ms = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn validation_rejects_empty_check_fields() {
        for check in [
            CheckConfig::Tcp { address: " ".into(), timeout_ms: 10 },
            CheckConfig::Tcp { address: "db:5432".into(), timeout_ms: 0 },
            CheckConfig::Path { path: PathBuf::new() },
            CheckConfig::Env { var: String::new() },
        ] {
            let config = Config { checks: vec![check.clone()], ..Config::default() };
            assert!(config.validate().is_err(), "{check:?} should be rejected");
        }
    }

    // -----------------------------------------------------------------------
    // Loading
    // -----------------------------------------------------------------------

    #[test]
    fn missing_file_falls_back_to_defaults_only_when_asked() {
        let path = Path::new("/nonexistent/ping-probe/config.toml");
        assert!(Config::load(path).is_err());
        let config = Config::load_or_default(path).expect("default config");
        assert!(config.checks.is_empty());
    }

    #[test]
    fn load_reads_and_validates_a_file() {
        let path = std::env::temp_dir().join(format!("ping-probe-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "[server]\npath = \"no-slash\"\n").unwrap();
        assert!(Config::load(&path).is_err());

        std::fs::write(&path, "[server]\nport = 7000\n").unwrap();
        assert_eq!(Config::load(&path).unwrap().server.port, 7000);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn check_kind_names_match_config_tags() {
        assert_eq!(CheckConfig::Env { var: "X".into() }.kind(), "env");
        assert_eq!(CheckConfig::File { path: "/x".into() }.kind(), "file");
    }
}
