//! Configuration management for the benchmark target
//!
//! Sources, lowest to highest precedence:
//! 1. Hardcoded defaults
//! 2. Config file given by `--config` / `BENCH_TARGET_CONFIG`
//! 3. Environment variables (`BENCH_TARGET_GATE__SIMULATED_WORKERS=8`)
//! 4. Command-line flags

use axum::http::HeaderName;
use clap::{Parser, ValueEnum};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "BENCH_TARGET";

/// Paths served by built-in handlers; the latency route must not shadow them.
const RESERVED_ROUTES: [&str; 4] = ["/healthz", "/environment", "/cpu", "/metrics"];

/// Command-line flags.
#[derive(Parser, Debug, Default)]
#[command(name = "http-bench-target")]
#[command(about = "Synthetic HTTP benchmark target", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(long, env = "BENCH_TARGET_CONFIG")]
    pub config: Option<PathBuf>,

    /// Simulated number of http workers to artificially queue requests. 0 disables.
    #[arg(long)]
    pub simulated_workers: Option<u32>,

    /// File of whitespace-separated latencies in ms, replayed via the latency route
    #[arg(long)]
    pub latency_filename: Option<PathBuf>,

    /// Address to listen on
    #[arg(long)]
    pub bind_address: Option<String>,

    /// Log level: trace, debug, info, warn, error
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log output format
    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,
}

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct BenchTargetConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub gate: GateConfig,

    #[serde(default)]
    pub latency: LatencyConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BenchTargetConfig {
    /// Load configuration from every source and validate it.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        Self::load_with(
            cli,
            Some(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            ),
        )
    }

    fn load_with(cli: &Cli, environment: Option<Environment>) -> Result<Self, ConfigError> {
        let mut builder = Self::set_defaults(Config::builder())?;

        if let Some(path) = &cli.config {
            builder = builder.add_source(File::from(path.as_path()).required(true));
        }

        if let Some(environment) = environment {
            builder = builder.add_source(environment);
        }

        builder = builder
            .set_override_option(
                "gate.simulated_workers",
                cli.simulated_workers.map(i64::from),
            )?
            .set_override_option(
                "latency.filename",
                cli.latency_filename
                    .as_ref()
                    .map(|path| path.display().to_string()),
            )?
            .set_override_option("server.bind_address", cli.bind_address.clone())?
            .set_override_option("logging.level", cli.log_level.clone())?
            .set_override_option(
                "logging.format",
                cli.log_format.map(|format| format.as_str().to_string()),
            )?;

        let config: BenchTargetConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    fn set_defaults(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        builder
            .set_default("server.bind_address", default_bind_address())?
            .set_default("server.shutdown_timeout_secs", 5)?
            .set_default("gate.simulated_workers", 0)?
            .set_default("latency.route", default_latency_route())?
            .set_default("latency.header", default_latency_header())?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "text")
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.socket_addr()?;

        if !self.latency.route.starts_with('/') {
            return Err(ConfigError::Message(format!(
                "latency.route must start with '/', got '{}'",
                self.latency.route
            )));
        }

        // Only literal paths: wildcards and captures are route syntax to axum.
        if self.latency.route.contains(['*', ':', '{', '}'])
            || self.latency.route.contains("//")
        {
            return Err(ConfigError::Message(format!(
                "latency.route '{}' must be a literal path without wildcards, captures or empty segments",
                self.latency.route
            )));
        }

        if RESERVED_ROUTES.contains(&self.latency.route.as_str()) {
            return Err(ConfigError::Message(format!(
                "latency.route '{}' collides with a built-in endpoint",
                self.latency.route
            )));
        }

        if HeaderName::from_bytes(self.latency.header.as_bytes()).is_err() {
            return Err(ConfigError::Message(format!(
                "latency.header '{}' is not a valid HTTP header name",
                self.latency.header
            )));
        }

        Ok(())
    }
}

/// Listener settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub bind_address: String,

    /// Seconds in-flight requests get to finish after a shutdown signal
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            shutdown_timeout_secs: 5,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind_address.parse().map_err(|e| {
            ConfigError::Message(format!(
                "invalid server.bind_address '{}': {}",
                self.bind_address, e
            ))
        })
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

/// Admission gate settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct GateConfig {
    /// Concurrent requests allowed past the gate; 0 disables queueing
    pub simulated_workers: usize,
}

/// Latency injection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LatencyConfig {
    /// Latency file; the latency route is only mounted when set
    #[serde(default)]
    pub filename: Option<PathBuf>,

    pub route: String,

    /// Response header reporting the selected delay
    pub header: String,
}

impl Default for LatencyConfig {
    fn default() -> Self {
        Self {
            filename: None,
            route: default_latency_route(),
            header: default_latency_header(),
        }
    }
}

/// Metrics exposition settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct MetricsConfig {
    /// Constant labels attached to the queue-wait histogram
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,

    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0:9090".to_string()
}

fn default_latency_route() -> String {
    "/latency".to_string()
}

fn default_latency_header() -> String {
    "selected-latency".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_configuration() {
        let config = BenchTargetConfig::load_with(&Cli::default(), None).unwrap();

        assert_eq!(config.server.bind_address, "0.0.0.0:9090");
        assert_eq!(config.server.shutdown_timeout().as_secs(), 5);
        assert_eq!(config.gate.simulated_workers, 0);
        assert!(config.latency.filename.is_none());
        assert_eq!(config.latency.route, "/latency");
        assert_eq!(config.latency.header, "selected-latency");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Text);
        assert!(config.metrics.labels.is_empty());
    }

    #[test]
    fn test_cli_flags_parse() {
        let cli = Cli::try_parse_from([
            "http-bench-target",
            "--simulated-workers",
            "4",
            "--latency-filename",
            "/tmp/latencies.txt",
            "--log-format",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.simulated_workers, Some(4));
        assert_eq!(cli.latency_filename, Some(PathBuf::from("/tmp/latencies.txt")));
        assert_eq!(cli.log_format, Some(LogFormat::Json));
    }

    #[test]
    fn test_cli_overrides_defaults() {
        let cli = Cli {
            simulated_workers: Some(8),
            latency_filename: Some(PathBuf::from("/data/latency.txt")),
            bind_address: Some("127.0.0.1:8080".to_string()),
            log_format: Some(LogFormat::Json),
            ..Default::default()
        };

        let config = BenchTargetConfig::load_with(&cli, None).unwrap();
        assert_eq!(config.gate.simulated_workers, 8);
        assert_eq!(
            config.latency.filename,
            Some(PathBuf::from("/data/latency.txt"))
        );
        assert_eq!(config.server.bind_address, "127.0.0.1:8080");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_file_source_with_cli_precedence() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
[gate]
simulated_workers = 3

[latency]
route = "/slow"
header = "x-injected-latency"

[metrics.labels]
deployment = "canary"
"#
        )
        .unwrap();

        let cli = Cli {
            config: Some(file.path().to_path_buf()),
            simulated_workers: Some(5),
            ..Default::default()
        };

        let config = BenchTargetConfig::load_with(&cli, None).unwrap();
        assert_eq!(config.gate.simulated_workers, 5);
        assert_eq!(config.latency.route, "/slow");
        assert_eq!(config.latency.header, "x-injected-latency");
        assert_eq!(config.metrics.labels["deployment"], "canary");
    }

    #[test]
    fn test_missing_config_file_fails() {
        let cli = Cli {
            config: Some(PathBuf::from("/nonexistent/bench-target.toml")),
            ..Default::default()
        };
        assert!(BenchTargetConfig::load_with(&cli, None).is_err());
    }

    #[test]
    fn test_validation_errors() {
        let mut config = BenchTargetConfig::default();
        assert!(config.validate().is_ok());

        config.server.bind_address = ":9090".to_string();
        assert!(config.validate().is_err());
        config.server.bind_address = "0.0.0.0:9090".to_string();

        config.latency.route = "latency".to_string();
        assert!(config.validate().is_err());
        config.latency.route = "/metrics".to_string();
        assert!(config.validate().is_err());
        for route in [
            "/latency/*",
            "/latency/*rest",
            "/latency/:id",
            "/latency/{id}",
            "/latency//",
        ] {
            config.latency.route = route.to_string();
            assert!(config.validate().is_err(), "{route} should be rejected");
        }
        config.latency.route = "/slow/path".to_string();
        assert!(config.validate().is_ok());
        config.latency.route = "/latency".to_string();

        config.latency.header = "bad header".to_string();
        assert!(config.validate().is_err());
    }
}
