//! Configuration types for asg-dns-sd.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ReactorError, Result};
use crate::naming::HostnameStrategy;
use crate::planner::DEFAULT_TTL;

/// Prefix of environment variable overrides (`ASG_DNS_SD__REACTOR__TTL=30`).
pub const ENV_PREFIX: &str = "ASG_DNS_SD";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Reconciliation settings.
    #[serde(default)]
    pub reactor: ReactorConfig,

    /// Telemetry configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl Config {
    /// Load from an optional TOML file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| ReactorError::Config(e.to_string()))
    }
}

/// Reconciliation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactorConfig {
    /// TTL for upserted SRV records in seconds.
    #[serde(default = "default_ttl")]
    pub ttl: u32,

    /// How instance host names are derived.
    #[serde(default)]
    pub hostname: HostnameStrategy,
}

impl Default for ReactorConfig {
    fn default() -> Self {
        Self {
            ttl: default_ttl(),
            hostname: HostnameStrategy::default(),
        }
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level filter (e.g., "info", "debug", "asg_dns_sd=debug,warn").
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// OpenTelemetry configuration.
    #[serde(default)]
    pub opentelemetry: Option<OpenTelemetryConfig>,
}

/// OpenTelemetry exporter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenTelemetryConfig {
    /// OTLP endpoint (e.g., "http://localhost:4317").
    pub endpoint: String,

    /// Service name for traces.
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            opentelemetry: None,
        }
    }
}

fn default_ttl() -> u32 {
    DEFAULT_TTL
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "asg-dns-sd".to_string()
}
