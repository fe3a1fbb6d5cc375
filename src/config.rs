//! Configuration management for Tollgate.
//!
//! Values come from built-in defaults, then an optional YAML file, then
//! `TOLLGATE__<SECTION>__<KEY>` environment variables, e.g.
//! `TOLLGATE__RATE_LIMITING__POLICIES__STRICT__POINTS=10`.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::error::{Result, TollgateError};
use crate::ratelimit::{PolicySet, RouteRule, RouteTable};

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "TOLLGATE";

/// Main configuration for the Tollgate service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TollgateConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limiting: RateLimitingConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// gRPC server address
    #[serde(default = "default_grpc_addr")]
    pub grpc_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            grpc_addr: default_grpc_addr(),
        }
    }
}

fn default_grpc_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8081))
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    /// Limits for the strict and general policies
    #[serde(default)]
    pub policies: PolicySet,

    /// How often expired records are purged, in seconds. 0 disables purging.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Ordered route rules
    #[serde(default = "default_routes")]
    pub routes: Vec<RouteRule>,
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            policies: PolicySet::default(),
            sweep_interval_secs: default_sweep_interval(),
            routes: default_routes(),
        }
    }
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_routes() -> Vec<RouteRule> {
    RouteTable::default().rules().to_vec()
}

impl RateLimitingConfig {
    /// Sweep interval, or `None` when purging is disabled.
    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_secs > 0).then(|| Duration::from_secs(self.sweep_interval_secs))
    }

    pub fn route_table(&self) -> Result<RouteTable> {
        RouteTable::new(self.routes.clone())
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TollgateConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: TollgateConfig = serde_yaml::from_str(yaml)
            .map_err(|e| TollgateError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Layer an optional YAML file and environment overrides over the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = ::config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(
                ::config::File::from(path)
                    .format(::config::FileFormat::Yaml)
                    .required(true),
            );
        }

        let config: TollgateConfig = builder
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Check the settings that serde cannot.
    pub fn validate(&self) -> Result<()> {
        self.rate_limiting.policies.validate()?;
        self.rate_limiting.route_table()?;
        Ok(())
    }
}
