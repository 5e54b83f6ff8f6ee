//! eventwire CLI configuration
//!
//! Layered with figment: defaults, then an optional TOML file, then the
//! command-line flags that were actually given. Durations are written in
//! milliseconds.

use std::path::Path;
use std::time::Duration;

use anyhow::ensure;
use figment::providers::{Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use url::Url;

use eventwire_client::{event_url, SessionConfig, SourceConfig};
use eventwire_core::ServiceContext;

use crate::cli::Cli;
use crate::error::{CliError, Result};

// ----------------------------------------------------------------------------
// Configuration Sections
// ----------------------------------------------------------------------------

/// Complete configuration for the client binary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Target `host:port`
    pub address: String,

    /// Telemetry project; empty disables reporting
    pub project: String,

    pub connection: ConnectionConfig,
    pub sources: SourcesConfig,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// `ws` or `wss`
    pub scheme: String,
    /// Resource path of the event stream
    pub path: String,
    /// Bound on waiting for the peer to acknowledge a close
    pub close_timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub heartbeat_interval_ms: u64,
    pub burst_interval_ms: u64,
    /// Burst ticks send a null event, which aborts the process
    pub fault_injection: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub service: String,
    pub version: String,
}

// ----------------------------------------------------------------------------
// Default Implementations
// ----------------------------------------------------------------------------

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            address: "localhost:8080".to_string(),
            project: String::new(),
            connection: ConnectionConfig::default(),
            sources: SourcesConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            scheme: "ws".to_string(),
            path: "/event".to_string(),
            close_timeout_ms: 1_000,
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: 5_000,
            burst_interval_ms: 30_000,
            fault_injection: true,
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service: "ws".to_string(),
            version: "v1.0".to_string(),
        }
    }
}

// ----------------------------------------------------------------------------
// Loading and Validation
// ----------------------------------------------------------------------------

impl AppConfig {
    /// Load configuration from a TOML file; missing keys keep their defaults
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::extract(Self::base(Some(path.as_ref()))?)
    }

    /// Resolve the effective configuration for a parsed command line
    ///
    /// Priority: flags given on the command line > config file > defaults.
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let mut figment = Self::base(cli.config.as_deref().map(Path::new))?;

        if let Some(addr) = &cli.addr {
            figment = figment.merge(("address", addr.as_str()));
        }
        if let Some(project) = &cli.project {
            figment = figment.merge(("project", project.as_str()));
        }

        Self::extract(figment)
    }

    /// Defaults overlaid by the file at `path`, which must exist when given
    fn base(path: Option<&Path>) -> Result<Figment> {
        let figment = Figment::new().merge(Serialized::defaults(Self::default()));
        match path {
            Some(path) => {
                if !path.is_file() {
                    return Err(CliError::Config(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                Ok(figment.merge(Toml::file(path)))
            }
            None => Ok(figment),
        }
    }

    fn extract(figment: Figment) -> Result<Self> {
        let config: AppConfig = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            matches!(self.connection.scheme.as_str(), "ws" | "wss"),
            "scheme must be ws or wss, got {:?}",
            self.connection.scheme
        );
        ensure!(
            self.connection.path.starts_with('/'),
            "path must start with '/', got {:?}",
            self.connection.path
        );
        ensure!(self.connection.close_timeout_ms > 0, "close_timeout_ms must be positive");
        ensure!(self.sources.heartbeat_interval_ms > 0, "heartbeat_interval_ms must be positive");
        ensure!(self.sources.burst_interval_ms > 0, "burst_interval_ms must be positive");
        Ok(())
    }

    pub fn url(&self) -> Result<Url> {
        Ok(event_url(
            &self.connection.scheme,
            &self.address,
            &self.connection.path,
        )?)
    }

    pub fn session(&self) -> SessionConfig {
        SessionConfig {
            close_timeout: Duration::from_millis(self.connection.close_timeout_ms),
        }
    }

    pub fn sources(&self) -> SourceConfig {
        SourceConfig {
            heartbeat_interval: Duration::from_millis(self.sources.heartbeat_interval_ms),
            burst_interval: Duration::from_millis(self.sources.burst_interval_ms),
            fault_injection: self.sources.fault_injection,
        }
    }

    pub fn service_context(&self) -> ServiceContext {
        ServiceContext {
            project: self.project.clone(),
            service: self.telemetry.service.clone(),
            version: self.telemetry.version.clone(),
        }
    }
}
