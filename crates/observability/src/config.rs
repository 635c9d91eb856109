//! Observability configuration

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ObservabilityError;

const DEFAULT_SERVICE_NAME: &str = "meridian";

/// Console line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    /// One JSON object per line, for log shippers.
    Json,
}

impl FromStr for LogFormat {
    type Err = ObservabilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "full" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(ObservabilityError::Config(format!(
                "unknown log format '{other}' (expected pretty, compact or json)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    pub service_name: String,

    pub service_version: Option<String>,

    /// OTLP/gRPC endpoint, e.g. "http://localhost:4317". Export is off when unset.
    pub otlp_endpoint: Option<String>,

    /// Write log lines to stderr in addition to any OTLP export.
    pub enable_console: bool,

    #[serde(default)]
    pub log_format: LogFormat,

    /// `EnvFilter` directive; falls back to `RUST_LOG`, then "info".
    pub log_level: Option<String>,

    #[serde(default)]
    pub resource_attributes: Vec<(String, String)>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            service_version: None,
            otlp_endpoint: None,
            enable_console: true,
            log_format: LogFormat::default(),
            log_level: None,
            resource_attributes: Vec::new(),
        }
    }
}

impl ObservabilityConfig {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Default::default()
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.service_version = Some(version.into());
        self
    }

    pub fn with_otlp_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.otlp_endpoint = Some(endpoint.into());
        self
    }

    pub fn with_console(mut self, enable: bool) -> Self {
        self.enable_console = enable;
        self
    }

    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }

    pub fn with_resource_attribute(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.resource_attributes.push((key.into(), value.into()));
        self
    }

    /// Build from environment variables
    ///
    /// Reads:
    /// - `OTEL_SERVICE_NAME` or `SERVICE_NAME` → service_name
    /// - `OTEL_SERVICE_VERSION` or `SERVICE_VERSION` → service_version
    /// - `OTEL_EXPORTER_OTLP_ENDPOINT` → otlp_endpoint
    /// - `OTEL_LOG_LEVEL` or `RUST_LOG` → log_level
    /// - `MERIDIAN_LOG_FORMAT` → log_format (unknown values keep the default)
    pub fn from_env() -> Self {
        let service_name = std::env::var("OTEL_SERVICE_NAME")
            .or_else(|_| std::env::var("SERVICE_NAME"))
            .unwrap_or_else(|_| DEFAULT_SERVICE_NAME.to_string());

        let service_version = std::env::var("OTEL_SERVICE_VERSION")
            .or_else(|_| std::env::var("SERVICE_VERSION"))
            .ok();

        let otlp_endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok();

        let log_level = std::env::var("OTEL_LOG_LEVEL")
            .or_else(|_| std::env::var("RUST_LOG"))
            .ok();

        let log_format = std::env::var("MERIDIAN_LOG_FORMAT")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or_default();

        Self {
            service_name,
            service_version,
            otlp_endpoint,
            enable_console: true,
            log_format,
            log_level,
            resource_attributes: Vec::new(),
        }
    }
}
