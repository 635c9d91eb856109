//! meridian observability: tracing subscriber setup shared by the engine and
//! the server binary.
//!
//! # Quick Start
//!
//! ```no_run
//! use meridian_observability::{ObservabilityConfig, init};
//!
//! let config = ObservabilityConfig::new("meridian")
//!     .with_otlp_endpoint("http://localhost:4317")
//!     .with_log_level("info");
//!
//! init(config)?;
//! tracing::info!("service started");
//! # Ok::<(), meridian_observability::ObservabilityError>(())
//! ```
//!
//! # Environment Variables
//!
//! - `OTEL_SERVICE_NAME` or `SERVICE_NAME` - Service name
//! - `OTEL_SERVICE_VERSION` or `SERVICE_VERSION` - Service version
//! - `OTEL_EXPORTER_OTLP_ENDPOINT` - OTLP endpoint
//! - `OTEL_LOG_LEVEL` or `RUST_LOG` - Log level filter
//! - `MERIDIAN_LOG_FORMAT` - `pretty` (default), `compact` or `json`

pub mod config;
pub mod error;
pub mod telemetry;
pub mod tracing;

pub use config::{LogFormat, ObservabilityConfig};
pub use error::ObservabilityError;
pub use telemetry::{init, shutdown};
pub use tracing::{record_duration, record_error};

// Span macros are exported at the crate root via #[macro_export]:
// meridian_observability::turn_span!(), http_request_span!(), storage_span!()
