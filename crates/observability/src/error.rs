use thiserror::Error;

#[derive(Error, Debug)]
pub enum ObservabilityError {
    /// The OTLP exporter could not be built.
    #[error("failed to initialize OTLP export: {0}")]
    Exporter(String),

    /// A global subscriber was already installed.
    #[error("tracing subscriber already initialized: {0}")]
    AlreadyInitialized(String),

    #[error("invalid observability configuration: {0}")]
    Config(String),
}
