//! Error types for provider calls

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by providers, the registry and capability loading
#[derive(Error, Debug)]
pub enum Error {
    /// No provider registered under this ID
    #[error("provider not found: {0}")]
    ProviderNotFound(String),

    /// Provider credentials missing
    #[error("missing API key for provider: {0}")]
    MissingApiKey(String),

    /// Network failure before any response byte (connect, timeout, reset)
    #[error("transport error: {0}")]
    Transport(String),

    /// Provider answered with an error status or an in-stream error event
    #[error("provider error{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    Provider {
        status: Option<u16>,
        message: String,
    },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Provider response could not be interpreted
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Malformed or interrupted event stream
    #[error("stream error: {0}")]
    Stream(String),

    /// Streamed tool-call arguments did not assemble into valid JSON
    #[error("invalid arguments for tool call {name} ({id}): {message}")]
    InvalidToolArguments {
        id: String,
        name: String,
        message: String,
    },

    #[error("model {model} is not supported by provider {provider}")]
    UnsupportedModel { provider: String, model: String },

    /// Capability registry load or lookup failure
    #[error("capability error: {0}")]
    Capability(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn provider_error(message: impl Into<String>) -> Self {
        Error::Provider {
            status: None,
            message: message.into(),
        }
    }

    /// Provider error carrying the HTTP status it was returned with.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        Error::Provider {
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn stream_error(message: impl Into<String>) -> Self {
        Error::Stream(message.into())
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Error::InvalidResponse(message.into())
    }

    /// Whether a fresh connection attempt may succeed.
    ///
    /// Only transport failures, rate limiting and server-side errors qualify;
    /// auth and validation failures never do.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport(_) => true,
            Error::Provider {
                status: Some(status),
                ..
            } => *status == 429 || (500..=599).contains(status),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            Error::from_status(status.as_u16(), err.to_string())
        } else if err.is_timeout() || err.is_connect() || err.is_request() {
            Error::Transport(err.to_string())
        } else if err.is_decode() {
            Error::InvalidResponse(err.to_string())
        } else {
            Error::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidResponse(err.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Capability(err.to_string())
    }
}
