//! Runtime error types

use meridian_core::{CoreError, FailureReason};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    /// A prompt input (skill, chat, project) could not be read.
    #[error("composition failed: {0}")]
    Composition(String),

    /// Network failure reaching the provider, after retries.
    #[error("transport error: {0}")]
    Transport(String),

    /// Malformed provider output, e.g. unparseable tool-call arguments.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The provider rejected the request.
    #[error("provider error: {0}")]
    Provider(String),

    #[error("tool loop exhausted after {limit} rounds")]
    ToolLoopExhausted { limit: usize },

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("turn cancelled")]
    Cancelled,

    #[error("storage error: {0}")]
    Storage(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, RuntimeError>;

impl RuntimeError {
    /// Reason recorded on a turn that this error terminated.
    ///
    /// `None` for errors that never reach a running turn (authorization,
    /// validation) and for cancellation, which is its own terminal status.
    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self {
            RuntimeError::Composition(_) => Some(FailureReason::Composition),
            RuntimeError::Transport(_) => Some(FailureReason::Transport),
            RuntimeError::Protocol(_) => Some(FailureReason::Protocol),
            RuntimeError::Provider(_) => Some(FailureReason::Provider),
            RuntimeError::ToolLoopExhausted { .. } => Some(FailureReason::ToolLoopExhausted),
            RuntimeError::Storage(_) => Some(FailureReason::Storage),
            RuntimeError::Config(_) | RuntimeError::Other(_) => Some(FailureReason::Internal),
            RuntimeError::Forbidden(_)
            | RuntimeError::NotFound(_)
            | RuntimeError::InvalidRequest(_)
            | RuntimeError::Cancelled => None,
        }
    }
}

impl From<CoreError> for RuntimeError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound(what) => RuntimeError::NotFound(what),
            CoreError::InvalidTurn(message) => RuntimeError::InvalidRequest(message),
            CoreError::InvalidTransition { .. } => RuntimeError::Other(anyhow::anyhow!(err)),
            other => RuntimeError::Storage(other.to_string()),
        }
    }
}

impl From<meridian_llms::Error> for RuntimeError {
    fn from(err: meridian_llms::Error) -> Self {
        use meridian_llms::Error as LlmError;

        match err {
            LlmError::Transport(message) => RuntimeError::Transport(message),
            LlmError::Provider { .. } if err.is_retryable() => RuntimeError::Transport(err.to_string()),
            LlmError::Provider { .. } | LlmError::MissingApiKey(_) | LlmError::UnsupportedModel { .. } => {
                RuntimeError::Provider(err.to_string())
            }
            LlmError::InvalidResponse(_) | LlmError::Stream(_) | LlmError::InvalidToolArguments { .. } => {
                RuntimeError::Protocol(err.to_string())
            }
            LlmError::ProviderNotFound(name) => RuntimeError::InvalidRequest(format!("unknown provider '{name}'")),
            LlmError::InvalidRequest(message) => RuntimeError::InvalidRequest(message),
            LlmError::Capability(message) => RuntimeError::Config(message),
            LlmError::Other(message) => RuntimeError::Other(anyhow::anyhow!(message)),
        }
    }
}
