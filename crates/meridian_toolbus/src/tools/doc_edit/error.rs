use thiserror::Error;

/// Edit failures the model can act on; reported as tool output, not as errors.
#[derive(Debug, Error)]
pub enum DocEditError {
    #[error("document not found: {0}")]
    DocNotFound(String),

    #[error("old_str was not found in {0}")]
    NoMatch(String),

    #[error("old_str matches {count} places in {path}; include more context so it matches exactly once")]
    AmbiguousMatch { path: String, count: usize },

    #[error("insert_line {line} is out of range (document has {lines} lines)")]
    InvalidLine { line: usize, lines: usize },

    #[error("document already exists: {0}")]
    AlreadyExists(String),

    #[error("missing argument '{argument}' for command '{command}'")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },
}

impl DocEditError {
    pub fn code(&self) -> &'static str {
        match self {
            DocEditError::DocNotFound(_) => "DOC_NOT_FOUND",
            DocEditError::NoMatch(_) => "NO_MATCH",
            DocEditError::AmbiguousMatch { .. } => "AMBIGUOUS_MATCH",
            DocEditError::InvalidLine { .. } => "INVALID_LINE",
            DocEditError::AlreadyExists(_) => "ALREADY_EXISTS",
            DocEditError::MissingArgument { .. } => "MISSING_ARGUMENT",
        }
    }
}
