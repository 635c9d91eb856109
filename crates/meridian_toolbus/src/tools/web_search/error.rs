use thiserror::Error;

#[derive(Debug, Error)]
pub enum WebSearchError {
    #[error("Tavily API key not set. Set TAVILY_API_KEY environment variable.")]
    MissingApiKey,

    #[error("Search query cannot be empty")]
    EmptyQuery,

    #[error("Search request failed: {0}")]
    RequestFailed(String),

    #[error("Search API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Invalid search response: {0}")]
    InvalidResponse(String),
}
