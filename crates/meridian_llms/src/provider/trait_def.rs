//! The Provider trait

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{GenerateRequest, GenerateResponse, GenerateStream, Headers};

/// A model provider behind the unified request/response/stream contract.
///
/// Implementations translate `GenerateRequest` into their wire format and
/// normalize responses and stream chunks back into unified types. Streams
/// must surface complete tool calls only as `ToolCallEnd` with parsed
/// arguments, and end with exactly one `Finish` on success.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable identifier, e.g. "anthropic".
    fn provider_id(&self) -> &str;

    /// Headers for a request; `custom_headers` override the defaults.
    fn build_headers(&self, custom_headers: Option<&Headers>) -> Headers {
        custom_headers.cloned().unwrap_or_default()
    }

    fn supports_model(&self, _model: &str) -> bool {
        true
    }

    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse>;

    async fn stream(&self, request: GenerateRequest) -> Result<GenerateStream>;

    async fn list_models(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}
