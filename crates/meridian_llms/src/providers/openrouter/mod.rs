//! OpenRouter provider module
//!
//! Implements the Provider trait against OpenRouter's OpenAI-compatible
//! chat completions API, which fronts many model vendors.
//! API docs: https://openrouter.ai/docs/api-reference/chat-completion

mod convert;
mod provider;
mod stream;
mod types;

pub use provider::OpenRouterProvider;
pub use types::{OpenRouterConfig, OpenRouterRequest, OpenRouterResponse};
