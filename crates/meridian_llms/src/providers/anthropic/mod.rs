//! Anthropic provider module
//!
//! Implements the Provider trait for the Claude Messages API, including
//! extended thinking with signed reasoning blocks.
//! API docs: https://docs.anthropic.com/en/api/messages

mod convert;
mod provider;
mod stream;
mod types;

pub use provider::AnthropicProvider;
pub use types::{AnthropicConfig, AnthropicRequest, AnthropicResponse};
