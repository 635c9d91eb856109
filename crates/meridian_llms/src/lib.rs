//! meridian_llms: provider-agnostic model calls with streaming support.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                  ProviderRegistry                    │
//! │  ┌──────────────────────────────────────────────┐   │
//! │  │  HashMap<String, Arc<dyn Provider>>           │   │
//! │  └──────────────────────────────────────────────┘   │
//! │                       │                              │
//! │          ┌────────────┼────────────┐                │
//! │          ▼            ▼            ▼                │
//! │   ┌───────────┐ ┌────────────┐ ┌──────────┐        │
//! │   │ Anthropic │ │ OpenRouter │ │  Lorem   │        │
//! │   │ Provider  │ │  Provider  │ │ Provider │        │
//! │   └───────────┘ └────────────┘ └──────────┘        │
//! └──────────────────────────────────────────────────────┘
//!
//!   CapabilityRegistry: static per-model metadata (YAML)
//!   open_stream: first-event retry over any Provider
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use meridian_llms::{LoremProvider, ProviderRegistry};
//!
//! let registry = ProviderRegistry::new().register("lorem", LoremProvider::new());
//! let provider = registry.get_provider("lorem").unwrap();
//! ```

pub mod accumulate;
pub mod capabilities;
pub mod error;
pub mod provider;
pub mod providers;
pub mod retry;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export core abstractions
pub use capabilities::{CapabilityRegistry, ModelCapabilities};
pub use error::{Error, Result};
pub use provider::{Provider, ProviderRegistry};
pub use retry::{RetryPolicy, open_stream};

// Re-export provider implementations
pub use providers::{AnthropicProvider, LoremProvider, OpenRouterProvider};

// Re-export commonly used types
pub use types::{
    ContentPart, FinishReason, FinishReasonKind, GenerateOptions, GenerateRequest,
    GenerateResponse, GenerateStream, Message, ReasoningLevel, Role, StreamEvent, Tool,
    ToolCall, ToolChoice, Usage,
};
