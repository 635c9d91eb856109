pub mod anthropic;
pub mod lorem;
pub mod openrouter;

pub use anthropic::AnthropicProvider;
pub use lorem::LoremProvider;
pub use openrouter::OpenRouterProvider;
