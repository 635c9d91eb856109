use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// How well a model handles function calling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallQuality {
    Excellent,
    #[default]
    Good,
    Basic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageGeneration {
    #[default]
    None,
    Standard,
    Hd,
}

/// Per-million-token prices that apply up to `threshold` prompt tokens.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PricingTier {
    /// `None` means unbounded
    #[serde(default)]
    pub threshold: Option<u64>,
    /// modality -> USD per million input tokens
    #[serde(default)]
    pub input_price: BTreeMap<String, f64>,
    /// modality -> USD per million output tokens
    #[serde(default)]
    pub output_price: BTreeMap<String, f64>,
}

impl PricingTier {
    pub fn applies_to(&self, input_tokens: u64) -> bool {
        self.threshold.is_none_or(|t| input_tokens <= t)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelCapabilities {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub supports_tools: bool,
    #[serde(default)]
    pub supports_thinking: bool,
    #[serde(default)]
    pub supports_vision: bool,
    /// Thinking cannot be disabled for this model
    #[serde(default)]
    pub requires_thinking: bool,

    #[serde(default)]
    pub tool_call_quality: ToolCallQuality,
    #[serde(default)]
    pub image_generation: ImageGeneration,

    pub context_window: u64,
    pub max_output: u32,

    #[serde(default)]
    pub pricing_tiers: Vec<PricingTier>,
}

impl ModelCapabilities {
    /// First tier covering a prompt of `input_tokens`, else the last tier.
    pub fn price_for(&self, input_tokens: u64) -> Option<&PricingTier> {
        self.pricing_tiers
            .iter()
            .find(|tier| tier.applies_to(input_tokens))
            .or_else(|| self.pricing_tiers.last())
    }

    /// Estimated USD cost of a text exchange.
    pub fn estimate_cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        let Some(tier) = self.price_for(input_tokens) else {
            return 0.0;
        };
        let input = tier.input_price.get("text").copied().unwrap_or(0.0);
        let output = tier.output_price.get("text").copied().unwrap_or(0.0);
        (input_tokens as f64 * input + output_tokens as f64 * output) / 1_000_000.0
    }

    /// Fraction of the context window used by `tokens`.
    pub fn context_usage(&self, tokens: u64) -> f64 {
        if self.context_window == 0 {
            return 0.0;
        }
        tokens as f64 / self.context_window as f64
    }
}

/// One provider's capability document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderCapabilities {
    pub provider: String,
    #[serde(default)]
    pub version: String,
    /// Ordered as listed in the source document
    pub models: Vec<ModelCapabilities>,
}
