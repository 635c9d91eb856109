//! Provider trait and registry

mod trait_def;

pub use trait_def::Provider;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::providers::{AnthropicProvider, LoremProvider, OpenRouterProvider};

/// Registry of provider implementations, keyed by provider ID.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn Provider>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every provider whose credentials are present in the
    /// environment, plus the key-less `lorem` provider.
    pub fn from_env() -> Self {
        let mut registry = Self::new().register("lorem", LoremProvider::new());

        match AnthropicProvider::from_env() {
            Ok(provider) => registry = registry.register("anthropic", provider),
            Err(e) => debug!(provider = "anthropic", error = %e, "provider not registered"),
        }
        match OpenRouterProvider::from_env() {
            Ok(provider) => registry = registry.register("openrouter", provider),
            Err(e) => debug!(provider = "openrouter", error = %e, "provider not registered"),
        }

        info!(providers = ?registry.list_providers(), "provider registry ready");
        registry
    }

    /// Register a provider under the given ID. Returns `self` for chaining.
    pub fn register<P: Provider + 'static>(self, id: impl Into<String>, provider: P) -> Self {
        self.register_arc(id, Arc::new(provider))
    }

    /// Register an already shared provider. Returns `self` for chaining.
    pub fn register_arc(mut self, id: impl Into<String>, provider: Arc<dyn Provider>) -> Self {
        self.providers.insert(id.into(), provider);
        self
    }

    /// Look up a provider by ID.
    pub fn get_provider(&self, id: &str) -> Result<Arc<dyn Provider>> {
        self.providers
            .get(id)
            .cloned()
            .ok_or_else(|| Error::ProviderNotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.providers.contains_key(id)
    }

    /// List all registered provider IDs, sorted.
    pub fn list_providers(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.providers.keys().cloned().collect();
        ids.sort();
        ids
    }
}
