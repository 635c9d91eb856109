//! Static per-model capability metadata.
//!
//! Loaded once from YAML documents (embedded defaults or a directory) and
//! read-only afterwards, so it can be shared as `Arc<CapabilityRegistry>`
//! without locking.

mod types;

pub use types::{ImageGeneration, ModelCapabilities, PricingTier, ProviderCapabilities, ToolCallQuality};

use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};

const ANTHROPIC_YAML: &str = include_str!("config/anthropic.yaml");
const OPENROUTER_YAML: &str = include_str!("config/openrouter.yaml");
const LOREM_YAML: &str = include_str!("config/lorem.yaml");

#[derive(Debug, Clone, Default)]
pub struct CapabilityRegistry {
    providers: HashMap<String, ProviderCapabilities>,
}

impl CapabilityRegistry {
    /// Registry built from the capability documents compiled into the crate.
    pub fn load_builtin() -> Result<Self> {
        Self::from_yaml_documents(&[ANTHROPIC_YAML, OPENROUTER_YAML, LOREM_YAML])
    }

    pub fn from_yaml_documents(documents: &[&str]) -> Result<Self> {
        let mut registry = Self::default();
        for doc in documents {
            registry.insert(serde_yaml::from_str(doc)?)?;
        }
        Ok(registry)
    }

    /// Loads every `*.yaml` / `*.yml` file in `dir`.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let entries = std::fs::read_dir(dir)
            .map_err(|e| Error::Capability(format!("read {}: {e}", dir.display())))?;
        let mut paths: Vec<_> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext == "yaml" || ext == "yml")
            })
            .collect();
        paths.sort();

        let mut registry = Self::default();
        for path in paths {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| Error::Capability(format!("read {}: {e}", path.display())))?;
            let doc: ProviderCapabilities = serde_yaml::from_str(&text)
                .map_err(|e| Error::Capability(format!("parse {}: {e}", path.display())))?;
            registry.insert(doc)?;
        }
        Ok(registry)
    }

    fn insert(&mut self, doc: ProviderCapabilities) -> Result<()> {
        if self.providers.contains_key(&doc.provider) {
            return Err(Error::Capability(format!(
                "duplicate capability document for provider {}",
                doc.provider
            )));
        }
        debug!(provider = %doc.provider, version = %doc.version, models = doc.models.len(), "loaded capabilities");
        self.providers.insert(doc.provider.clone(), doc);
        Ok(())
    }

    pub fn get_model(&self, provider: &str, model: &str) -> Result<&ModelCapabilities> {
        self.list_provider_models(provider)?
            .iter()
            .find(|m| m.id == model)
            .ok_or_else(|| Error::Capability(format!("unknown model {model} for provider {provider}")))
    }

    /// Models for `provider` in document order.
    pub fn list_provider_models(&self, provider: &str) -> Result<&[ModelCapabilities]> {
        self.providers
            .get(provider)
            .map(|p| p.models.as_slice())
            .ok_or_else(|| Error::Capability(format!("unknown provider: {provider}")))
    }

    pub fn providers(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn provider(&self, provider: &str) -> Option<&ProviderCapabilities> {
        self.providers.get(provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
provider: acme
version: "2025-01"
models:
  - id: acme-large
    display_name: Acme Large
    supports_tools: true
    supports_thinking: true
    context_window: 200000
    max_output: 8192
    pricing_tiers:
      - threshold: 200000
        input_price: { text: 3.0 }
        output_price: { text: 15.0 }
      - threshold: null
        input_price: { text: 6.0 }
        output_price: { text: 22.5 }
  - id: acme-small
    display_name: Acme Small
    context_window: 32000
    max_output: 2048
"#;

    #[test]
    fn test_builtin_documents_parse() {
        let registry = CapabilityRegistry::load_builtin().unwrap();
        assert_eq!(registry.providers(), vec!["anthropic", "lorem", "openrouter"]);

        let haiku = registry
            .get_model("anthropic", "claude-haiku-4-5-20251001")
            .unwrap();
        assert!(haiku.supports_tools);
        assert!(haiku.supports_thinking);

        let lorem = registry.list_provider_models("lorem").unwrap();
        assert_eq!(lorem[0].id, "lorem-fast");
        assert!(!lorem[0].supports_tools);
    }

    #[test]
    fn test_models_keep_document_order() {
        let registry = CapabilityRegistry::from_yaml_documents(&[SAMPLE]).unwrap();
        let ids: Vec<_> = registry
            .list_provider_models("acme")
            .unwrap()
            .iter()
            .map(|m| m.id.as_str())
            .collect();
        assert_eq!(ids, vec!["acme-large", "acme-small"]);
    }

    #[test]
    fn test_unknown_lookups_fail() {
        let registry = CapabilityRegistry::from_yaml_documents(&[SAMPLE]).unwrap();
        assert!(registry.get_model("acme", "acme-huge").is_err());
        assert!(registry.list_provider_models("other").is_err());
    }

    #[test]
    fn test_duplicate_provider_rejected() {
        let err = CapabilityRegistry::from_yaml_documents(&[SAMPLE, SAMPLE]).unwrap_err();
        assert!(matches!(err, Error::Capability(_)));
    }

    #[test]
    fn test_pricing_tiers() {
        let registry = CapabilityRegistry::from_yaml_documents(&[SAMPLE]).unwrap();
        let model = registry.get_model("acme", "acme-large").unwrap();

        assert_eq!(model.price_for(1_000).unwrap().threshold, Some(200_000));
        assert_eq!(model.price_for(250_000).unwrap().threshold, None);

        let cost = model.estimate_cost(1_000_000 / 10, 1_000_000 / 100);
        assert!((cost - (0.3 + 0.15)).abs() < 1e-9);

        let small = registry.get_model("acme", "acme-small").unwrap();
        assert!(small.price_for(10).is_none());
        assert_eq!(small.estimate_cost(10, 10), 0.0);
        assert_eq!(small.tool_call_quality, ToolCallQuality::Good);
    }

    #[test]
    fn test_context_usage() {
        let registry = CapabilityRegistry::from_yaml_documents(&[SAMPLE]).unwrap();
        let model = registry.get_model("acme", "acme-small").unwrap();
        assert!((model.context_usage(24_000) - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_from_dir_loads_yaml_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("acme.yaml"), SAMPLE).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let registry = CapabilityRegistry::from_dir(dir.path()).unwrap();
        assert_eq!(registry.providers(), vec!["acme"]);
        assert_eq!(registry.provider("acme").unwrap().version, "2025-01");
    }
}
