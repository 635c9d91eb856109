//! Resolve a turn request into the parameters the turn will run with.

use std::collections::HashSet;
use std::str::FromStr;

use meridian_core::RequestParams;
use meridian_llms::{CapabilityRegistry, ReasoningLevel};
use meridian_toolbus::ToolRegistry;
use tracing::{debug, warn};

use super::TurnRequest;
use crate::config::EngineConfig;
use crate::error::{Result, RuntimeError};

/// Reasoning level used when a model cannot run without thinking.
const FORCED_REASONING: ReasoningLevel = ReasoningLevel::Medium;

/// Fill defaults and shape the request to what the model supports.
///
/// Unknown models are allowed through unchanged apart from defaults; the
/// provider decides whether it accepts them.
pub(crate) fn resolve_params(
    request: &TurnRequest,
    config: &EngineConfig,
    capabilities: &CapabilityRegistry,
    tools: &ToolRegistry,
) -> Result<RequestParams> {
    let provider = request
        .provider
        .clone()
        .unwrap_or_else(|| config.default_provider.clone());
    let model = match &request.model {
        Some(model) => model.clone(),
        None => default_model(&provider, config, capabilities),
    };

    let mut reasoning = match request.reasoning.as_deref() {
        None | Some("") | Some("none") => None,
        Some(level) => Some(
            ReasoningLevel::from_str(level).map_err(|e| RuntimeError::InvalidRequest(e.to_string()))?,
        ),
    };

    if let Some(temperature) = request.temperature {
        if !(0.0..=2.0).contains(&temperature) {
            return Err(RuntimeError::InvalidRequest(format!(
                "temperature {temperature} is outside 0.0..=2.0"
            )));
        }
    }

    let mut tool_names = select_tools(request.tools.as_deref(), tools);
    let mut max_tokens = request.max_tokens.unwrap_or(config.max_tokens);

    match capabilities.get_model(&provider, &model) {
        Ok(caps) => {
            if !caps.supports_tools && !tool_names.is_empty() {
                debug!(provider = %provider, model = %model, "model has no tool support, dropping tools");
                tool_names.clear();
            }
            if caps.requires_thinking && reasoning.is_none() {
                reasoning = Some(FORCED_REASONING);
            } else if !caps.supports_thinking && reasoning.is_some() {
                debug!(provider = %provider, model = %model, "model has no thinking support, ignoring reasoning level");
                reasoning = None;
            }
            if max_tokens > caps.max_output {
                max_tokens = caps.max_output;
            }
        }
        Err(e) => warn!(provider = %provider, model = %model, "no capability record, sending request unchecked: {}", e),
    }

    Ok(RequestParams {
        provider,
        model,
        reasoning: reasoning.map(|level| level.as_str().to_string()),
        tools: tool_names,
        skills: dedup(&request.skills),
        max_tokens: Some(max_tokens),
        temperature: request.temperature,
        system_prompt: request
            .system_prompt
            .as_ref()
            .map(|prompt| prompt.trim())
            .filter(|prompt| !prompt.is_empty())
            .map(str::to_string),
    })
}

fn default_model(provider: &str, config: &EngineConfig, capabilities: &CapabilityRegistry) -> String {
    if provider == config.default_provider {
        return config.default_model.clone();
    }
    capabilities
        .list_provider_models(provider)
        .ok()
        .and_then(|models| models.first())
        .map(|model| model.id.clone())
        .unwrap_or_else(|| config.default_model.clone())
}

/// `None` selects every registered tool; unknown names are dropped.
fn select_tools(requested: Option<&[String]>, tools: &ToolRegistry) -> Vec<String> {
    match requested {
        None => tools.list_tools().into_iter().map(|info| info.name).collect(),
        Some(names) => dedup(names)
            .into_iter()
            .filter(|name| {
                let known = tools.contains(name);
                if !known {
                    warn!(tool.name = %name, "requested tool is not registered");
                }
                known
            })
            .collect(),
    }
}

fn dedup(names: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .iter()
        .filter(|name| !name.is_empty() && seen.insert(name.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use meridian_toolbus::FsDocumentStore;
    use tempfile::TempDir;

    fn fixtures() -> (TempDir, CapabilityRegistry, ToolRegistry) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FsDocumentStore::new(dir.path()));
        let tools = ToolRegistry::builder().with_document_tools(store).build();
        (dir, CapabilityRegistry::load_builtin().unwrap(), tools)
    }

    fn request(provider: &str, model: &str) -> TurnRequest {
        TurnRequest {
            provider: Some(provider.to_string()),
            model: Some(model.to_string()),
            ..TurnRequest::new("hello")
        }
    }

    #[test]
    fn test_defaults_select_every_tool() {
        let (_dir, caps, tools) = fixtures();
        let params = resolve_params(&TurnRequest::new("hi"), &EngineConfig::default(), &caps, &tools).unwrap();
        assert_eq!(params.provider, "anthropic");
        assert_eq!(params.model, "claude-haiku-4-5-20251001");
        assert_eq!(params.tools, vec!["doc_edit", "doc_search", "doc_tree", "doc_view"]);
        assert_eq!(params.max_tokens, Some(8192));
    }

    #[test]
    fn test_tools_dropped_for_models_without_tool_support() {
        let (_dir, caps, tools) = fixtures();
        let params = resolve_params(&request("lorem", "lorem-fast"), &EngineConfig::default(), &caps, &tools).unwrap();
        assert!(params.tools.is_empty());
        assert_eq!(params.max_tokens, Some(4096), "clamped to the model's output limit");
    }

    #[test]
    fn test_reasoning_ignored_without_thinking_support() {
        let (_dir, caps, tools) = fixtures();
        let mut req = request("lorem", "lorem-cutoff");
        req.reasoning = Some("high".into());
        let params = resolve_params(&req, &EngineConfig::default(), &caps, &tools).unwrap();
        assert_eq!(params.reasoning, None);

        let mut req = request("lorem", "lorem-fast");
        req.reasoning = Some("HIGH".into());
        let params = resolve_params(&req, &EngineConfig::default(), &caps, &tools).unwrap();
        assert_eq!(params.reasoning.as_deref(), Some("high"));
    }

    #[test]
    fn test_unknown_model_fails_open() {
        let (_dir, caps, tools) = fixtures();
        let mut req = request("anthropic", "claude-next");
        req.tools = Some(vec!["doc_view".into(), "doc_view".into(), "shell".into()]);
        req.max_tokens = Some(100_000);
        let params = resolve_params(&req, &EngineConfig::default(), &caps, &tools).unwrap();
        assert_eq!(params.tools, vec!["doc_view"]);
        assert_eq!(params.max_tokens, Some(100_000));
    }

    #[test]
    fn test_provider_without_model_uses_its_first_model() {
        let (_dir, caps, tools) = fixtures();
        let req = TurnRequest {
            provider: Some("lorem".into()),
            ..TurnRequest::new("hi")
        };
        let params = resolve_params(&req, &EngineConfig::default(), &caps, &tools).unwrap();
        assert_eq!(params.model, "lorem-fast");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let (_dir, caps, tools) = fixtures();
        let mut req = TurnRequest::new("hi");
        req.reasoning = Some("extreme".into());
        assert!(matches!(
            resolve_params(&req, &EngineConfig::default(), &caps, &tools),
            Err(RuntimeError::InvalidRequest(_))
        ));

        let mut req = TurnRequest::new("hi");
        req.temperature = Some(3.5);
        assert!(matches!(
            resolve_params(&req, &EngineConfig::default(), &caps, &tools),
            Err(RuntimeError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_blank_override_prompt_is_dropped() {
        let (_dir, caps, tools) = fixtures();
        let mut req = TurnRequest::new("hi");
        req.system_prompt = Some("   ".into());
        req.skills = vec!["critique".into(), "critique".into()];
        let params = resolve_params(&req, &EngineConfig::default(), &caps, &tools).unwrap();
        assert_eq!(params.system_prompt, None);
        assert_eq!(params.skills, vec!["critique"]);
    }
}
