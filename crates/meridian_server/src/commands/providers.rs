//! `meridian providers` subcommands.

use anyhow::{Result, anyhow};
use comfy_table::{Cell, Color};
use meridian_llms::{CapabilityRegistry, ModelCapabilities, ProviderRegistry};

use crate::cli::ProvidersAction;
use crate::output;

pub async fn handle(action: ProvidersAction) -> Result<()> {
    let capabilities = CapabilityRegistry::load_builtin()?;
    match action {
        ProvidersAction::List => list(&capabilities),
        ProvidersAction::Models { provider } => models(&capabilities, &provider),
    }
}

fn list(capabilities: &CapabilityRegistry) -> Result<()> {
    let registry = ProviderRegistry::from_env();

    let mut names: Vec<String> = capabilities.providers().into_iter().map(str::to_string).collect();
    for id in registry.list_providers() {
        if !names.contains(&id) {
            names.push(id);
        }
    }
    names.sort();

    if output::is_json() {
        let providers: Vec<_> = names
            .iter()
            .map(|name| {
                serde_json::json!({
                    "provider": name,
                    "configured": registry.contains(name),
                    "models": capabilities
                        .list_provider_models(name)
                        .map(|models| models.iter().map(|m| m.id.as_str()).collect::<Vec<_>>())
                        .unwrap_or_default(),
                })
            })
            .collect();
        output::data("providers", &providers);
        return Ok(());
    }

    output::header("Providers");
    let mut table = output::table(&["Provider", "Status", "Models"]);
    for name in &names {
        let status = if registry.contains(name) {
            Cell::new("configured").fg(Color::Green)
        } else {
            Cell::new("missing API key").fg(Color::Yellow)
        };
        let models: Vec<&str> = capabilities
            .list_provider_models(name)
            .map(|models| models.iter().map(|m| m.id.as_str()).collect())
            .unwrap_or_default();
        table.add_row(vec![
            Cell::new(name).fg(Color::Green),
            status,
            Cell::new(format_models(&models)),
        ]);
    }
    println!("{table}");
    Ok(())
}

fn format_models(models: &[&str]) -> String {
    if models.len() <= 3 {
        models.join(", ")
    } else {
        format!("{}, {}, {} (+{} more)", models[0], models[1], models[2], models.len() - 3)
    }
}

fn models(capabilities: &CapabilityRegistry, provider: &str) -> Result<()> {
    let models = capabilities
        .list_provider_models(provider)
        .map_err(|_| anyhow!("No capability data for provider: {}", provider))?;

    if output::is_json() {
        output::data(provider, &models);
        return Ok(());
    }

    output::header(&format!("Models for {}", provider));
    let mut table = output::table(&["Model", "Context", "Max output", "Features"]);
    for model in models {
        table.add_row(output::row([
            model.id.clone(),
            model.context_window.to_string(),
            model.max_output.to_string(),
            features(model),
        ]));
    }
    println!("{table}");
    Ok(())
}

fn features(model: &ModelCapabilities) -> String {
    let mut features = Vec::new();
    if model.supports_tools {
        features.push("tools");
    }
    if model.requires_thinking {
        features.push("thinking (required)");
    } else if model.supports_thinking {
        features.push("thinking");
    }
    if model.supports_vision {
        features.push("vision");
    }
    features.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_models_truncates_long_lists() {
        assert_eq!(format_models(&["a", "b"]), "a, b");
        assert_eq!(format_models(&["a", "b", "c", "d", "e"]), "a, b, c (+2 more)");
    }

    #[test]
    fn test_features_for_builtin_models() {
        let capabilities = CapabilityRegistry::load_builtin().unwrap();
        let lorem = capabilities.get_model("lorem", "lorem-fast").unwrap();
        assert_eq!(features(lorem), "thinking");
        let haiku = capabilities.get_model("anthropic", "claude-haiku-4-5-20251001").unwrap();
        assert!(features(haiku).starts_with("tools"));
    }
}
