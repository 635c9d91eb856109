use axum::Json;
use axum::extract::State;
use meridian_llms::ModelCapabilities;
use serde::Serialize;
use serde_json::{Value as JsonValue, json};

use super::AppState;

/// GET /healthz
pub async fn healthz(State(state): State<AppState>) -> Json<JsonValue> {
    Json(json!({
        "status": "ok",
        "running_turns": state.engine.running_turns(),
    }))
}

#[derive(Debug, Serialize)]
pub struct ProviderModels<'a> {
    pub provider: &'a str,
    /// Credentials present and the provider registered.
    pub available: bool,
    pub models: &'a [ModelCapabilities],
}

/// GET /api/models
pub async fn list_models(State(state): State<AppState>) -> Json<JsonValue> {
    let capabilities = state.engine.capabilities();
    let providers: Vec<ProviderModels<'_>> = capabilities
        .providers()
        .into_iter()
        .filter_map(|provider| {
            let models = capabilities.list_provider_models(provider).ok()?;
            Some(ProviderModels {
                provider,
                available: state.engine.providers().contains(provider),
                models,
            })
        })
        .collect();
    Json(json!({ "providers": providers }))
}
