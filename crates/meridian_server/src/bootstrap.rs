//! Wiring from configuration to a running engine.

use std::sync::Arc;

use anyhow::{Context, Result};
use meridian_core::SqliteStore;
use meridian_llms::ProviderRegistry;
use meridian_runtime::{Engine, EngineConfig, EngineDeps};
use meridian_toolbus::{DocumentStore, FsDocumentStore, TavilyClient, ToolRegistry};

use crate::config::ServerConfig;

/// Engine plus the store it writes to, for callers that seed chats.
pub struct Services {
    pub engine: Engine,
    pub store: Arc<SqliteStore>,
}

pub fn document_store(config: &ServerConfig) -> Result<Arc<dyn DocumentStore>> {
    std::fs::create_dir_all(&config.docs_root)
        .with_context(|| format!("create document root {}", config.docs_root.display()))?;
    Ok(Arc::new(FsDocumentStore::new(config.docs_root.clone())))
}

/// Document tools over `documents`, plus `web_search` when a Tavily key is set.
pub fn tool_registry(documents: Arc<dyn DocumentStore>) -> ToolRegistry {
    let builder = ToolRegistry::builder().with_document_tools(documents);
    match TavilyClient::from_env() {
        Ok(client) => builder.with_web_search(client).build(),
        Err(e) => {
            tracing::debug!(tool.name = "web_search", error = %e, "tool not registered");
            builder.build()
        }
    }
}

pub fn build(config: &ServerConfig, engine_config: EngineConfig) -> Result<Services> {
    let store = Arc::new(
        SqliteStore::open(&config.db_path)
            .with_context(|| format!("open turn store {}", config.db_path.display()))?,
    );
    let documents = document_store(config)?;
    let tools = tool_registry(Arc::clone(&documents));
    let providers = ProviderRegistry::from_env();

    let deps = EngineDeps::new(Arc::clone(&store), documents, providers, tools)?;
    tracing::info!(
        db.path = %config.db_path.display(),
        docs.root = %config.docs_root.display(),
        provider = %engine_config.default_provider,
        model = %engine_config.default_model,
        "engine ready"
    );
    Ok(Services {
        engine: Engine::new(deps, engine_config),
        store,
    })
}
