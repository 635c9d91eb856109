//! `meridian tools` subcommands.

use anyhow::{Result, anyhow};
use meridian_toolbus::ToolRegistry;
use serde_json::Value as JsonValue;

use crate::bootstrap;
use crate::cli::ToolsAction;
use crate::config::ServerConfig;
use crate::output;

pub async fn handle(action: ToolsAction) -> Result<()> {
    let config = ServerConfig::from_env();
    let registry = bootstrap::tool_registry(bootstrap::document_store(&config)?);

    match action {
        ToolsAction::List => list(&registry),
        ToolsAction::Info { tool } => info(&registry, &tool),
        ToolsAction::Call { tool, args } => call(&registry, &tool, &args).await,
    }
}

fn list(registry: &ToolRegistry) -> Result<()> {
    let tools = registry.list_tools();

    if tools.is_empty() {
        output::dim("No tools registered");
        return Ok(());
    }

    if output::is_json() {
        output::data("tools", &tools);
        return Ok(());
    }

    output::header("Registered Tools");
    let mut table = output::table(&["Tool", "Description"]);
    for tool in &tools {
        table.add_row(output::row([tool.name.as_str(), tool.description.as_str()]));
    }
    println!("{table}");
    Ok(())
}

fn info(registry: &ToolRegistry, tool_name: &str) -> Result<()> {
    let tool = registry
        .definitions(Some(&[tool_name.to_string()]))
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("unknown tool: {tool_name}"))?;

    if output::is_json() {
        output::data(&tool.name, &tool);
        return Ok(());
    }

    output::header(&tool.name);
    output::dim(&tool.description);
    output::header("Parameters");
    output::json_pretty(&tool.parameters);

    Ok(())
}

async fn call(registry: &ToolRegistry, tool_name: &str, args_str: &str) -> Result<()> {
    let args: JsonValue =
        serde_json::from_str(args_str).map_err(|e| anyhow!("--args is not valid JSON: {e}"))?;

    let spinner = output::spinner(&format!("Calling {tool_name}..."));
    let outcome = registry.call(tool_name, args).await;
    let elapsed = outcome.as_ref().map(|(_, ms)| *ms).unwrap_or_default();
    output::finish(
        &spinner,
        &outcome,
        &format!("{tool_name} completed in {elapsed}ms"),
        &format!("{tool_name} failed"),
    );

    let (result, _) = outcome?;
    output::json_pretty(&result);
    Ok(())
}
