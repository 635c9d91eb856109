//! `meridian` binary: HTTP/SSE server and operator CLI for the turn engine.

mod bootstrap;
mod cli;
mod commands;
mod config;
mod http;
mod output;


use std::path::Path;

use clap::Parser;
use meridian_core::db::{ENV_FILE, MERIDIAN_DIR};

use crate::cli::Cli;

/// Load env files without overriding variables already set.
/// Order: process env, then `.meridian/env`, then `.env`, each found by
/// walking up from the current directory.
fn load_env_files() {
    let Ok(cwd) = std::env::current_dir() else {
        return;
    };
    let meridian_env = Path::new(MERIDIAN_DIR).join(ENV_FILE);
    for relative in [meridian_env.as_path(), Path::new(".env")] {
        if let Some(path) = cwd.ancestors().map(|dir| dir.join(relative)).find(|p| p.exists()) {
            if let Err(e) = dotenvy::from_path(&path) {
                eprintln!("warning: could not load {}: {}", path.display(), e);
            }
        }
    }
}

#[tokio::main]
async fn main() {
    load_env_files();
    let cli = Cli::parse();
    output::init(cli.output);

    let observability = meridian_observability::ObservabilityConfig::from_env()
        .with_console(cli.verbose || matches!(cli.command, cli::Command::Serve { .. }));
    if let Err(e) = meridian_observability::init(observability) {
        output::warning(&format!("tracing disabled: {e}"));
    }

    let result = commands::handle(cli).await;
    meridian_observability::shutdown();

    if let Err(e) = result {
        output::error(&format!("{e:#}"));
        std::process::exit(1);
    }
}
