//! CLI argument definitions using clap derive macros.

use clap::{Parser, Subcommand, ValueEnum};

/// Turn execution engine: streams model turns over HTTP and SSE
#[derive(Parser)]
#[command(name = "meridian", about, version, propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format: text (human-readable) or json (machine-readable)
    #[arg(short, long, global = true, default_value = "text")]
    pub output: OutputFormat,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    /// Colored terminal output for humans
    #[default]
    Text,
    /// Structured JSON for machine consumption
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server
    Serve {
        /// Port to listen on. Uses PORT env if not set.
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run one turn in-process and print its stream
    Run {
        /// Chat to post the message to
        #[arg(long)]
        chat: String,
        /// User message
        #[arg(short, long)]
        message: String,
        /// Acting user (must own the chat)
        #[arg(long, default_value = "local")]
        user: String,
        /// Parent turn for a follow-up message
        #[arg(long)]
        prev_turn: Option<String>,
        /// Provider to use (anthropic, openrouter, lorem)
        #[arg(long)]
        provider: Option<String>,
        /// Model to use (e.g. claude-haiku-4-5-20251001, lorem-fast)
        #[arg(long)]
        model: Option<String>,
        /// Reasoning level: low, medium, high
        #[arg(long)]
        reasoning: Option<String>,
    },
    /// Inspect LLM providers and their models
    Providers {
        #[command(subcommand)]
        action: ProvidersAction,
    },
    /// Inspect and call document tools
    Tools {
        #[command(subcommand)]
        action: ToolsAction,
    },
}

#[derive(Subcommand)]
pub enum ProvidersAction {
    /// List providers with configured credentials
    List,
    /// List models known to the capability registry
    Models {
        /// Provider ID
        provider: String,
    },
}

#[derive(Subcommand)]
pub enum ToolsAction {
    /// List all registered tools
    List,
    /// Show tool details and parameter schema
    Info {
        /// Tool name
        tool: String,
    },
    /// Call a tool with JSON arguments
    Call {
        /// Tool name
        tool: String,
        /// JSON arguments
        #[arg(short, long)]
        args: String,
    },
}
