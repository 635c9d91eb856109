//! Command dispatch.

pub mod providers;
pub mod run;
pub mod serve;
pub mod tools;

use crate::cli::{Cli, Command};
use anyhow::Result;

pub async fn handle(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Serve { port } => serve::handle(port).await,
        Command::Run {
            chat,
            message,
            user,
            prev_turn,
            provider,
            model,
            reasoning,
        } => {
            let args = run::RunArgs {
                chat,
                message,
                user,
                prev_turn,
                provider,
                model,
                reasoning,
            };
            run::handle(args).await
        }
        Command::Providers { action } => providers::handle(action).await,
        Command::Tools { action } => tools::handle(action).await,
    }
}
