//! `meridian run`: one turn, in-process, printed as it streams.

use std::io::Write;

use anyhow::Result;
use console::style;
use meridian_core::{
    BlockKind, BlockPayload, ChatDirectory, ChatRecord, ProjectRecord, SqliteStore, TurnEvent, TurnId,
};
use meridian_runtime::{EngineConfig, TurnRequest};

use crate::bootstrap;
use crate::config::ServerConfig;
use crate::output;

const LOCAL_PROJECT: &str = "local";

pub struct RunArgs {
    pub chat: String,
    pub message: String,
    pub user: String,
    pub prev_turn: Option<String>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub reasoning: Option<String>,
}

impl RunArgs {
    fn request(&self) -> TurnRequest {
        let mut request = TurnRequest::new(self.message.clone());
        if let Some(prev) = &self.prev_turn {
            request = request.with_prev_turn(TurnId(prev.clone()));
        }
        request.provider = self.provider.clone();
        request.model = self.model.clone();
        request.reasoning = self.reasoning.clone();
        request
    }
}

pub async fn handle(args: RunArgs) -> Result<()> {
    let config = ServerConfig::from_env();
    let services = bootstrap::build(&config, EngineConfig::from_env())?;
    ensure_chat(&services.store, &args.user, &args.chat)?;

    let engine = services.engine;
    let handle = engine.start_turn(&args.user, &args.chat, args.request()).await?;
    if !output::is_json() {
        output::dim(&format!("turn {}", handle.turn_id));
    }

    let mut subscription = engine.subscribe(&args.user, &handle.turn_id, 0).await?;
    let mut renderer = Renderer::default();
    while let Some(event) = subscription.next().await {
        renderer.render(&event);
    }

    let status = handle.finished().await?;
    tracing::debug!(status = status.as_str(), "turn finished");
    Ok(())
}

/// Create the chat under a local project owned by `user` when it is missing.
fn ensure_chat(store: &SqliteStore, user: &str, chat_id: &str) -> Result<()> {
    if store.get_chat(chat_id)?.is_some() {
        return Ok(());
    }
    if store.get_project(LOCAL_PROJECT)?.is_none() {
        store.upsert_project(&ProjectRecord::new(LOCAL_PROJECT, user, "Local"))?;
    }
    store.upsert_chat(&ChatRecord::new(chat_id, LOCAL_PROJECT, user, chat_id))?;
    if !output::is_json() {
        output::dim(&format!("created chat {chat_id}"));
    }
    Ok(())
}

/// Prints deltas inline and summarizes committed tool blocks.
#[derive(Default)]
struct Renderer {
    streaming: Option<BlockKind>,
}

impl Renderer {
    fn render(&mut self, event: &TurnEvent) {
        if output::is_json() {
            output::data(event.event_name(), event);
            return;
        }
        match event {
            TurnEvent::BlockDelta { kind, delta, .. } => match kind {
                BlockKind::Text => self.write_inline(*kind, &style(delta).to_string()),
                BlockKind::Thinking => self.write_inline(*kind, &style(delta).dim().italic().to_string()),
                _ => {}
            },
            TurnEvent::Block { block } => {
                self.end_line();
                match &block.payload {
                    BlockPayload::ToolUse { tool_name, input, .. } => {
                        output::dim(&format!("→ {tool_name} {input}"));
                    }
                    BlockPayload::ToolResult {
                        tool_name,
                        is_error,
                        duration_ms,
                        result,
                        ..
                    } => {
                        if *is_error {
                            output::warning(&format!("← {tool_name} failed: {}", result["error"]));
                        } else {
                            output::dim(&format!("← {tool_name} ({duration_ms}ms)"));
                        }
                    }
                    BlockPayload::Marker { message, .. } => output::warning(message),
                    BlockPayload::Text { .. } | BlockPayload::Thinking { .. } => {}
                }
            }
            TurnEvent::TurnComplete {
                input_tokens,
                output_tokens,
                stop_reason,
                ..
            } => {
                self.end_line();
                output::success(&format!(
                    "complete ({}, {input_tokens} in / {output_tokens} out tokens)",
                    stop_reason.as_deref().unwrap_or("stop")
                ));
            }
            TurnEvent::TurnError { error, status, .. } => {
                self.end_line();
                output::error(&format!("{}: {error}", status.as_str()));
            }
            TurnEvent::TurnStart { provider, model, .. } => {
                output::kv("model", &format!("{provider}/{model}"));
            }
            TurnEvent::Status { .. } => {}
        }
    }

    fn write_inline(&mut self, kind: BlockKind, text: &str) {
        if self.streaming.is_some_and(|current| current != kind) {
            self.end_line();
        }
        self.streaming = Some(kind);
        let mut stdout = std::io::stdout().lock();
        let _ = write!(stdout, "{text}");
        let _ = stdout.flush();
    }

    fn end_line(&mut self) {
        if self.streaming.take().is_some() {
            println!();
        }
    }
}
