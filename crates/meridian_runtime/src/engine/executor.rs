//! The per-turn state machine.
//!
//! `pending → composing → awaiting_model → (executing_tools → awaiting_model)*
//! → completing → complete`, with `failed` and `cancelled` reachable from
//! every non-terminal state. Each committed block and status change is
//! published after it is durable.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use meridian_core::{
    BlockKind, BlockPayload, FailureReason, RequestParams, Role, TokenUsage, ToolInvocation, ToolOutcome,
    Turn, TurnEvent, TurnStatus,
};
use meridian_llms::{
    FinishReason, FinishReasonKind, GenerateOptions, GenerateRequest, Provider, ReasoningLevel, StreamEvent,
    Tool, open_stream,
};
use meridian_observability::{record_duration, record_error};
use meridian_toolbus::ToolRegistry;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, warn};

use super::EngineInner;
use crate::block_log::run_store;
use crate::context::{ComposedPrompt, HistoryTurn, PromptInputs, SystemSources, turn_messages};
use crate::error::{Result, RuntimeError};

const CANCELLED_MARKER: &str = "Turn cancelled";

/// Text or thinking assembled from deltas and not yet committed.
struct PendingSegment {
    kind: BlockKind,
    text: String,
    signature: Option<String>,
}

impl PendingSegment {
    fn new(kind: BlockKind) -> Self {
        Self {
            kind,
            text: String::new(),
            signature: None,
        }
    }

    fn into_payload(self) -> Option<BlockPayload> {
        match self.kind {
            BlockKind::Thinking if !self.text.is_empty() || self.signature.is_some() => {
                Some(BlockPayload::thinking(self.text, self.signature))
            }
            BlockKind::Text if !self.text.is_empty() => Some(BlockPayload::text(self.text)),
            _ => None,
        }
    }
}

/// What one model call produced.
#[derive(Default)]
struct ModelRound {
    tool_calls: Vec<ToolInvocation>,
    finish: Option<FinishReason>,
    usage: TokenUsage,
}

pub(crate) struct TurnExecutor {
    engine: Arc<EngineInner>,
    turn: Turn,
    user_id: String,
    cancel: CancellationToken,
    last_sequence: u64,
    pending: Option<PendingSegment>,
}

impl TurnExecutor {
    pub(crate) fn new(engine: Arc<EngineInner>, turn: Turn, user_id: &str, cancel: CancellationToken) -> Self {
        Self {
            engine,
            turn,
            user_id: user_id.to_string(),
            cancel,
            last_sequence: 0,
            pending: None,
        }
    }

    /// Drive the turn to a terminal status and close its stream.
    pub(crate) async fn run(mut self) -> TurnStatus {
        let span = tracing::info_span!(
            "engine.execute_turn",
            turn.id = %self.turn.id,
            chat.id = %self.turn.chat_id,
            duration_ms = tracing::field::Empty,
            error = tracing::field::Empty,
            error.message = tracing::field::Empty,
        );
        async move {
            let start = Instant::now();
            let outcome = self.execute().await;
            self.finish(outcome).await;
            record_duration("duration_ms", start.elapsed());
            self.turn.status
        }
        .instrument(span)
        .await
    }

    async fn execute(&mut self) -> Result<()> {
        self.advance(TurnStatus::Composing).await?;
        let params = self
            .turn
            .params
            .clone()
            .ok_or_else(|| RuntimeError::Composition("assistant turn has no request parameters".to_string()))?;

        let inputs = self.prompt_inputs(&params).await?;
        let composed = self.engine.composer.compose(&inputs).await?;
        self.turn.system_prompt = composed.system.clone();

        let provider = self.engine.deps.providers.get_provider(&params.provider)?;
        let options = self.options(&params);
        let limit = self.tool_round_limit().await;
        let mut rounds = 0;

        loop {
            if self.cancel.is_cancelled() {
                return Err(RuntimeError::Cancelled);
            }
            self.advance(TurnStatus::AwaitingModel).await?;

            let request = self.request(&params.model, &composed, options.clone()).await?;
            let round = self.stream_model(Arc::clone(&provider), request).await?;
            self.turn.usage.add(round.usage);
            if round.usage.total() > 0 {
                self.turn.context_tokens = round.usage.total();
            }
            if let Some(reason) = &round.finish {
                self.turn.stop_reason = Some(reason.label());
                if reason.unified == FinishReasonKind::Error {
                    return Err(RuntimeError::Provider(format!(
                        "model finished with an error ({})",
                        reason.label()
                    )));
                }
            }

            if round.tool_calls.is_empty() {
                break;
            }
            if rounds >= limit {
                return Err(RuntimeError::ToolLoopExhausted { limit });
            }
            rounds += 1;

            self.advance(TurnStatus::ExecutingTools).await?;
            self.execute_tools(round.tool_calls, &params.tools).await?;
        }

        self.advance(TurnStatus::Completing).await
    }

    async fn advance(&mut self, status: TurnStatus) -> Result<()> {
        self.turn.transition(status)?;
        self.persist().await?;
        self.engine
            .hub
            .publish(&self.turn.id, TurnEvent::status(self.turn.id.clone(), status));
        debug!(status = %status, "turn advanced");
        Ok(())
    }

    async fn persist(&self) -> Result<()> {
        let turn = self.turn.clone();
        run_store(&self.engine.deps.store, &self.turn.id, "update_turn", move |store, _| {
            store.update_turn(&turn)
        })
        .await
    }

    /// History along the user turn's ancestry plus the chat and project prompts.
    async fn prompt_inputs(&self, params: &RequestParams) -> Result<PromptInputs> {
        let user_turn_id = self
            .turn
            .prev_turn_id
            .clone()
            .ok_or_else(|| RuntimeError::Composition("assistant turn has no user turn".to_string()))?;
        let history = run_store(&self.engine.deps.store, &user_turn_id, "turn_path", |store, id| {
            store
                .turn_path(id)?
                .into_iter()
                .map(|turn| {
                    let blocks = store.blocks_after(&turn.id, 0)?;
                    Ok(HistoryTurn { turn, blocks })
                })
                .collect::<meridian_core::Result<Vec<_>>>()
        })
        .await?;

        let chats = Arc::clone(&self.engine.deps.chats);
        let chat_id = self.turn.chat_id.clone();
        let records = tokio::task::spawn_blocking(move || -> meridian_core::Result<_> {
            let Some(chat) = chats.get_chat(&chat_id)? else {
                return Ok(None);
            };
            let project = chats.get_project(&chat.project_id)?;
            Ok(Some((chat, project)))
        })
        .await
        .map_err(|e| RuntimeError::Storage(format!("chat lookup task failed: {e}")))?
        .map_err(|e| RuntimeError::Composition(format!("chat lookup failed: {e}")))?;
        let (chat, project) =
            records.ok_or_else(|| RuntimeError::Composition(format!("chat {} not found", self.turn.chat_id)))?;

        Ok(PromptInputs {
            system: SystemSources {
                override_prompt: params.system_prompt.clone(),
                project_prompt: project.and_then(|project| project.system_prompt),
                chat_prompt: chat.system_prompt,
                skills: params.skills.clone(),
            },
            history,
        })
    }

    fn options(&self, params: &RequestParams) -> GenerateOptions {
        let mut options =
            GenerateOptions::new().max_tokens(params.max_tokens.unwrap_or(self.engine.config.max_tokens));
        if let Some(temperature) = params.temperature {
            options = options.temperature(temperature);
        }
        if let Some(level) = params
            .reasoning
            .as_deref()
            .and_then(|level| level.parse::<ReasoningLevel>().ok())
        {
            options = options.reasoning(level);
        }
        for info in self.engine.deps.tools.definitions(Some(params.tools.as_slice())) {
            options = options.add_tool(Tool::function(info.name, info.description).parameters(info.parameters));
        }
        options
    }

    async fn tool_round_limit(&self) -> usize {
        let fallback = self.engine.config.max_tool_rounds;
        let Some(limits) = &self.engine.deps.limits else {
            return fallback;
        };
        match limits.tool_round_limit(&self.user_id).await {
            Ok(limit) => limit,
            Err(e) => {
                warn!(user.id = %self.user_id, "tool limit lookup failed, using {}: {}", fallback, e);
                fallback
            }
        }
    }

    /// Composed history followed by what this turn has produced so far.
    async fn request(&self, model: &str, composed: &ComposedPrompt, options: GenerateOptions) -> Result<GenerateRequest> {
        let blocks = self.engine.log.replay(&self.turn.id, 0).await?;
        let mut messages = composed.messages.clone();
        messages.extend(turn_messages(
            Role::Assistant,
            &blocks,
            self.engine.composer.formatters(),
            true,
        ));

        let mut request = GenerateRequest::new(model, messages).with_options(options);
        if let Some(system) = &composed.system {
            request = request.with_system(system.clone());
        }
        Ok(request)
    }

    async fn stream_model(&mut self, provider: Arc<dyn Provider>, request: GenerateRequest) -> Result<ModelRound> {
        let span = tracing::info_span!(
            "engine.stream_model",
            turn.id = %self.turn.id,
            provider = provider.provider_id(),
            model = %request.model,
            duration_ms = tracing::field::Empty,
        );
        let cancel = self.cancel.clone();
        let policy = self.engine.config.retry_policy();

        async {
            let start = Instant::now();
            let mut stream = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RuntimeError::Cancelled),
                opened = open_stream(provider, request, policy) => opened?,
            };

            let mut round = ModelRound::default();
            loop {
                let next = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(RuntimeError::Cancelled),
                    event = stream.next() => event,
                };
                let Some(event) = next else {
                    break;
                };
                match event? {
                    StreamEvent::Start { id } => debug!(generation.id = %id, "model stream started"),
                    StreamEvent::TextDelta { delta, .. } => self.push_delta(BlockKind::Text, &delta).await?,
                    StreamEvent::ReasoningDelta { delta, .. } => {
                        self.push_delta(BlockKind::Thinking, &delta).await?
                    }
                    StreamEvent::ReasoningSignature { signature, .. } => self.sign_thinking(signature),
                    StreamEvent::ToolCallStart { id, name } => {
                        self.commit_pending().await?;
                        debug!(tool.name = %name, tool.call_id = %id, "tool call started");
                    }
                    StreamEvent::ToolCallDelta { delta, .. } => self.engine.hub.publish(
                        &self.turn.id,
                        TurnEvent::block_delta(self.last_sequence + 1, BlockKind::ToolUse, delta),
                    ),
                    StreamEvent::ToolCallEnd { id, name, arguments } => {
                        self.commit_pending().await?;
                        let invocation = ToolInvocation::new(id, name, arguments);
                        self.commit(invocation.to_payload()).await?;
                        round.tool_calls.push(invocation);
                    }
                    StreamEvent::Finish { usage, reason } => {
                        round.usage = TokenUsage::new(
                            u64::from(usage.prompt_tokens),
                            u64::from(usage.completion_tokens),
                        );
                        round.finish = Some(reason);
                    }
                    StreamEvent::Error { message } => return Err(RuntimeError::Provider(message)),
                }
            }
            self.commit_pending().await?;
            record_duration("duration_ms", start.elapsed());

            let Some(reason) = &round.finish else {
                return Err(RuntimeError::Protocol(
                    "model stream ended without a finish reason".to_string(),
                ));
            };
            info!(
                finish_reason = %reason.label(),
                tool_calls = round.tool_calls.len(),
                input_tokens = round.usage.input_tokens,
                output_tokens = round.usage.output_tokens,
                "model round finished"
            );
            Ok(round)
        }
        .instrument(span)
        .await
    }

    /// Extend the open segment, or commit it and start a new one when the
    /// content type changes. Deltas are published live with the sequence
    /// the segment will commit at.
    async fn push_delta(&mut self, kind: BlockKind, delta: &str) -> Result<()> {
        if delta.is_empty() {
            return Ok(());
        }
        if !self.pending.as_ref().is_some_and(|segment| segment.kind == kind) {
            self.commit_pending().await?;
            self.pending = Some(PendingSegment::new(kind));
        }
        if let Some(segment) = self.pending.as_mut() {
            segment.text.push_str(delta);
        }
        self.engine.hub.publish(
            &self.turn.id,
            TurnEvent::block_delta(self.last_sequence + 1, kind, delta),
        );
        Ok(())
    }

    fn sign_thinking(&mut self, signature: String) {
        match self.pending.as_mut() {
            Some(segment) if segment.kind == BlockKind::Thinking => segment.signature = Some(signature),
            _ => warn!(turn.id = %self.turn.id, "reasoning signature without open thinking segment"),
        }
    }

    async fn commit_pending(&mut self) -> Result<()> {
        let Some(payload) = self.pending.take().and_then(PendingSegment::into_payload) else {
            return Ok(());
        };
        self.commit(payload).await
    }

    async fn commit(&mut self, payload: BlockPayload) -> Result<()> {
        let block = self.engine.log.append(&self.turn.id, payload).await?;
        self.last_sequence = block.sequence;
        self.engine.hub.publish(&self.turn.id, TurnEvent::block(block));
        Ok(())
    }

    /// Run one round of tool calls concurrently and commit the results in
    /// call order. Tool failures become error results; only cancellation
    /// or storage failures abort the round.
    async fn execute_tools(&mut self, calls: Vec<ToolInvocation>, allowed: &[String]) -> Result<()> {
        let span = tracing::info_span!(
            "engine.execute_tools",
            turn.id = %self.turn.id,
            tool_count = calls.len(),
        );
        let tools = Arc::clone(&self.engine.deps.tools);
        let timeout = self.engine.config.tool_timeout;
        let cancel = self.cancel.clone();

        async {
            let runs = calls
                .iter()
                .map(|call| run_tool(&tools, allowed, timeout, call));
            let outcomes = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RuntimeError::Cancelled),
                outcomes = futures::future::join_all(runs) => outcomes,
            };
            for (call, outcome) in calls.iter().zip(outcomes) {
                self.commit(outcome.into_payload(call)).await?;
            }
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Persist whatever partial content is still open.
    async fn salvage(&mut self) {
        if let Err(e) = self.commit_pending().await {
            warn!(turn.id = %self.turn.id, "partial content lost: {}", e);
        }
    }

    async fn finish(&mut self, outcome: Result<()>) {
        let turn_id = self.turn.id.clone();
        let transitioned = match outcome {
            Ok(()) => {
                self.engine.log.seal(&turn_id, TurnStatus::Complete);
                info!(
                    input_tokens = self.turn.usage.input_tokens,
                    output_tokens = self.turn.usage.output_tokens,
                    "turn complete"
                );
                self.turn.transition(TurnStatus::Complete)
            }
            Err(RuntimeError::Cancelled) => {
                self.salvage().await;
                if let Err(e) = self
                    .commit(BlockPayload::marker(TurnStatus::Cancelled, CANCELLED_MARKER))
                    .await
                {
                    warn!(turn.id = %turn_id, "cancel marker not written: {}", e);
                }
                self.engine.log.seal(&turn_id, TurnStatus::Cancelled);
                info!(last_sequence = self.last_sequence, "turn cancelled");
                self.turn.transition(TurnStatus::Cancelled)
            }
            Err(err) => {
                record_error(&err);
                self.salvage().await;
                self.engine.log.seal(&turn_id, TurnStatus::Failed);
                let reason = err.failure_reason().unwrap_or(FailureReason::Internal);
                self.turn.fail(reason, err.to_string())
            }
        };
        if let Err(e) = transitioned {
            record_error(&e);
        }
        if let Err(e) = self.persist().await {
            record_error(&e);
        }

        let terminal = TurnEvent::terminal_for(&self.turn, self.last_sequence).unwrap_or_else(|| {
            TurnEvent::TurnError {
                turn_id: turn_id.clone(),
                status: self.turn.status,
                reason: Some(FailureReason::Internal),
                error: format!("turn stopped in status {}", self.turn.status),
                is_cancelled: false,
                last_sequence: Some(self.last_sequence),
            }
        });
        self.engine.hub.close(&turn_id, terminal);
        self.engine.log.forget(&turn_id);
        self.engine.finished(&turn_id);
    }
}

async fn run_tool(tools: &ToolRegistry, allowed: &[String], timeout: Duration, call: &ToolInvocation) -> ToolOutcome {
    if !allowed.iter().any(|name| name == &call.name) {
        warn!(tool.name = %call.name, "model called a tool outside the turn's tool set");
        return ToolOutcome::error(format!("Tool not available: {}", call.name), 0);
    }

    let start = Instant::now();
    match tokio::time::timeout(timeout, tools.call(&call.name, call.input.clone())).await {
        Ok(Ok((output, duration_ms))) => {
            debug!(tool.name = %call.name, duration_ms, "tool succeeded");
            ToolOutcome::success(output, duration_ms)
        }
        Ok(Err(e)) => {
            warn!(tool.name = %call.name, "tool failed: {}", e);
            ToolOutcome::error(e.to_string(), start.elapsed().as_millis() as u64)
        }
        Err(_) => {
            warn!(tool.name = %call.name, timeout_secs = timeout.as_secs(), "tool timed out");
            ToolOutcome::error(
                format!("Tool {} timed out after {}s", call.name, timeout.as_secs()),
                start.elapsed().as_millis() as u64,
            )
        }
    }
}
