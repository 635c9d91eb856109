//! Turn engine: request intake, authorization and the per-turn executor.
//!
//! Every accepted turn gets its own tokio task running the state machine
//! in [`executor`]. The task is the only writer of the turn's block log;
//! readers go through the [`StreamHub`] or the durable store.

mod executor;
mod params;

use std::collections::HashMap;
use std::sync::Arc;

use meridian_core::{
    Block, BlockPayload, ChatDirectory, SqliteStore, Turn, TurnEvent, TurnId, TurnStatus, TurnStore,
};
use meridian_llms::{CapabilityRegistry, ProviderRegistry};
use meridian_observability::turn_span;
use meridian_toolbus::{DocumentStore, FormatterRegistry, ToolLimitResolver, ToolRegistry};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, warn};

use crate::authz::{OwnerAuthorizer, ResourceAuthorizer};
use crate::block_log::{BlockLog, run_store};
use crate::config::{AbandonPolicy, EngineConfig};
use crate::context::PromptComposer;
use crate::error::{Result, RuntimeError};
use crate::fanout::{StreamHub, Subscription};
use crate::skills::{DocumentSkillSource, SkillSource};

use executor::TurnExecutor;

/// Collaborators the engine runs against.
pub struct EngineDeps {
    pub store: Arc<dyn TurnStore>,
    pub chats: Arc<dyn ChatDirectory>,
    pub authorizer: Arc<dyn ResourceAuthorizer>,
    pub providers: Arc<ProviderRegistry>,
    pub capabilities: Arc<CapabilityRegistry>,
    pub tools: Arc<ToolRegistry>,
    pub formatters: Arc<FormatterRegistry>,
    pub skills: Arc<dyn SkillSource>,
    /// Per-user tool-round limits; `EngineConfig::max_tool_rounds` when absent.
    pub limits: Option<Arc<dyn ToolLimitResolver>>,
}

impl EngineDeps {
    /// One SQLite database for turns and chats, skills read from `documents`,
    /// owner-based authorization and the builtin capability table.
    pub fn new(
        store: Arc<SqliteStore>,
        documents: Arc<dyn DocumentStore>,
        providers: ProviderRegistry,
        tools: ToolRegistry,
    ) -> Result<Self> {
        let capabilities = CapabilityRegistry::load_builtin()
            .map_err(|e| RuntimeError::Config(format!("capability table: {e}")))?;
        let chats: Arc<dyn ChatDirectory> = store.clone();
        Ok(Self {
            store,
            authorizer: Arc::new(OwnerAuthorizer::new(Arc::clone(&chats))),
            chats,
            providers: Arc::new(providers),
            capabilities: Arc::new(capabilities),
            tools: Arc::new(tools),
            formatters: Arc::new(FormatterRegistry::with_document_formatters()),
            skills: Arc::new(DocumentSkillSource::new(documents)),
            limits: None,
        })
    }

    pub fn with_authorizer(mut self, authorizer: Arc<dyn ResourceAuthorizer>) -> Self {
        self.authorizer = authorizer;
        self
    }

    pub fn with_capabilities(mut self, capabilities: CapabilityRegistry) -> Self {
        self.capabilities = Arc::new(capabilities);
        self
    }

    pub fn with_limits(mut self, limits: Arc<dyn ToolLimitResolver>) -> Self {
        self.limits = Some(limits);
        self
    }
}

/// A user message to answer, with optional overrides for how to answer it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TurnRequest {
    pub message: String,
    /// Turn the new user turn follows; `None` starts a new branch root.
    #[serde(default)]
    pub prev_turn_id: Option<TurnId>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub reasoning: Option<String>,
    /// `None` offers every registered tool.
    #[serde(default)]
    pub tools: Option<Vec<String>>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub system_prompt: Option<String>,
}

impl TurnRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_prev_turn(mut self, prev_turn_id: TurnId) -> Self {
        self.prev_turn_id = Some(prev_turn_id);
        self
    }

    pub fn with_model(mut self, provider: impl Into<String>, model: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self.model = Some(model.into());
        self
    }

    pub fn with_tools(mut self, tools: Vec<String>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn with_skills(mut self, skills: Vec<String>) -> Self {
        self.skills = skills;
        self
    }

    pub fn with_reasoning(mut self, level: impl Into<String>) -> Self {
        self.reasoning = Some(level.into());
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }
}

/// A turn stored with its blocks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnView {
    pub turn: Turn,
    pub blocks: Vec<Block>,
}

struct HandleRelease {
    hub: StreamHub,
    turn_id: TurnId,
}

impl Drop for HandleRelease {
    fn drop(&mut self) {
        self.hub.release_handle(&self.turn_id);
    }
}

/// Caller's reference to a started turn.
///
/// Under [`AbandonPolicy::CancelWhenUnobserved`], dropping the handle while
/// no subscriber is attached cancels the turn.
pub struct TurnHandle {
    pub turn_id: TurnId,
    pub user_turn_id: TurnId,
    pub status: TurnStatus,
    cancel: CancellationToken,
    task: Option<JoinHandle<TurnStatus>>,
    _release: HandleRelease,
}

impl TurnHandle {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the turn to reach a terminal status.
    pub async fn finished(mut self) -> Result<TurnStatus> {
        match self.task.take() {
            Some(task) => task
                .await
                .map_err(|e| RuntimeError::Other(anyhow::anyhow!("turn task failed: {e}"))),
            None => Ok(self.status),
        }
    }
}

pub(crate) struct EngineInner {
    pub(crate) deps: EngineDeps,
    pub(crate) config: EngineConfig,
    pub(crate) log: Arc<BlockLog>,
    pub(crate) hub: StreamHub,
    pub(crate) composer: PromptComposer,
    running: Mutex<HashMap<TurnId, CancellationToken>>,
}

impl EngineInner {
    pub(crate) fn finished(&self, turn_id: &TurnId) {
        self.running.lock().remove(turn_id);
    }
}

#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

impl Engine {
    pub fn new(deps: EngineDeps, config: EngineConfig) -> Self {
        let log = Arc::new(BlockLog::new(Arc::clone(&deps.store), config.buffer_blocks));
        let hub = StreamHub::new(Arc::clone(&log), config.subscriber_capacity);
        let composer = PromptComposer::new(
            Arc::clone(&deps.skills),
            Arc::clone(&deps.formatters),
            Arc::clone(&deps.capabilities),
        );
        Self {
            inner: Arc::new(EngineInner {
                deps,
                config,
                log,
                hub,
                composer,
                running: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn capabilities(&self) -> &CapabilityRegistry {
        &self.inner.deps.capabilities
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.inner.deps.providers
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.inner.deps.tools
    }

    pub fn running_turns(&self) -> usize {
        self.inner.running.lock().len()
    }

    /// Record the user's message and start answering it.
    ///
    /// Authorization, parent validation and parameter resolution all happen
    /// before anything is persisted; a rejected request leaves no trace.
    pub async fn start_turn(&self, user_id: &str, chat_id: &str, request: TurnRequest) -> Result<TurnHandle> {
        self.inner
            .deps
            .authorizer
            .can_access_chat(user_id, chat_id)
            .await?;

        if request.message.trim().is_empty() {
            return Err(RuntimeError::InvalidRequest("message is empty".to_string()));
        }
        if let Some(prev_turn_id) = &request.prev_turn_id {
            let parent = self.load_turn(prev_turn_id).await?;
            if parent.chat_id != chat_id {
                return Err(RuntimeError::InvalidRequest(format!(
                    "turn {prev_turn_id} belongs to another chat"
                )));
            }
        }

        let deps = &self.inner.deps;
        let params = params::resolve_params(&request, &self.inner.config, &deps.capabilities, &deps.tools)?;
        if !deps.providers.contains(&params.provider) {
            return Err(RuntimeError::InvalidRequest(format!(
                "provider '{}' is not configured",
                params.provider
            )));
        }

        let user_turn = Turn::user(chat_id, request.prev_turn_id.clone());
        let turn = Turn::assistant(chat_id, user_turn.id.clone(), params.clone());
        let span = turn_span!(turn.id, "start");

        // The channel exists before the id is visible to anyone
        self.inner.hub.open(&turn.id);
        let persisted = {
            let user_turn = user_turn.clone();
            let assistant = turn.clone();
            let message = request.message.clone();
            run_store(&deps.store, &turn.id, "insert_turn", move |store, _| {
                store.insert_turn(&user_turn)?;
                store.append_block(&Block::new(user_turn.id.clone(), 1, BlockPayload::text(message)))?;
                store.insert_turn(&assistant)
            })
            .instrument(span.clone())
            .await
        };
        if let Err(e) = persisted {
            self.inner.hub.close(
                &turn.id,
                TurnEvent::TurnError {
                    turn_id: turn.id.clone(),
                    status: TurnStatus::Failed,
                    reason: e.failure_reason(),
                    error: e.to_string(),
                    is_cancelled: false,
                    last_sequence: None,
                },
            );
            return Err(e);
        }

        let cancel = CancellationToken::new();
        self.inner
            .running
            .lock()
            .insert(turn.id.clone(), cancel.clone());
        if self.inner.config.abandon_policy == AbandonPolicy::CancelWhenUnobserved {
            self.inner.hub.watch_abandonment(&turn.id, cancel.clone());
        }
        self.inner.hub.publish(
            &turn.id,
            TurnEvent::turn_start(turn.id.clone(), &params.provider, &params.model),
        );

        span.in_scope(|| {
            info!(
                chat.id = %chat_id,
                provider = %params.provider,
                model = %params.model,
                tools = params.tools.len(),
                "turn accepted"
            )
        });

        let turn_id = turn.id.clone();
        let executor = TurnExecutor::new(Arc::clone(&self.inner), turn, user_id, cancel.clone());
        let task = tokio::spawn(executor.run());

        Ok(TurnHandle {
            turn_id: turn_id.clone(),
            user_turn_id: user_turn.id,
            status: TurnStatus::Pending,
            cancel,
            task: Some(task),
            _release: HandleRelease {
                hub: self.inner.hub.clone(),
                turn_id,
            },
        })
    }

    /// Request cancellation. Terminal turns are left as they are.
    pub async fn cancel_turn(&self, user_id: &str, turn_id: &TurnId) -> Result<TurnStatus> {
        let turn = self.authorized_turn(user_id, turn_id).await?;
        if turn.is_terminal() {
            return Ok(turn.status);
        }
        let token = self.inner.running.lock().get(turn_id).cloned();
        match token {
            Some(token) => {
                info!(turn.id = %turn_id, "cancellation requested");
                token.cancel();
            }
            None => warn!(turn.id = %turn_id, status = %turn.status, "turn is not running in this process"),
        }
        Ok(turn.status)
    }

    /// Replay the turn after `last_seen` and follow it until it ends.
    pub async fn subscribe(&self, user_id: &str, turn_id: &TurnId, last_seen: u64) -> Result<Subscription> {
        self.authorized_turn(user_id, turn_id).await?;
        self.inner.hub.subscribe(turn_id, last_seen).await
    }

    pub async fn get_turn(&self, user_id: &str, turn_id: &TurnId) -> Result<TurnView> {
        let turn = self.authorized_turn(user_id, turn_id).await?;
        let blocks = self.inner.log.replay(turn_id, 0).await?;
        Ok(TurnView { turn, blocks })
    }

    /// Turns of a chat in creation order.
    pub async fn chat_turns(&self, user_id: &str, chat_id: &str) -> Result<Vec<Turn>> {
        self.inner
            .deps
            .authorizer
            .can_access_chat(user_id, chat_id)
            .await?;
        let store = Arc::clone(&self.inner.deps.store);
        let chat_id = chat_id.to_string();
        tokio::task::spawn_blocking(move || store.chat_turns(&chat_id))
            .await
            .map_err(|e| RuntimeError::Storage(format!("chat_turns task failed: {e}")))?
            .map_err(RuntimeError::from)
    }

    async fn load_turn(&self, turn_id: &TurnId) -> Result<Turn> {
        run_store(&self.inner.deps.store, turn_id, "get_turn", |store, id| store.get_turn(id))
            .await?
            .ok_or_else(|| RuntimeError::NotFound(format!("turn {turn_id}")))
    }

    async fn authorized_turn(&self, user_id: &str, turn_id: &TurnId) -> Result<Turn> {
        let turn = self.load_turn(turn_id).await?;
        self.inner
            .deps
            .authorizer
            .can_access_chat(user_id, &turn.chat_id)
            .await?;
        Ok(turn)
    }
}
