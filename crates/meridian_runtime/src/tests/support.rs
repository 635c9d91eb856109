//! Scripted provider and engine harness shared by the engine tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use meridian_core::{ChatRecord, ProjectRecord, SqliteStore, TurnEvent, TurnId};
use meridian_llms::{
    CapabilityRegistry, Error, FinishReason, FinishReasonKind, GenerateRequest, GenerateResponse,
    GenerateStream, Provider, ProviderRegistry, StreamEvent, Usage,
};
use meridian_toolbus::{DocumentStore, FsDocumentStore, Tool, ToolLimitResolver, ToolRegistry, ToolResult};
use parking_lot::Mutex;
use serde_json::{Value as JsonValue, json};
use tempfile::TempDir;

use crate::{Engine, EngineConfig, EngineDeps, Subscription, TurnRequest, TurnView};

pub(crate) const USER: &str = "user-1";
pub(crate) const CHAT: &str = "chat-1";
pub(crate) const PROVIDER: &str = "scripted";
pub(crate) const MODEL: &str = "scripted-1";

const SCRIPTED_CAPABILITIES: &str = r#"
provider: scripted
version: "1"
models:
  - id: scripted-1
    display_name: Scripted
    supports_tools: true
    supports_thinking: true
    context_window: 200000
    max_output: 8192
"#;

/// One canned provider response.
pub(crate) enum Reply {
    /// Stream these events, then end.
    Events(Vec<Result<StreamEvent, Error>>),
    /// Stream these events, then never finish.
    Hang(Vec<StreamEvent>),
    /// Refuse to open the stream.
    Reject(Error),
}

pub(crate) fn text_reply(text: &str) -> Reply {
    text_reply_with_usage(text, Usage::new(10, 5))
}

pub(crate) fn text_reply_with_usage(text: &str, usage: Usage) -> Reply {
    Reply::Events(vec![
        Ok(StreamEvent::start("gen-text")),
        Ok(StreamEvent::text_delta("gen-text", text)),
        Ok(StreamEvent::finish(usage, FinishReason::stop())),
    ])
}

pub(crate) fn tool_reply(preamble: &str, call_id: &str, tool: &str, args: JsonValue) -> Reply {
    tool_reply_with_usage(preamble, call_id, tool, args, Usage::new(10, 5))
}

pub(crate) fn tool_reply_with_usage(
    preamble: &str,
    call_id: &str,
    tool: &str,
    args: JsonValue,
    usage: Usage,
) -> Reply {
    let mut events = vec![Ok(StreamEvent::start("gen-tool"))];
    if !preamble.is_empty() {
        events.push(Ok(StreamEvent::text_delta("gen-tool", preamble)));
    }
    events.extend([
        Ok(StreamEvent::tool_call_start(call_id, tool)),
        Ok(StreamEvent::tool_call_delta(call_id, args.to_string())),
        Ok(StreamEvent::tool_call_end(call_id, tool, args)),
        Ok(StreamEvent::finish(
            usage,
            FinishReason::new(FinishReasonKind::ToolCalls),
        )),
    ]);
    Reply::Events(events)
}

/// Plays back replies in order and records every request it receives.
pub(crate) struct ScriptedProvider {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<GenerateRequest>>,
}

impl ScriptedProvider {
    pub(crate) fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn provider_id(&self) -> &str {
        PROVIDER
    }

    async fn generate(&self, _request: GenerateRequest) -> meridian_llms::Result<GenerateResponse> {
        Err(Error::Other("scripted provider only streams".to_string()))
    }

    async fn stream(&self, request: GenerateRequest) -> meridian_llms::Result<GenerateStream> {
        self.requests.lock().push(request);
        let reply = self.replies.lock().pop_front();
        match reply {
            Some(Reply::Events(events)) => Ok(GenerateStream::from_events(events)),
            Some(Reply::Hang(events)) => {
                let events = futures::stream::iter(events.into_iter().map(Ok));
                let stream = futures::StreamExt::chain(events, futures::stream::pending());
                Ok(GenerateStream::new(Box::pin(stream)))
            }
            Some(Reply::Reject(error)) => Err(error),
            None => Err(Error::Other("no scripted reply left".to_string())),
        }
    }
}

/// A tool whose backend is always down.
pub(crate) struct OfflineTool;

#[async_trait]
impl Tool for OfflineTool {
    fn name(&self) -> &'static str {
        "archive_lookup"
    }

    fn description(&self) -> &'static str {
        "Look up a manuscript in the archive"
    }

    fn parameters_schema(&self) -> JsonValue {
        json!({"type": "object", "properties": {"title": {"type": "string"}}})
    }

    async fn execute(&self, _args: JsonValue) -> ToolResult {
        Err(anyhow::anyhow!("archive index is offline"))
    }
}

pub(crate) struct Harness {
    pub engine: Engine,
    pub store: Arc<SqliteStore>,
    pub provider: Arc<ScriptedProvider>,
    _docs: TempDir,
}

impl Harness {
    pub(crate) fn new(replies: Vec<Reply>) -> Self {
        Self::with_config(replies, EngineConfig::default())
    }

    pub(crate) fn with_config(replies: Vec<Reply>, config: EngineConfig) -> Self {
        Self::build(replies, config, None, 1)
    }

    pub(crate) fn with_limits(replies: Vec<Reply>, limits: Arc<dyn ToolLimitResolver>) -> Self {
        Self::build(replies, EngineConfig::default(), Some(limits), 1)
    }

    /// Connection attempts per model call, with a 1ms base backoff.
    pub(crate) fn with_connect_attempts(replies: Vec<Reply>, attempts: u32) -> Self {
        Self::build(replies, EngineConfig::default(), None, attempts)
    }

    fn build(
        replies: Vec<Reply>,
        config: EngineConfig,
        limits: Option<Arc<dyn ToolLimitResolver>>,
        connect_attempts: u32,
    ) -> Self {
        let docs = TempDir::new().unwrap();
        std::fs::create_dir_all(docs.path().join("characters")).unwrap();
        std::fs::write(
            docs.path().join("characters/aria"),
            "Aria keeps the lighthouse on the north cliff.",
        )
        .unwrap();

        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        store
            .upsert_project(&ProjectRecord::new("proj-1", USER, "Novel"))
            .unwrap();
        store
            .upsert_chat(&ChatRecord::new(CHAT, "proj-1", USER, "Draft").with_system_prompt("You are a helpful assistant."))
            .unwrap();

        let documents: Arc<dyn DocumentStore> = Arc::new(FsDocumentStore::new(docs.path()));
        let tools = ToolRegistry::builder()
            .with_document_tools(Arc::clone(&documents))
            .with_tool(OfflineTool)
            .build();
        let provider = Arc::new(ScriptedProvider::new(replies));
        let providers = ProviderRegistry::new().register_arc(PROVIDER, provider.clone());
        let capabilities = CapabilityRegistry::from_yaml_documents(&[SCRIPTED_CAPABILITIES]).unwrap();

        let mut deps = EngineDeps::new(Arc::clone(&store), documents, providers, tools)
            .unwrap()
            .with_capabilities(capabilities);
        if let Some(limits) = limits {
            deps = deps.with_limits(limits);
        }
        let config = config
            .with_default_provider(PROVIDER)
            .with_default_model(MODEL)
            .with_retry(connect_attempts, Duration::from_millis(1));

        Self {
            engine: Engine::new(deps, config),
            store,
            provider,
            _docs: docs,
        }
    }

    /// Start a turn, follow it to the end and return what was observed.
    pub(crate) async fn run(&self, request: TurnRequest) -> Observed {
        let handle = self.engine.start_turn(USER, CHAT, request).await.unwrap();
        let subscription = self.engine.subscribe(USER, &handle.turn_id, 0).await.unwrap();
        let events = collect(subscription).await;
        let view = self.engine.get_turn(USER, &handle.turn_id).await.unwrap();
        Observed {
            turn_id: handle.turn_id.clone(),
            user_turn_id: handle.user_turn_id.clone(),
            events,
            view,
        }
    }
}

pub(crate) struct Observed {
    pub turn_id: TurnId,
    pub user_turn_id: TurnId,
    pub events: Vec<TurnEvent>,
    pub view: TurnView,
}

impl Observed {
    pub(crate) fn terminal(&self) -> &TurnEvent {
        self.events.last().expect("stream ended without events")
    }

    /// Sequences of the committed blocks seen on the stream.
    pub(crate) fn streamed_sequences(&self) -> Vec<u64> {
        self.events.iter().filter_map(TurnEvent::sequence).collect()
    }
}

pub(crate) async fn collect(mut subscription: Subscription) -> Vec<TurnEvent> {
    let mut events = Vec::new();
    let deadline = Duration::from_secs(5);
    loop {
        match tokio::time::timeout(deadline, subscription.next()).await {
            Ok(Some(event)) => events.push(event),
            Ok(None) => return events,
            Err(_) => panic!("turn stream stalled; events so far: {events:?}"),
        }
    }
}
