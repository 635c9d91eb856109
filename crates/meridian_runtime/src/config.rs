//! Engine configuration

use std::str::FromStr;
use std::time::Duration;

use meridian_llms::RetryPolicy;

pub const DEFAULT_PROVIDER: &str = "anthropic";
pub const DEFAULT_MODEL: &str = "claude-haiku-4-5-20251001";

/// What happens to a running turn once nobody is watching it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AbandonPolicy {
    /// Keep running until a terminal state; the log stays replayable.
    #[default]
    RunToCompletion,
    /// Cancel when the `TurnHandle` is dropped and the last subscriber leaves.
    CancelWhenUnobserved,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Provider used when a request names none.
    pub default_provider: String,
    /// Model used when a request names none.
    pub default_model: String,
    /// Tool rounds per turn when the limit resolver has no answer.
    pub max_tool_rounds: usize,
    /// Output token budget before clamping to the model's limit.
    pub max_tokens: u32,
    /// Most recent blocks kept in memory per running turn.
    pub buffer_blocks: usize,
    /// Queued events per subscriber before it is disconnected.
    pub subscriber_capacity: usize,
    /// Total connection attempts to the provider, first one included.
    pub connect_retries: u32,
    pub retry_base_delay: Duration,
    pub tool_timeout: Duration,
    pub abandon_policy: AbandonPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_provider: DEFAULT_PROVIDER.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            max_tool_rounds: 5,
            max_tokens: 8192,
            buffer_blocks: 256,
            subscriber_capacity: 64,
            connect_retries: 3,
            retry_base_delay: Duration::from_millis(500),
            tool_timeout: Duration::from_secs(60),
            abandon_policy: AbandonPolicy::default(),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_provider(mut self, provider: impl Into<String>) -> Self {
        self.default_provider = provider.into();
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_buffer_blocks(mut self, blocks: usize) -> Self {
        self.buffer_blocks = blocks.max(1);
        self
    }

    pub fn with_subscriber_capacity(mut self, capacity: usize) -> Self {
        self.subscriber_capacity = capacity.max(1);
        self
    }

    pub fn with_retry(mut self, attempts: u32, base_delay: Duration) -> Self {
        self.connect_retries = attempts.max(1);
        self.retry_base_delay = base_delay;
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    pub fn with_abandon_policy(mut self, policy: AbandonPolicy) -> Self {
        self.abandon_policy = policy;
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.connect_retries, self.retry_base_delay)
    }

    /// Load configuration from `MERIDIAN_*` environment variables.
    ///
    /// Unparseable values are ignored with a warning and keep the default.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(provider) = std::env::var("MERIDIAN_DEFAULT_PROVIDER") {
            config.default_provider = provider;
        }
        if let Ok(model) = std::env::var("MERIDIAN_DEFAULT_MODEL") {
            config.default_model = model;
        }
        if let Some(rounds) = env_parse("MERIDIAN_MAX_TOOL_ROUNDS") {
            config.max_tool_rounds = rounds;
        }
        if let Some(max_tokens) = env_parse("MERIDIAN_MAX_TOKENS") {
            config.max_tokens = max_tokens;
        }
        if let Some(blocks) = env_parse::<usize>("MERIDIAN_BUFFER_BLOCKS") {
            config.buffer_blocks = blocks.max(1);
        }
        if let Some(capacity) = env_parse::<usize>("MERIDIAN_SUBSCRIBER_CAPACITY") {
            config.subscriber_capacity = capacity.max(1);
        }
        if let Some(retries) = env_parse::<u32>("MERIDIAN_CONNECT_RETRIES") {
            config.connect_retries = retries.max(1);
        }
        if let Some(base_ms) = env_parse("MERIDIAN_RETRY_BASE_MS") {
            config.retry_base_delay = Duration::from_millis(base_ms);
        }
        if let Some(secs) = env_parse("MERIDIAN_TOOL_TIMEOUT_SECS") {
            config.tool_timeout = Duration::from_secs(secs);
        }

        config
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(env.key = key, env.value = %raw, "ignoring unparseable configuration value");
            None
        }
    }
}
