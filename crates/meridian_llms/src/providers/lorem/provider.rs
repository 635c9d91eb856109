//! Lorem provider implementation

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::provider::Provider;
use crate::types::{
    FinishReason, FinishReasonKind, GenerateRequest, GenerateResponse, GenerateStream, Message,
    ResponseContent, StreamEvent, Usage,
};

const WORDS: &[&str] = &[
    "lorem", "ipsum", "dolor", "sit", "amet", "consectetur", "adipiscing", "elit", "sed", "do",
    "eiusmod", "tempor", "incididunt", "ut", "labore", "et", "dolore", "magna", "aliqua", "enim",
    "ad", "minim", "veniam", "quis", "nostrud", "exercitation", "ullamco", "laboris", "nisi",
    "aliquip", "ex", "ea", "commodo", "consequat", "duis", "aute", "irure", "in", "reprehenderit",
    "voluptate", "velit", "esse", "cillum", "fugiat", "nulla", "pariatur", "excepteur", "sint",
    "occaecat", "cupidatat", "non", "proident", "sunt", "culpa", "qui", "officia", "deserunt",
    "mollit", "anim", "id", "est", "laborum",
];

/// Words in a normal (uncut) answer
const ANSWER_WORDS: u32 = 60;
/// Words in the leading thinking segment
const THINKING_WORDS: u32 = 10;
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Offline provider that streams deterministic lorem ipsum.
///
/// Model names select behavior: `slow`, `fast` and `medium` set the pace,
/// `cutoff` or `small` models run into `max_tokens` and finish with
/// `length`. A reasoning level produces a short thinking segment first.
#[derive(Debug, Clone, Default)]
pub struct LoremProvider {
    delay: Option<Duration>,
}

impl LoremProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fixed per-word delay, overriding the model-derived pace.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn word_delay(&self, model: &str) -> Duration {
        if let Some(delay) = self.delay {
            return delay;
        }
        if model.contains("slow") {
            Duration::from_millis(500)
        } else if model.contains("fast") {
            Duration::from_millis(33)
        } else {
            Duration::from_millis(100)
        }
    }

    fn check_model(&self, model: &str) -> Result<()> {
        if self.supports_model(model) {
            Ok(())
        } else {
            Err(Error::UnsupportedModel {
                provider: "lorem".to_string(),
                model: model.to_string(),
            })
        }
    }
}

fn is_cutoff_model(model: &str) -> bool {
    model.contains("cutoff") || model.contains("small")
}

fn seed_for(request: &GenerateRequest) -> u64 {
    let mut hasher = DefaultHasher::new();
    request.model.hash(&mut hasher);
    for msg in &request.messages {
        msg.text().hash(&mut hasher);
    }
    hasher.finish()
}

/// `count` words starting at a seed-derived offset into the word list.
fn words(seed: u64, count: u32) -> Vec<&'static str> {
    let start = (seed % WORDS.len() as u64) as usize;
    (0..count as usize)
        .map(|i| WORDS[(start + i * 7) % WORDS.len()])
        .collect()
}

fn estimate_input_tokens(messages: &[Message]) -> u32 {
    messages
        .iter()
        .filter_map(Message::text)
        .map(|t| t.split_whitespace().count() as u32)
        .sum()
}

/// Planned output for one request
struct Script {
    thinking: Vec<&'static str>,
    answer: Vec<&'static str>,
    reason: FinishReason,
    usage: Usage,
}

fn script(request: &GenerateRequest) -> Script {
    let seed = seed_for(request);
    let max_tokens = request.options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS);

    let thinking = if request.options.reasoning.is_some() {
        words(seed.rotate_left(17), THINKING_WORDS.min(max_tokens))
    } else {
        Vec::new()
    };
    let budget = max_tokens.saturating_sub(thinking.len() as u32);

    let (count, reason) = if is_cutoff_model(&request.model) {
        (budget, FinishReason::with_raw(FinishReasonKind::Length, "max_tokens"))
    } else if ANSWER_WORDS > budget {
        (budget, FinishReason::with_raw(FinishReasonKind::Length, "max_tokens"))
    } else {
        (ANSWER_WORDS, FinishReason::with_raw(FinishReasonKind::Stop, "end_turn"))
    };
    let answer = words(seed, count);

    let usage = Usage::new(
        estimate_input_tokens(&request.messages),
        (thinking.len() + answer.len()) as u32,
    );
    Script {
        thinking,
        answer,
        reason,
        usage,
    }
}

#[async_trait]
impl Provider for LoremProvider {
    fn provider_id(&self) -> &str {
        "lorem"
    }

    fn supports_model(&self, model: &str) -> bool {
        model.starts_with("lorem-")
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        Ok(vec![
            "lorem-fast".to_string(),
            "lorem-slow".to_string(),
            "lorem-cutoff".to_string(),
        ])
    }

    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse> {
        self.check_model(&request.model)?;
        let script = script(&request);

        let mut content = Vec::new();
        if !script.thinking.is_empty() {
            content.push(ResponseContent::Reasoning {
                reasoning: script.thinking.join(" "),
                signature: None,
            });
        }
        content.push(ResponseContent::Text {
            text: script.answer.join(" "),
        });

        Ok(GenerateResponse {
            id: format!("lorem-{}", Uuid::new_v4()),
            model: request.model,
            content,
            finish_reason: script.reason,
            usage: script.usage,
        })
    }

    async fn stream(&self, request: GenerateRequest) -> Result<GenerateStream> {
        self.check_model(&request.model)?;
        let delay = self.word_delay(&request.model);
        let script = script(&request);
        let id = format!("lorem-{}", Uuid::new_v4());

        let stream = async_stream::stream! {
            yield Ok(StreamEvent::start(id.clone()));

            for word in &script.thinking {
                tokio::time::sleep(delay).await;
                yield Ok(StreamEvent::reasoning_delta(id.clone(), format!("{word} ")));
            }

            for (i, word) in script.answer.iter().enumerate() {
                tokio::time::sleep(delay).await;
                let delta = if i == 0 { (*word).to_string() } else { format!(" {word}") };
                yield Ok(StreamEvent::text_delta(id.clone(), delta));
            }

            yield Ok(StreamEvent::finish(script.usage, script.reason.clone()));
        };

        Ok(GenerateStream::new(Box::pin(stream)))
    }
}
