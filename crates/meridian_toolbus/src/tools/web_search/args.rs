use serde::{Deserialize, Serialize};

pub const MAX_RESULTS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchTopic {
    #[default]
    General,
    News,
    Finance,
}

#[derive(Debug, Deserialize)]
pub struct WebSearchArgs {
    pub query: String,

    /// Number of results (default: 5, capped at 20)
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    #[serde(default)]
    pub topic: Option<SearchTopic>,
}

impl WebSearchArgs {
    pub fn effective_max_results(&self) -> usize {
        self.max_results.clamp(1, MAX_RESULTS)
    }
}

fn default_max_results() -> usize {
    5
}
