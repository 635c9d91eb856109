use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct DocSearchArgs {
    pub query: String,

    /// Restrict the search to this folder and its subfolders
    #[serde(default)]
    pub folder: Option<String>,

    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    20
}
