use serde::Deserialize;

pub const MAX_DEPTH: usize = 5;

#[derive(Debug, Deserialize)]
pub struct DocTreeArgs {
    /// Folder to start from (default: root)
    #[serde(default = "default_folder")]
    pub folder: String,

    /// Folder levels to descend (default: 2, max: 5)
    #[serde(default = "default_depth")]
    pub depth: usize,
}

impl DocTreeArgs {
    pub fn effective_depth(&self) -> usize {
        self.depth.clamp(1, MAX_DEPTH)
    }
}

fn default_folder() -> String {
    "/".to_string()
}

fn default_depth() -> usize {
    2
}
