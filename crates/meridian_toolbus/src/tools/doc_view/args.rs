use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct DocViewArgs {
    /// Document or folder path; `/` lists the workspace root
    pub path: String,
}
