use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditCommand {
    /// Replace exactly one occurrence of `old_str` with `new_str`
    StrReplace,
    /// Insert `new_str` after line `insert_line` (0 = top of the document)
    Insert,
    /// Append `new_str` at the end of the document
    Append,
    /// Create a new document holding `file_text`
    Create,
}

#[derive(Debug, Deserialize)]
pub struct DocEditArgs {
    pub command: EditCommand,

    pub path: String,

    #[serde(default)]
    pub old_str: Option<String>,

    #[serde(default)]
    pub new_str: Option<String>,

    #[serde(default)]
    pub insert_line: Option<usize>,

    #[serde(default)]
    pub file_text: Option<String>,
}
