//! Skill bundles: named instruction documents under `.skills/{name}/`.

use std::sync::Arc;

use async_trait::async_trait;
use meridian_toolbus::DocumentStore;

use crate::error::{Result, RuntimeError};

/// Folder holding one sub-folder per skill.
pub const SKILLS_FOLDER: &str = ".skills";

/// Source of skill bodies for prompt composition.
#[async_trait]
pub trait SkillSource: Send + Sync {
    /// Body of the skill's `SKILL` document. Missing or unreadable skills are
    /// errors; callers never silently skip them.
    async fn read_skill(&self, name: &str) -> Result<String>;
}

/// Reads `.skills/{name}/SKILL`, falling back to `SKILL.md`, from a document store.
pub struct DocumentSkillSource {
    store: Arc<dyn DocumentStore>,
}

impl DocumentSkillSource {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub fn skill_path(name: &str) -> String {
        format!("/{SKILLS_FOLDER}/{name}/SKILL")
    }
}

#[async_trait]
impl SkillSource for DocumentSkillSource {
    async fn read_skill(&self, name: &str) -> Result<String> {
        if name.is_empty() || name.contains('/') || name == ".." {
            return Err(RuntimeError::Composition(format!("invalid skill name '{name}'")));
        }

        let primary = Self::skill_path(name);
        for path in [primary.clone(), format!("{primary}.md")] {
            match self.store.get_document(&path).await {
                Ok(Some(document)) => return Ok(document.content),
                Ok(None) => continue,
                Err(e) => {
                    return Err(RuntimeError::Composition(format!(
                        "skill '{name}' could not be read: {e}"
                    )));
                }
            }
        }

        Err(RuntimeError::Composition(format!(
            "skill '{name}' not found at {primary}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_toolbus::FsDocumentStore;
    use tempfile::TempDir;

    fn store_with_skills() -> (TempDir, DocumentSkillSource) {
        let dir = TempDir::new().unwrap();
        let skills = dir.path().join(".skills");
        std::fs::create_dir_all(skills.join("critique")).unwrap();
        std::fs::create_dir_all(skills.join("outline")).unwrap();
        std::fs::write(skills.join("critique/SKILL"), "Point out weak verbs.").unwrap();
        std::fs::write(skills.join("outline/SKILL.md"), "Use three acts.").unwrap();
        let store: Arc<dyn DocumentStore> = Arc::new(FsDocumentStore::new(dir.path()));
        (dir, DocumentSkillSource::new(store))
    }

    #[tokio::test]
    async fn test_reads_skill_document() {
        let (_dir, source) = store_with_skills();
        assert_eq!(source.read_skill("critique").await.unwrap(), "Point out weak verbs.");
    }

    #[tokio::test]
    async fn test_falls_back_to_markdown_name() {
        let (_dir, source) = store_with_skills();
        assert_eq!(source.read_skill("outline").await.unwrap(), "Use three acts.");
    }

    #[tokio::test]
    async fn test_missing_skill_is_composition_error() {
        let (_dir, source) = store_with_skills();
        let err = source.read_skill("pacing").await.unwrap_err();
        assert!(matches!(err, RuntimeError::Composition(_)));
        assert!(err.to_string().contains("pacing"));
    }

    #[tokio::test]
    async fn test_rejects_path_like_names() {
        let (_dir, source) = store_with_skills();
        assert!(source.read_skill("../secrets").await.is_err());
    }
}
