//! System prompt assembly.

use crate::error::Result;
use crate::skills::SkillSource;

pub const SKILLS_HEADER: &str = "You have access to the following skills. View additional reference materials using tree(\".skills/{skill_name}\") and view(\".skills/{skill_name}/{file}\"):";

/// Instruction sources in precedence order. Every non-empty source is kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemSources {
    pub override_prompt: Option<String>,
    pub project_prompt: Option<String>,
    pub chat_prompt: Option<String>,
    pub skills: Vec<String>,
}

/// `override → project → chat → skills`, joined by blank lines.
///
/// Returns `None` when every source is empty. Fails if any selected skill
/// cannot be read.
pub async fn build_system_prompt(
    sources: &SystemSources,
    skill_source: &dyn SkillSource,
) -> Result<Option<String>> {
    let mut parts: Vec<String> = [
        &sources.override_prompt,
        &sources.project_prompt,
        &sources.chat_prompt,
    ]
    .into_iter()
    .flatten()
    .filter(|part| !part.trim().is_empty())
    .cloned()
    .collect();

    if let Some(section) = skills_section(&sources.skills, skill_source).await? {
        parts.push(section);
    }

    if parts.is_empty() {
        Ok(None)
    } else {
        Ok(Some(parts.join("\n\n")))
    }
}

async fn skills_section(names: &[String], skill_source: &dyn SkillSource) -> Result<Option<String>> {
    let mut seen = std::collections::HashSet::new();
    let names: Vec<&String> = names.iter().filter(|name| seen.insert(name.as_str())).collect();
    if names.is_empty() {
        return Ok(None);
    }

    let mut entries = vec![SKILLS_HEADER.to_string()];
    for name in names {
        let body = skill_source.read_skill(name).await?;
        tracing::debug!(skill = %name, content_length = body.len(), "skill loaded");
        entries.push(format_skill(name, &body));
    }
    Ok(Some(entries.join("\n\n")))
}

fn format_skill(name: &str, body: &str) -> String {
    format!(".skills/{name}/SKILL:\n```\n{body}\n```")
}
