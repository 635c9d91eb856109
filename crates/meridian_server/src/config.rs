//! Server configuration

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use meridian_core::db::{MERIDIAN_DB, MERIDIAN_DIR};

const DEFAULT_PORT: u16 = 8080;
const DOCS_DIR: &str = "docs";
const DEFAULT_KEEPALIVE_SECS: u64 = 15;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub db_path: PathBuf,
    /// Root of the filesystem document store backing tools and skills.
    pub docs_root: PathBuf,
    pub sse_keepalive: Duration,
    /// Allowed browser origins; empty allows any.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            db_path: Path::new(MERIDIAN_DIR).join(MERIDIAN_DB),
            docs_root: Path::new(MERIDIAN_DIR).join(DOCS_DIR),
            sse_keepalive: Duration::from_secs(DEFAULT_KEEPALIVE_SECS),
            cors_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = path.into();
        self
    }

    pub fn with_docs_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.docs_root = root.into();
        self
    }

    pub fn with_sse_keepalive(mut self, interval: Duration) -> Self {
        self.sse_keepalive = interval;
        self
    }

    /// Load from `PORT`, `MERIDIAN_*` and `CORS_ORIGINS` (comma separated).
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(port) = env_parse("PORT") {
            config.port = port;
        }
        if let Ok(path) = std::env::var("MERIDIAN_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }
        if let Ok(root) = std::env::var("MERIDIAN_DOCS_ROOT") {
            config.docs_root = PathBuf::from(root);
        }
        if let Some(secs) = env_parse::<u64>("MERIDIAN_SSE_KEEPALIVE_SECS") {
            config.sse_keepalive = Duration::from_secs(secs.max(1));
        }
        if let Ok(origins) = std::env::var("CORS_ORIGINS") {
            config.cors_origins = parse_origins(&origins);
        }

        config
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty() && *origin != "*")
        .map(str::to_string)
        .collect()
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.db_path, PathBuf::from(".meridian/meridian.db"));
        assert_eq!(config.docs_root, PathBuf::from(".meridian/docs"));
        assert_eq!(config.sse_keepalive, Duration::from_secs(15));
        assert!(config.cors_origins.is_empty());
    }

    #[test]
    fn test_parse_origins_skips_blanks_and_wildcard() {
        assert_eq!(
            parse_origins("https://app.example.com, ,*,http://localhost:5173"),
            vec!["https://app.example.com", "http://localhost:5173"]
        );
    }
}
