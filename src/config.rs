use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = ".smartmerge.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("GitHub token not found. Set GITHUB_TOKEN or [github].token in {DEFAULT_CONFIG_FILE}")]
    MissingGithubToken,

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration loaded from .smartmerge.toml.
///
/// Every section is optional. Secrets may come from the environment
/// (GITHUB_TOKEN, OPENAI_API_KEY) and are resolved once, in [`Config::load`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// GitHub API token. If None, falls back to GITHUB_TOKEN env var.
    pub token: Option<String>,
    pub api_base_url: String,
    /// Page size for the pull-request listing
    pub per_page: u32,
    /// Pause when fewer than this many requests remain in the quota window
    pub rate_limit_threshold: u32,
    pub rate_limit_pause_secs: u64,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_base_url: "https://api.github.com".to_string(),
            per_page: 100,
            rate_limit_threshold: 10,
            rate_limit_pause_secs: 60,
        }
    }
}

/// Which embedding implementation backs the vector index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    #[default]
    OpenAi,
    Local,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// API key for the chat and embedding endpoints. Falls back to OPENAI_API_KEY.
    pub api_key: Option<String>,
    pub base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub embedding_backend: EmbeddingBackend,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            chat_model: "gpt-4o".to_string(),
            embedding_model: "text-embedding-3-large".to_string(),
            embedding_backend: EmbeddingBackend::OpenAi,
            timeout_secs: 60,
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root for raw PR JSON, embeddings and processed CSV files
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Closed-PR chunks retrieved per open PR
    pub top_k: usize,
    /// Character limit for free-text fields in formatted PR text
    pub truncate_len: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
            top_k: 4,
            truncate_len: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from .smartmerge.toml in the current
    /// directory when no path is given. A missing default file yields the
    /// default config. Environment secrets fill any token left unset.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load_from(default_path)?
                } else {
                    Config::default()
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from a specific path without consulting the environment.
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Fill unset secrets from a variable lookup (the process environment in production).
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.github.token.is_none() {
            self.github.token = lookup("GITHUB_TOKEN").filter(|t| !t.trim().is_empty());
        }
        if self.llm.api_key.is_none() {
            self.llm.api_key = lookup("OPENAI_API_KEY").filter(|k| !k.trim().is_empty());
        }
    }

    /// Startup checks for commands that talk to GitHub. The LLM key is not
    /// required here; it is reported on the first model call.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.github.token.is_none() {
            return Err(ConfigError::MissingGithubToken);
        }
        if self.github.per_page == 0 {
            return Err(ConfigError::Invalid("github.per_page must be positive".to_string()));
        }
        self.validate_retrieval()
    }

    /// Checks for commands that only work on stored data.
    pub fn validate_retrieval(&self) -> Result<(), ConfigError> {
        if self.retrieval.chunk_size == 0 {
            return Err(ConfigError::Invalid("retrieval.chunk_size must be positive".to_string()));
        }
        if self.retrieval.chunk_overlap >= self.retrieval.chunk_size {
            return Err(ConfigError::Invalid(format!(
                "retrieval.chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.retrieval.chunk_overlap, self.retrieval.chunk_size
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_token() -> Config {
        let mut config = Config::default();
        config.github.token = Some("ghp_test".to_string());
        config
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.github.token.is_none());
        assert_eq!(config.github.per_page, 100);
        assert_eq!(config.github.rate_limit_threshold, 10);
        assert_eq!(config.retrieval.chunk_size, 500);
        assert_eq!(config.retrieval.chunk_overlap, 50);
        assert_eq!(config.llm.embedding_backend, EmbeddingBackend::OpenAi);
        assert_eq!(config.storage.data_dir, PathBuf::from("data"));
    }

    #[test]
    fn test_parse_config_toml() {
        let toml_str = r#"
[github]
api_base_url = "http://localhost:9999"

[llm]
chat_model = "gpt-4o-mini"
embedding_backend = "local"

[retrieval]
top_k = 2
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.github.api_base_url, "http://localhost:9999");
        assert_eq!(config.github.per_page, 100);
        assert_eq!(config.llm.chat_model, "gpt-4o-mini");
        assert_eq!(config.llm.embedding_backend, EmbeddingBackend::Local);
        assert_eq!(config.retrieval.top_k, 2);
        assert_eq!(config.retrieval.chunk_size, 500);
    }

    #[test]
    fn test_env_fills_missing_secrets_only() {
        let mut config = Config::default();
        config.llm.api_key = Some("from-file".to_string());
        config.apply_env(|key| match key {
            "GITHUB_TOKEN" => Some("from-env".to_string()),
            "OPENAI_API_KEY" => Some("ignored".to_string()),
            _ => None,
        });
        assert_eq!(config.github.token.as_deref(), Some("from-env"));
        assert_eq!(config.llm.api_key.as_deref(), Some("from-file"));
    }

    #[test]
    fn test_blank_env_token_is_ignored() {
        let mut config = Config::default();
        config.apply_env(|_| Some("  ".to_string()));
        assert!(config.github.token.is_none());
    }

    #[test]
    fn test_validate_requires_github_token() {
        let config = Config::default();
        assert!(matches!(config.validate(), Err(ConfigError::MissingGithubToken)));
        assert!(with_token().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_overlap_not_smaller_than_size() {
        let mut config = with_token();
        config.retrieval.chunk_overlap = 500;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_retrieval_does_not_need_token() {
        assert!(Config::default().validate_retrieval().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("smartmerge.toml");
        std::fs::write(&path, "[storage]\ndata_dir = \"out\"\n").unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.storage.data_dir, PathBuf::from("out"));
    }
}
