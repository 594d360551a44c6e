//! TOML configuration.
//!
//! Every section is optional; omitted values fall back to the defaults
//! below. See `config/analyst.example.toml` for a full example.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub documents: DocumentsConfig,
    #[serde(default)]
    pub context: ContextConfig,
    #[serde(default)]
    pub prompt: PromptConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Defaults only; used when no config file is present.
    pub fn minimal() -> Self {
        Self::default()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DocumentsConfig {
    #[serde(default = "default_root")]
    pub root: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
    #[serde(default = "default_max_extract_bytes")]
    pub max_extract_bytes: u64,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
            follow_symlinks: false,
            max_extract_bytes: default_max_extract_bytes(),
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from("./pdf")
}
fn default_include_globs() -> Vec<String> {
    vec!["**/*.pdf".to_string()]
}
fn default_max_extract_bytes() -> u64 {
    50 * 1024 * 1024
}

/// What to do with documents whose extraction failed.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FailedDocumentPolicy {
    /// Keep an empty-text block so ordering stays stable across reloads.
    #[default]
    Include,
    /// Drop the block from the assembled text.
    Omit,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ContextConfig {
    #[serde(default)]
    pub failed_documents: FailedDocumentPolicy,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PromptConfig {
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default = "default_focus")]
    pub focus: Vec<String>,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            role: default_role(),
            focus: default_focus(),
        }
    }
}

fn default_role() -> String {
    "You are a telecom data analyst specializing in Tunisian market data from INTT reports."
        .to_string()
}
fn default_focus() -> Vec<String> {
    ["revenues", "market shares", "investments", "operator performance"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    /// Overrides the provider's default base URL.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Environment variable holding the API key.
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Upper bound on prompt size, in characters. Unset means no check.
    #[serde(default)]
    pub context_limit_chars: Option<usize>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            endpoint: None,
            api_key_env: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            context_limit_chars: None,
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_max_retries() -> u32 {
    2
}

impl ModelConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }

    /// The environment variable the API key is read from.
    pub fn key_env(&self) -> &str {
        match (&self.api_key_env, self.provider.as_str()) {
            (Some(name), _) => name,
            (None, "openai") => "OPENAI_API_KEY",
            (None, _) => "GEMINI_API_KEY",
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8501".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    // Validate documents
    if config.documents.include_globs.is_empty() {
        anyhow::bail!("documents.include_globs must not be empty");
    }
    if config.documents.max_extract_bytes == 0 {
        anyhow::bail!("documents.max_extract_bytes must be > 0");
    }

    // Validate prompt
    if config.prompt.role.trim().is_empty() {
        anyhow::bail!("prompt.role must not be empty");
    }

    // Validate model
    if config.model.timeout_secs == 0 {
        anyhow::bail!("model.timeout_secs must be > 0");
    }
    if config.model.context_limit_chars == Some(0) {
        anyhow::bail!("model.context_limit_chars must be > 0 when set");
    }

    match config.model.provider.as_str() {
        "disabled" | "gemini" | "openai" => {}
        other => anyhow::bail!(
            "Unknown model provider: '{}'. Must be disabled, gemini, or openai.",
            other
        ),
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = parse_config("").unwrap();
        assert_eq!(cfg.documents.root, PathBuf::from("./pdf"));
        assert_eq!(cfg.documents.include_globs, vec!["**/*.pdf"]);
        assert_eq!(cfg.context.failed_documents, FailedDocumentPolicy::Include);
        assert!(!cfg.model.is_enabled());
        assert_eq!(cfg.server.bind, "127.0.0.1:8501");
    }

    #[test]
    fn full_file_parses() {
        let cfg = parse_config(
            r#"
[documents]
root = "/srv/reports"
include_globs = ["**/*.pdf", "**/*.docx"]
exclude_globs = ["drafts/**"]

[context]
failed_documents = "omit"

[prompt]
role = "You are a market analyst."
focus = ["pricing"]

[model]
provider = "gemini"
model = "gemini-2.5-pro"
timeout_secs = 20
context_limit_chars = 1000000

[server]
bind = "0.0.0.0:9000"
"#,
        )
        .unwrap();
        assert_eq!(cfg.documents.exclude_globs, vec!["drafts/**"]);
        assert_eq!(cfg.context.failed_documents, FailedDocumentPolicy::Omit);
        assert_eq!(cfg.prompt.focus, vec!["pricing"]);
        assert_eq!(cfg.model.model.as_deref(), Some("gemini-2.5-pro"));
        assert_eq!(cfg.model.key_env(), "GEMINI_API_KEY");
        assert_eq!(cfg.model.context_limit_chars, Some(1_000_000));
    }

    #[test]
    fn key_env_follows_provider() {
        let mut model = ModelConfig {
            provider: "openai".to_string(),
            ..ModelConfig::default()
        };
        assert_eq!(model.key_env(), "OPENAI_API_KEY");
        model.api_key_env = Some("MY_KEY".to_string());
        assert_eq!(model.key_env(), "MY_KEY");
    }

    #[test]
    fn rejects_unknown_provider() {
        let err = parse_config("[model]\nprovider = \"palm\"\n").unwrap_err();
        assert!(err.to_string().contains("Unknown model provider"));
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(parse_config("[documents]\ninclude_globs = []\n").is_err());
        assert!(parse_config("[model]\ntimeout_secs = 0\n").is_err());
        assert!(parse_config("[model]\ncontext_limit_chars = 0\n").is_err());
        assert!(parse_config("[context]\nfailed_documents = \"skip\"\n").is_err());
    }
}
