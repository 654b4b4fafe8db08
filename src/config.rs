use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

use crate::error::ConfigError;

/// Overrides the config file location (absolute path to a JSON file).
pub const CONFIG_PATH_ENV: &str = "LAZRGIT_CONFIG";

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum Provider {
    #[default]
    OpenAI,
    Anthropic,
    Gemini,
}

impl Provider {
    pub fn default_model(self) -> &'static str {
        match self {
            Provider::OpenAI => "gpt-3.5-turbo",
            Provider::Anthropic => "claude-3-5-haiku-latest",
            Provider::Gemini => "gemini-1.5-flash",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::OpenAI => write!(f, "OpenAI"),
            Provider::Anthropic => write!(f, "Anthropic"),
            Provider::Gemini => write!(f, "Google Gemini"),
        }
    }
}

/// On-disk shape. Every key is optional here; [`Config::parse`] enforces which ones
/// are required.
#[derive(Debug, Deserialize, Default)]
struct RawConfig {
    #[serde(default)]
    jira: RawJira,
    #[serde(default)]
    llm: RawLlm,
}

#[derive(Debug, Deserialize, Default)]
struct RawJira {
    url: Option<String>,
    username: Option<String>,
    token: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct RawLlm {
    provider: Option<Provider>,
    api_key: Option<String>,
    model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JiraConfig {
    pub url: String,
    pub username: String,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmConfig {
    pub provider: Provider,
    pub api_key: String,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub jira: JiraConfig,
    pub llm: LlmConfig,
}

impl Config {
    pub fn get_path() -> Result<PathBuf, ConfigError> {
        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }
        let mut path = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        path.push("lazrgit");
        path.push("config.json");
        Ok(path)
    }

    /// Read the config once at startup.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::get_path()?;
        if !path.exists() {
            return Err(ConfigError::NotFound { path });
        }

        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let config = Self::parse(&content)?;
        tracing::info!(path = %path.display(), provider = %config.llm.provider, model = %config.llm.model, "loaded config");
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(content)?;

        let jira = JiraConfig {
            url: required(raw.jira.url, "jira.url")?
                .trim_end_matches('/')
                .to_string(),
            username: required(raw.jira.username, "jira.username")?,
            token: required(raw.jira.token, "jira.token")?,
        };

        let provider = raw.llm.provider.unwrap_or_default();
        let model = raw
            .llm
            .model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| provider.default_model().to_string());
        let llm = LlmConfig {
            provider,
            api_key: required(raw.llm.api_key, "llm.api_key")?,
            model,
        };

        Ok(Self { jira, llm })
    }
}

fn required(value: Option<String>, key: &'static str) -> Result<String, ConfigError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(ConfigError::MissingKey { key }),
    }
}
