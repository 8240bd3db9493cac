use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default)]
    pub summarizer: SummarizerConfig,

    #[serde(default)]
    pub insights: InsightsConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SummarizerProviderType {
    #[default]
    LmStudio,
    OpenAi,
    Ollama,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizerConfig {
    #[serde(default)]
    pub provider: SummarizerProviderType,

    #[serde(default = "default_summarizer_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_summarizer_model")]
    pub model: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_summarizer_timeout")]
    pub timeout_secs: u64,
}

fn default_summarizer_endpoint() -> String {
    "http://127.0.0.1:1234/v1".to_string()
}

fn default_summarizer_model() -> String {
    "gemma-3-4b".to_string()
}

fn default_summarizer_timeout() -> u64 {
    60
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            provider: SummarizerProviderType::default(),
            endpoint: default_summarizer_endpoint(),
            model: default_summarizer_model(),
            api_key: None,
            timeout_secs: default_summarizer_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightsConfig {
    /// Voice the narrative summarizer writes in.
    #[serde(default = "default_tone_style")]
    pub tone_style: String,
}

fn default_tone_style() -> String {
    "warm".to_string()
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self {
            tone_style: default_tone_style(),
        }
    }
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lumen")
        .join("insights.db")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            summarizer: SummarizerConfig::default(),
            insights: InsightsConfig::default(),
        }
    }
}

impl Config {
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lumen")
            .join("config.toml")
    }

    /// Load from the given path, falling back to defaults when the file
    /// does not exist yet.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::default_path);
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("failed to parse config: {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create config directory: {}", parent.display()))?;
        }
        let raw = toml::to_string_pretty(self).context("failed to serialize config")?;
        std::fs::write(path, raw).with_context(|| format!("failed to write config: {}", path.display()))
    }
}
