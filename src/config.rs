//! Configuration management
//!
//! Settings come from `config.toml` in the platform config directory and are
//! then overridden by environment variables (a `.env` file is loaded first).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

const GEMINI_OPENAI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Generation backend settings
    #[serde(default)]
    pub llm: LlmConfig,
    /// Prompt storage locations
    #[serde(default)]
    pub storage: StorageConfig,
    /// Backoff policy for the generation backend
    #[serde(default)]
    pub retry: RetryConfig,
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
}

/// Generation backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// OpenAI-compatible base URL (`/chat/completions` is appended)
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,
    /// API key. Normally supplied through `GEMINI_API_KEY`, never written back to disk.
    #[serde(skip)]
    pub api_key: Option<String>,
    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    GEMINI_OPENAI_BASE_URL.to_string()
}

fn default_model() -> String {
    "gemini-flash-latest".to_string()
}

fn default_request_timeout() -> u64 {
    60
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Prompt storage locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Durable local record (JSON). Its presence pins the active prompt.
    #[serde(default = "default_local_record")]
    pub local_record: PathBuf,
    /// SQLite prompt database. `None` disables the database tier.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

fn default_local_record() -> PathBuf {
    data_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("local_prompts.json")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            local_record: default_local_record(),
            database_path: None,
        }
    }
}

/// Backoff policy for the generation backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per generation call
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// First rate-limit delay in seconds; doubles each attempt
    #[serde(default = "default_base_delay")]
    pub base_delay_secs: u64,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_base_delay() -> u64 {
    5
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_secs: default_base_delay(),
        }
    }
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_secs(self.base_delay_secs)
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5001
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Config {
    /// Load configuration from file, then apply environment overrides
    pub fn load() -> Result<Self> {
        let config_path = config_path()?;

        let mut config = if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)
                .context("Failed to read config file")?;
            Self::from_toml_str(&contents)?
        } else {
            let config = Config::default();
            config.save()?;
            config
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Failed to parse config file")
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = config_path()?;
        let parent = config_path.parent()
            .context("Config path has no parent")?;

        std::fs::create_dir_all(parent)
            .context("Failed to create config directory")?;

        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        std::fs::write(&config_path, contents)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Apply overrides from an environment lookup
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("GEMINI_API_KEY").or_else(|| non_empty("LLM_API_KEY")) {
            self.llm.api_key = Some(key);
        }
        if let Some(model) = non_empty("LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(url) = non_empty("LLM_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Some(url) = non_empty("DATABASE_URL") {
            self.storage.database_path = Some(database_path_from_url(&url));
        }
        if let Some(path) = non_empty("LOCAL_PROMPT_FILE") {
            self.storage.local_record = PathBuf::from(path);
        }
        if let Some(host) = non_empty("HOST") {
            self.server.host = host;
        }
        if let Some(port) = non_empty("PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
    }
}

/// Accept `sqlite://path`, `sqlite:path` or a bare path
fn database_path_from_url(url: &str) -> PathBuf {
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url);
    PathBuf::from(path)
}

/// Get the configuration file path
pub fn config_path() -> Result<PathBuf> {
    let base = directories::ProjectDirs::from("com", "reply-tuner", "reply-tuner")
        .context("Failed to get project directories")?;
    Ok(base.config_dir().join("config.toml"))
}

/// Get the data directory path
pub fn data_dir() -> Result<PathBuf> {
    let base = directories::ProjectDirs::from("com", "reply-tuner", "reply-tuner")
        .context("Failed to get project directories")?;
    Ok(base.data_dir().to_path_buf())
}

/// Show current configuration
pub fn show_config() -> Result<()> {
    let config = Config::load()?;

    println!("Config file:    {}", config_path()?.display());
    println!("Model:          {}", config.llm.model);
    println!("Base URL:       {}", config.llm.base_url);
    println!("API key:        {}", if config.llm.api_key.is_some() { "configured" } else { "not set" });
    println!("Local record:   {}", config.storage.local_record.display());
    match &config.storage.database_path {
        Some(path) => println!("Database:       {}", path.display()),
        None => println!("Database:       disabled"),
    }
    println!(
        "Retry:          {} attempts, {}s base delay",
        config.retry.max_attempts, config.retry.base_delay_secs
    );
    println!("Server:         {}:{}", config.server.host, config.server.port);

    Ok(())
}
