//! Configuration management
//!
//! Supports environment variables, config files, and runtime overrides.
//!
//! Config file location: ~/.config/contoso-agent/config.toml

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::error::{AgentError, Result};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Agent service connection
    #[serde(default)]
    pub backend: BackendConfig,
    /// Model and sampling settings
    #[serde(default)]
    pub model: ModelConfig,
    /// Locations of instructions, dataset and downloaded files
    #[serde(default)]
    pub paths: PathsConfig,
    /// Session behaviour
    #[serde(default)]
    pub agent: AgentConfig,
}

/// How the API key is presented to the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthScheme {
    /// `Authorization: Bearer <key>`
    Bearer,
    /// `api-key: <key>`
    ApiKey,
}

/// Agent service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the agents API
    pub endpoint: String,
    /// Credential; read from the environment, never written to disk
    #[serde(skip_serializing, default)]
    pub api_key: Option<String>,
    /// Header used to send the credential
    pub auth: AuthScheme,
    /// Sent as the `api-version` query parameter when set
    #[serde(default)]
    pub api_version: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Delay between vector store status checks
    pub vector_store_poll_ms: u64,
    /// Project connection the Bing grounding tool searches through
    #[serde(default)]
    pub bing_connection_id: Option<String>,
}

/// Model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model deployment the agent runs on
    pub deployment: String,
    /// Display name of the created agent
    pub agent_name: String,
    /// Kept low so generated SQL is stable
    pub temperature: f32,
    pub top_p: f32,
    /// Token budget per run
    pub max_completion_tokens: u32,
    pub max_prompt_tokens: u32,
}

/// Filesystem layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root holding `instructions/`, `database/`, `datasheet/`, `fonts/` and `files/`
    pub shared_dir: PathBuf,
}

/// Which session variant to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Lab {
    /// Local SQL tool only
    FunctionCalling,
    /// Adds file search over the product datasheet
    FileSearch,
    /// Adds the hosted code interpreter
    CodeInterpreter,
    /// Code interpreter with uploaded fonts for non-Latin charts
    Multilingual,
    /// Adds web search grounding through a Bing connection
    BingGrounding,
}

impl std::fmt::Display for Lab {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Lab::FunctionCalling => write!(f, "function-calling"),
            Lab::FileSearch => write!(f, "file-search"),
            Lab::CodeInterpreter => write!(f, "code-interpreter"),
            Lab::Multilingual => write!(f, "multilingual"),
            Lab::BingGrounding => write!(f, "bing-grounding"),
        }
    }
}

/// Agent behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Session variant
    pub lab: Lab,
    /// Maximum requires-action rounds per turn
    /// Default: 25
    pub max_tool_rounds: usize,
    /// Whether to show debug output
    pub debug: bool,
}

fn env_flag(name: &str) -> Option<bool> {
    env::var(name).ok().map(|v| v == "true" || v == "1")
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: env::var("AGENT_ENDPOINT").unwrap_or_default(),
            api_key: env::var("AGENT_API_KEY").ok(),
            auth: match env::var("AGENT_AUTH_SCHEME").as_deref() {
                Ok("api_key") | Ok("api-key") => AuthScheme::ApiKey,
                _ => AuthScheme::Bearer,
            },
            api_version: env::var("AGENT_API_VERSION").ok(),
            timeout_secs: 120,
            vector_store_poll_ms: 1000,
            bing_connection_id: env::var("BING_CONNECTION_ID").ok(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            deployment: env::var("MODEL_DEPLOYMENT_NAME").unwrap_or_default(),
            agent_name: "Contoso Sales Agent".to_string(),
            temperature: 0.1,
            top_p: 0.1,
            max_completion_tokens: 10240,
            max_prompt_tokens: 20480,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            shared_dir: env::var("SHARED_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("shared")),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            lab: Lab::FunctionCalling,
            max_tool_rounds: 25,
            debug: env_flag("CONTOSO_AGENT_DEBUG").unwrap_or(false),
        }
    }
}

impl PathsConfig {
    /// Directory holding instruction templates
    pub fn instructions_dir(&self) -> PathBuf {
        self.shared_dir.join("instructions")
    }

    /// The read-only sales database
    pub fn database_path(&self) -> PathBuf {
        self.shared_dir.join("database").join("contoso-sales.db")
    }

    /// Where downloaded artifacts are written
    pub fn files_dir(&self) -> PathBuf {
        self.shared_dir.join("files")
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("contoso-agent")
    }

    /// Get the config file path
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from file, environment, and defaults
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load() -> Self {
        // Try to load .env file if it exists
        let _ = dotenvy::dotenv();

        let mut config = Self::load_from_file().unwrap_or_default();
        config.apply_env();
        config
    }

    /// Load configuration from file only
    pub fn load_from_file() -> Result<Self> {
        let config_path = Self::config_file();

        if !config_path.exists() {
            return Err(AgentError::config("Config file not found"));
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|e| AgentError::config(format!("Failed to read config: {}", e)))?;

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| AgentError::config(format!("Failed to parse config: {}", e)))
    }

    /// Environment variables override file values
    fn apply_env(&mut self) {
        if let Ok(endpoint) = env::var("AGENT_ENDPOINT") {
            self.backend.endpoint = endpoint;
        }
        if let Ok(key) = env::var("AGENT_API_KEY") {
            self.backend.api_key = Some(key);
        }
        if let Ok(version) = env::var("AGENT_API_VERSION") {
            self.backend.api_version = Some(version);
        }
        if let Ok(connection_id) = env::var("BING_CONNECTION_ID") {
            self.backend.bing_connection_id = Some(connection_id);
        }
        if let Ok(deployment) = env::var("MODEL_DEPLOYMENT_NAME") {
            self.model.deployment = deployment;
        }
        if let Ok(dir) = env::var("SHARED_DIR") {
            self.paths.shared_dir = PathBuf::from(dir);
        }
        if let Some(debug) = env_flag("CONTOSO_AGENT_DEBUG") {
            self.agent.debug = debug;
        }
    }

    /// Save configuration to the user config file
    pub fn save(&self) -> Result<PathBuf> {
        let config_path = Self::config_file();
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    /// Write configuration as TOML, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| AgentError::config(format!("Failed to create config dir: {}", e)))?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| AgentError::config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, content)
            .map_err(|e| AgentError::config(format!("Failed to write config: {}", e)))
    }

    /// Check the settings every session needs
    pub fn validate(&self) -> Result<()> {
        if self.backend.endpoint.trim().is_empty() {
            return Err(AgentError::config(
                "No agent service endpoint. Set AGENT_ENDPOINT or backend.endpoint",
            ));
        }
        if self.model.deployment.trim().is_empty() {
            return Err(AgentError::config(
                "No model deployment. Set MODEL_DEPLOYMENT_NAME or model.deployment",
            ));
        }
        if self.agent.max_tool_rounds == 0 {
            return Err(AgentError::config("agent.max_tool_rounds must be at least 1"));
        }
        Ok(())
    }
}
