//! Custom error types for the agent
//!
//! Provides a unified error handling system across all modules.

use thiserror::Error;

/// Main error type for agent operations
#[derive(Error, Debug)]
pub enum AgentError {
    /// Non-success response from the agent service
    #[error("Agent service error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Protocol-level problems with the agent service (bad stream, missing fields)
    #[error("Agent service error: {0}")]
    Backend(String),

    /// Missing instructions, dataset or remote resources at startup
    #[error("Setup error: {0}")]
    Setup(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The run asked for a tool this session does not provide
    #[error("Unknown tool requested by the agent: {0}")]
    UnknownTool(String),

    /// The run sent arguments that do not match the tool's schema
    #[error("Invalid arguments for tool '{tool}': {message}")]
    ToolArguments { tool: String, message: String },

    /// The run kept asking for tools past the configured limit
    #[error("Run requested more than {0} tool rounds in one turn")]
    ToolRoundLimit(usize),

    /// SQLite errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Endpoint URL errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error for other cases
    #[error("{0}")]
    Other(String),
}

/// Convenience Result type for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

impl AgentError {
    /// Create a backend protocol error
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Create a setup error
    pub fn setup(msg: impl Into<String>) -> Self {
        Self::Setup(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a tool argument error
    pub fn tool_arguments(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolArguments {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Errors that must stop the program before the prompt loop starts
    pub fn is_setup(&self) -> bool {
        matches!(self, Self::Setup(_) | Self::Config(_))
    }

    /// Errors caused by a required action that cannot be satisfied locally
    pub fn is_unresolvable_action(&self) -> bool {
        matches!(
            self,
            Self::UnknownTool(_) | Self::ToolArguments { .. } | Self::ToolRoundLimit(_)
        )
    }
}
