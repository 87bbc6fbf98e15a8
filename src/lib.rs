//! Contoso sales agent
//!
//! A command-line client for a hosted agents service. It creates an agent
//! that answers questions about Contoso sales data by writing SQLite queries
//! which are executed locally, streams the agent's answers and downloads the
//! charts and files it generates.
//!
//! # Architecture
//!
//! - **Core**: Shared types, configuration, and error handling
//! - **Backend**: The agents service protocol, SSE decoding and HTTP client
//! - **Tools**: The sales data query tool and the tool registry
//! - **Agent**: Session lifecycle, lab setup and the run orchestrator
//! - **CLI**: Command parsing and the REPL
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use contoso_agent::{AgentsClient, Config, RunOrchestrator, SessionManager};
//!
//! #[tokio::main]
//! async fn main() -> contoso_agent::Result<()> {
//!     let config = Config::load();
//!     config.validate()?;
//!     let backend = Arc::new(AgentsClient::from_config(&config)?);
//!
//!     let manager = SessionManager::new(backend.clone());
//!     let (session, tools) = manager.start(&config).await?;
//!     let mut orchestrator = RunOrchestrator::from_config(backend, session, tools, &config);
//!
//!     let outcome = orchestrator.run_turn("What were the sales by region?").await?;
//!     println!("{:?}", outcome);
//!
//!     manager.end(orchestrator.session(), false).await;
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod backend;
pub mod cli;
pub mod core;
pub mod tools;

// Re-export commonly used items
pub use agent::{RunOrchestrator, Session, SessionManager, TerminalOutcome};
pub use backend::{AgentBackend, AgentsClient, RunEvent};
pub use cli::Repl;
pub use core::{AgentError, Config, Lab, Result};
