//! Session lifecycle
//!
//! A session is one remote agent plus one thread. It is created once at
//! startup and deleted at the end unless the user asked to keep it.

use std::sync::Arc;

use tracing::{info, warn};

use crate::agent::instructions::{load_template, render, SCHEMA_PLACEHOLDER};
use crate::agent::lab::LabProfile;
use crate::backend::{AgentBackend, CreateAgentRequest};
use crate::core::{Config, Lab, Result};
use crate::tools::{SalesData, ToolRegistry};

/// Identifiers of the remote agent and thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub agent_id: String,
    pub thread_id: String,
    pub lab: Lab,
}

/// What `end` did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Nothing was deleted because the session was kept
    pub persisted: bool,
    pub thread_deleted: bool,
    pub agent_deleted: bool,
    /// Delete failures, in the order they happened
    pub failures: Vec<String>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.persisted || (self.thread_deleted && self.agent_deleted)
    }
}

/// Creates and tears down sessions
pub struct SessionManager {
    backend: Arc<dyn AgentBackend>,
}

impl SessionManager {
    pub fn new(backend: Arc<dyn AgentBackend>) -> Self {
        Self { backend }
    }

    /// Run lab setup, create the agent, then the thread
    ///
    /// Returns the session and the tool registry the orchestrator dispatches
    /// required actions to. Local prerequisites (database, template) are
    /// checked before anything is created remotely.
    pub async fn start(&self, config: &Config) -> Result<(Session, ToolRegistry)> {
        let profile = LabProfile::from_config(config)?;
        let paths = &config.paths;

        let sales = SalesData::open(paths.database_path())?;
        let template = load_template(&paths.instructions_dir().join(profile.instructions_file))?;
        let schema = sales.database_info().await?;

        let setup = profile
            .prepare(self.backend.as_ref(), &paths.shared_dir)
            .await?;

        let mut substitutions = vec![(SCHEMA_PLACEHOLDER.to_string(), schema)];
        substitutions.extend(setup.substitutions.iter().cloned());
        let instructions = render(&template, &substitutions);

        let tools = ToolRegistry::with_sales_data(sales, profile.hosted_tools.clone());

        let request = CreateAgentRequest {
            model: config.model.deployment.clone(),
            name: config.model.agent_name.clone(),
            instructions,
            tools: tools.descriptors().to_vec(),
            tool_resources: setup.resources(),
            temperature: config.model.temperature,
            top_p: config.model.top_p,
        };
        let agent_id = self.backend.create_agent(&request).await?;
        info!(agent_id = %agent_id, lab = %profile.lab, "Created agent");

        let thread_id = match self.backend.create_thread().await {
            Ok(id) => id,
            Err(e) => {
                if let Err(cleanup) = self.backend.delete_agent(&agent_id).await {
                    warn!(agent_id = %agent_id, error = %cleanup, "Failed to delete agent");
                }
                return Err(e);
            }
        };
        info!(thread_id = %thread_id, "Created thread");

        Ok((
            Session {
                agent_id,
                thread_id,
                lab: profile.lab,
            },
            tools,
        ))
    }

    /// Delete the thread then the agent, unless the session is kept
    ///
    /// Cleanup is best effort: a failed delete is logged and the next one
    /// is still attempted.
    pub async fn end(&self, session: &Session, persist: bool) -> CleanupReport {
        let mut report = CleanupReport::default();

        if persist {
            info!(
                agent_id = %session.agent_id,
                thread_id = %session.thread_id,
                "Keeping session"
            );
            report.persisted = true;
            return report;
        }

        match self.backend.delete_thread(&session.thread_id).await {
            Ok(()) => report.thread_deleted = true,
            Err(e) => {
                warn!(thread_id = %session.thread_id, error = %e, "Failed to delete thread");
                report
                    .failures
                    .push(format!("thread {}: {}", session.thread_id, e));
            }
        }

        match self.backend.delete_agent(&session.agent_id).await {
            Ok(()) => report.agent_deleted = true,
            Err(e) => {
                warn!(agent_id = %session.agent_id, error = %e, "Failed to delete agent");
                report
                    .failures
                    .push(format!("agent {}: {}", session.agent_id, e));
            }
        }

        report
    }
}
