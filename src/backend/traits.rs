//! Agent service trait
//!
//! Everything the session and orchestrator need from the remote agent
//! service. The HTTP client implements it; tests script it in memory.

use async_trait::async_trait;
use futures::Stream;
use serde::Serialize;
use std::path::Path;
use std::pin::Pin;

use crate::backend::events::RunEvent;
use crate::core::{MessageRole, Result, RunHandle, ToolDefinition, ToolOutput, ToolResources};

/// Ordered stream of run events
pub type EventStream = Pin<Box<dyn Stream<Item = Result<RunEvent>> + Send>>;

/// Parameters for creating the agent
#[derive(Debug, Clone, Serialize)]
pub struct CreateAgentRequest {
    pub model: String,
    pub name: String,
    pub instructions: String,
    pub tools: Vec<ToolDefinition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_resources: Option<ToolResources>,
    pub temperature: f32,
    pub top_p: f32,
}

/// Parameters for starting a run on a thread
#[derive(Debug, Clone, Serialize)]
pub struct RunRequest {
    #[serde(skip)]
    pub thread_id: String,
    #[serde(rename = "assistant_id")]
    pub agent_id: String,
    pub max_completion_tokens: u32,
    pub max_prompt_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

/// Remote agent protocol
#[async_trait]
pub trait AgentBackend: Send + Sync {
    /// Create the agent, returning its id
    async fn create_agent(&self, request: &CreateAgentRequest) -> Result<String>;

    /// Create an empty thread, returning its id
    async fn create_thread(&self) -> Result<String>;

    /// Append a message to a thread, returning the message id
    async fn create_message(&self, thread_id: &str, role: MessageRole, content: &str)
        -> Result<String>;

    /// Start a run and stream its events
    async fn create_run_stream(&self, request: &RunRequest) -> Result<EventStream>;

    /// Answer a required action; the returned stream continues the same run
    async fn submit_tool_outputs_stream(
        &self,
        run: &RunHandle,
        outputs: &[ToolOutput],
    ) -> Result<EventStream>;

    /// Ask the service to stop a run
    async fn cancel_run(&self, run: &RunHandle) -> Result<()>;

    /// Download a stored file
    async fn get_file_content(&self, file_id: &str) -> Result<Vec<u8>>;

    /// Upload a local file for use by hosted tools, returning its id
    async fn upload_file(&self, path: &Path) -> Result<String>;

    /// Create a searchable index over uploaded files, returning its id once ready
    async fn create_vector_store(&self, name: &str, file_ids: &[String]) -> Result<String>;

    async fn delete_thread(&self, thread_id: &str) -> Result<()>;

    async fn delete_agent(&self, agent_id: &str) -> Result<()>;
}
