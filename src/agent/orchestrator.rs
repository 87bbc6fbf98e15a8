//! Run orchestrator
//!
//! Drives one turn: append the prompt, start a run, and consume its event
//! stream until a terminal event. When the run requires action the local
//! tools are invoked, their outputs submitted, and the continuation stream
//! replaces the current one so chained tool rounds never nest.

use std::path::PathBuf;
use std::sync::Arc;

use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

use crate::agent::artifacts::ArtifactFetcher;
use crate::agent::session::Session;
use crate::agent::turn_state::TurnState;
use crate::backend::{AgentBackend, RequiredAction, RunEvent, RunRequest};
use crate::core::{AgentError, Config, MessageRole, Result, RunHandle, ThreadMessage, ToolOutput};
use crate::tools::codec::tool_output;
use crate::tools::ToolRegistry;

/// Receives streamed assistant text as it arrives
pub type TokenCallback = Box<dyn Fn(&str) + Send + Sync>;

/// How a turn ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalOutcome {
    /// The run finished; `text` is the assistant's answer
    Completed {
        text: String,
        artifacts: Vec<PathBuf>,
    },
    /// The run failed with a service error
    Failed { code: String, message: String },
    /// The run was throttled; the user may retry later
    RateLimited { message: String },
}

/// Budget and sampling applied to every run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub max_completion_tokens: u32,
    pub max_prompt_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tool_rounds: usize,
}

impl RunSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_completion_tokens: config.model.max_completion_tokens,
            max_prompt_tokens: config.model.max_prompt_tokens,
            temperature: config.model.temperature,
            top_p: config.model.top_p,
            max_tool_rounds: config.agent.max_tool_rounds,
        }
    }
}

/// Runs turns against one session
pub struct RunOrchestrator {
    backend: Arc<dyn AgentBackend>,
    session: Session,
    tools: ToolRegistry,
    artifacts: ArtifactFetcher,
    settings: RunSettings,
    on_token: TokenCallback,
}

impl RunOrchestrator {
    pub fn new(
        backend: Arc<dyn AgentBackend>,
        session: Session,
        tools: ToolRegistry,
        artifacts: ArtifactFetcher,
        settings: RunSettings,
    ) -> Self {
        Self {
            backend,
            session,
            tools,
            artifacts,
            settings,
            on_token: Box::new(|_| {}),
        }
    }

    /// Wire an orchestrator from configuration; artifacts go to the shared files dir
    pub fn from_config(
        backend: Arc<dyn AgentBackend>,
        session: Session,
        tools: ToolRegistry,
        config: &Config,
    ) -> Self {
        let artifacts = ArtifactFetcher::new(backend.clone(), config.paths.files_dir());
        Self::new(
            backend,
            session,
            tools,
            artifacts,
            RunSettings::from_config(config),
        )
    }

    /// Forward streamed text to `callback`
    pub fn with_token_callback(mut self, callback: TokenCallback) -> Self {
        self.on_token = callback;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Send one prompt and drive the resulting run to a terminal outcome
    ///
    /// Taking `&mut self` keeps a second run from starting on the thread
    /// while this one is in flight. An `Err` means the turn was abandoned:
    /// either the service misbehaved or a required action could not be
    /// resolved. In the latter case the run is cancelled and no tool output
    /// is submitted.
    pub async fn run_turn(&mut self, prompt: &str) -> Result<TerminalOutcome> {
        let mut state = TurnState::new(self.settings.max_tool_rounds);

        self.backend
            .create_message(&self.session.thread_id, MessageRole::User, prompt)
            .await?;

        let request = RunRequest {
            thread_id: self.session.thread_id.clone(),
            agent_id: self.session.agent_id.clone(),
            max_completion_tokens: self.settings.max_completion_tokens,
            max_prompt_tokens: self.settings.max_prompt_tokens,
            temperature: self.settings.temperature,
            top_p: self.settings.top_p,
        };
        let mut stream = self.backend.create_run_stream(&request).await?;
        debug!(thread_id = %self.session.thread_id, "Run started");

        loop {
            let event = match stream.next().await {
                Some(event) => event?,
                None => {
                    return Err(AgentError::backend(
                        "Run stream ended before the run finished",
                    ))
                }
            };

            match event {
                RunEvent::ContentDelta { text } => {
                    (self.on_token)(&text);
                    state.push_delta(&text);
                }
                RunEvent::MessageCompleted(message) => {
                    state.record_message(&message);
                    self.save_artifacts(&message, &mut state).await;
                }
                RunEvent::RequiresAction(action) => {
                    let outputs = match self.resolve(&action, &mut state).await {
                        Ok(outputs) => outputs,
                        Err(e) => {
                            self.abandon(&action.run, &e).await;
                            return Err(e);
                        }
                    };
                    debug!(
                        run_id = %action.run.run_id,
                        outputs = outputs.len(),
                        "Submitting tool outputs"
                    );
                    stream = self
                        .backend
                        .submit_tool_outputs_stream(&action.run, &outputs)
                        .await?;
                }
                RunEvent::RunCompleted { run } => {
                    info!(
                        run_id = %run.run_id,
                        tool_rounds = state.tool_rounds,
                        artifacts = state.artifacts.len(),
                        "Run completed"
                    );
                    return Ok(TerminalOutcome::Completed {
                        text: state.completed_text(),
                        artifacts: state.artifacts,
                    });
                }
                RunEvent::RunFailed { run, error } => {
                    warn!(run_id = %run.run_id, code = %error.code, "Run failed: {}", error.message);
                    return Ok(if error.is_rate_limit() {
                        TerminalOutcome::RateLimited {
                            message: error.message,
                        }
                    } else {
                        TerminalOutcome::Failed {
                            code: error.code,
                            message: error.message,
                        }
                    });
                }
            }
        }
    }

    /// Invoke every requested tool, in order, before anything is submitted
    async fn resolve(
        &self,
        action: &RequiredAction,
        state: &mut TurnState,
    ) -> Result<Vec<ToolOutput>> {
        state.begin_tool_round()?;

        let mut outputs = Vec::with_capacity(action.tool_calls.len());
        for call in &action.tool_calls {
            debug!(tool = %call.name, call_id = %call.id, "Required action");
            let output = self.tools.execute(call).await?;
            outputs.push(tool_output(call, output));
        }
        Ok(outputs)
    }

    /// Best-effort cancel so the run is not left suspended
    async fn abandon(&self, run: &RunHandle, reason: &AgentError) {
        warn!(run_id = %run.run_id, error = %reason, "Abandoning turn");
        if let Err(e) = self.backend.cancel_run(run).await {
            warn!(run_id = %run.run_id, error = %e, "Failed to cancel run");
        }
    }

    /// Fetch every referenced artifact; failures never affect the run
    async fn save_artifacts(&self, message: &ThreadMessage, state: &mut TurnState) {
        for artifact in message.artifact_refs() {
            match self.artifacts.fetch(&artifact).await {
                Ok(path) => {
                    info!(file_id = %artifact.file_id, path = %path.display(), "Saved artifact");
                    state.record_artifact(path);
                }
                Err(e) => {
                    warn!(file_id = %artifact.file_id, error = %e, "Failed to fetch artifact");
                }
            }
        }
    }
}
