//! Per-turn bookkeeping
//!
//! Tracks what one prompt's run has produced so far: streamed text, completed
//! messages, tool rounds and saved artifacts.

use std::path::PathBuf;

use crate::core::{AgentError, Result, ThreadMessage};

/// State of a single turn
#[derive(Debug, Clone)]
pub struct TurnState {
    /// Requires-action rounds answered so far
    pub tool_rounds: usize,
    /// Maximum allowed rounds
    pub max_tool_rounds: usize,
    /// Streamed text, in arrival order
    pub streamed: String,
    /// Text of each completed assistant message
    pub messages: Vec<String>,
    /// Artifacts written to disk
    pub artifacts: Vec<PathBuf>,
}

impl TurnState {
    pub fn new(max_tool_rounds: usize) -> Self {
        Self {
            tool_rounds: 0,
            max_tool_rounds,
            streamed: String::new(),
            messages: Vec::new(),
            artifacts: Vec::new(),
        }
    }

    /// Count a new requires-action round, failing once the limit is passed
    pub fn begin_tool_round(&mut self) -> Result<()> {
        if self.tool_rounds >= self.max_tool_rounds {
            return Err(AgentError::ToolRoundLimit(self.max_tool_rounds));
        }
        self.tool_rounds += 1;
        Ok(())
    }

    pub fn push_delta(&mut self, text: &str) {
        self.streamed.push_str(text);
    }

    pub fn record_message(&mut self, message: &ThreadMessage) {
        let text = message.text();
        if !text.is_empty() {
            self.messages.push(text);
        }
    }

    pub fn record_artifact(&mut self, path: PathBuf) {
        self.artifacts.push(path);
    }

    /// Final answer text: streamed deltas, or completed messages when nothing streamed
    pub fn completed_text(&self) -> String {
        if !self.streamed.is_empty() {
            self.streamed.clone()
        } else {
            self.messages.join("\n")
        }
    }
}
