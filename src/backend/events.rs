//! Run stream events
//!
//! The five event classes the orchestrator reacts to. Everything else the
//! service streams (step updates, queued/in-progress markers) is dropped by
//! the decoder before it reaches this type.

use crate::core::{RunError, RunHandle, ThreadMessage, ToolCall};

/// Error code the service uses when a run is throttled
pub const RATE_LIMIT_CODE: &str = "rate_limit_exceeded";

/// A run suspended until its tool calls are answered
#[derive(Debug, Clone, PartialEq)]
pub struct RequiredAction {
    pub run: RunHandle,
    pub tool_calls: Vec<ToolCall>,
}

/// One event from a run stream
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    /// Incremental assistant text
    ContentDelta { text: String },
    /// A message finished; may reference generated files
    MessageCompleted(ThreadMessage),
    /// The run needs local tool output before it can continue
    RequiresAction(RequiredAction),
    /// The run finished successfully
    RunCompleted { run: RunHandle },
    /// The run stopped with an error
    RunFailed { run: RunHandle, error: RunError },
}

impl RunError {
    pub fn is_rate_limit(&self) -> bool {
        self.code == RATE_LIMIT_CODE
    }
}
