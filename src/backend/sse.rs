//! Run event decoding
//!
//! The service streams `event:`/`data:` frames. Framing is done by
//! `eventsource-stream`; [`decode_frame`] maps one frame onto a [`RunEvent`].

use eventsource_stream::Event;
use serde::Deserialize;

use crate::backend::events::{RequiredAction, RunEvent};
use crate::core::{AgentError, Result, RunError, RunHandle, ThreadMessage, ToolCall};

#[derive(Debug, Deserialize)]
struct RunPayload {
    id: String,
    thread_id: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    required_action: Option<RequiredActionPayload>,
    #[serde(default)]
    last_error: Option<RunError>,
    #[serde(default)]
    incomplete_details: Option<IncompleteDetails>,
}

#[derive(Debug, Deserialize)]
struct IncompleteDetails {
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RequiredActionPayload {
    submit_tool_outputs: SubmitToolOutputsPayload,
}

#[derive(Debug, Deserialize)]
struct SubmitToolOutputsPayload {
    tool_calls: Vec<ToolCallPayload>,
}

#[derive(Debug, Deserialize)]
struct ToolCallPayload {
    id: String,
    function: FunctionCallPayload,
}

#[derive(Debug, Deserialize)]
struct FunctionCallPayload {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct MessageDeltaPayload {
    delta: MessageDelta,
}

#[derive(Debug, Deserialize)]
struct MessageDelta {
    #[serde(default)]
    content: Vec<DeltaPart>,
}

#[derive(Debug, Deserialize)]
struct DeltaPart {
    #[serde(default)]
    text: Option<DeltaText>,
}

#[derive(Debug, Deserialize)]
struct DeltaText {
    #[serde(default)]
    value: String,
}

impl RunPayload {
    fn handle(&self) -> RunHandle {
        RunHandle::new(&self.thread_id, &self.id)
    }

    /// Error for runs that ended without completing
    fn terminal_error(&self, fallback_code: &str) -> RunError {
        if let Some(error) = &self.last_error {
            return error.clone();
        }
        let code = self.status.clone().unwrap_or_else(|| fallback_code.to_string());
        let message = self
            .incomplete_details
            .as_ref()
            .and_then(|details| details.reason.clone())
            .unwrap_or_else(|| format!("Run ended with status '{}'", code));
        RunError { code, message }
    }
}

fn parse<'a, T: Deserialize<'a>>(event: &str, data: &'a str) -> Result<T> {
    serde_json::from_str(data)
        .map_err(|e| AgentError::backend(format!("Malformed '{}' event: {}", event, e)))
}

/// Map a frame onto a run event; `None` for frames the orchestrator ignores
pub fn decode_frame(frame: &Event) -> Result<Option<RunEvent>> {
    let event = frame.event.as_str();
    let data = frame.data.as_str();

    let decoded = match event {
        "thread.message.delta" => {
            let payload: MessageDeltaPayload = parse(event, data)?;
            let text: String = payload
                .delta
                .content
                .into_iter()
                .filter_map(|part| part.text.map(|t| t.value))
                .collect();
            if text.is_empty() {
                None
            } else {
                Some(RunEvent::ContentDelta { text })
            }
        }
        "thread.message.completed" => {
            let message: ThreadMessage = parse(event, data)?;
            Some(RunEvent::MessageCompleted(message))
        }
        "thread.run.requires_action" => {
            let run: RunPayload = parse(event, data)?;
            let calls = run
                .required_action
                .as_ref()
                .map(|action| action.submit_tool_outputs.tool_calls.as_slice())
                .unwrap_or_default();
            if calls.is_empty() {
                return Err(AgentError::backend(format!(
                    "Run {} requires action but named no tool calls",
                    run.id
                )));
            }
            let tool_calls = calls
                .iter()
                .map(|call| ToolCall::new(&call.id, &call.function.name, &call.function.arguments))
                .collect();
            Some(RunEvent::RequiresAction(RequiredAction {
                run: run.handle(),
                tool_calls,
            }))
        }
        "thread.run.completed" => {
            let run: RunPayload = parse(event, data)?;
            Some(RunEvent::RunCompleted { run: run.handle() })
        }
        "thread.run.failed" => {
            let run: RunPayload = parse(event, data)?;
            let error = run.terminal_error("failed");
            Some(RunEvent::RunFailed {
                run: run.handle(),
                error,
            })
        }
        "thread.run.cancelled" | "thread.run.expired" | "thread.run.incomplete" => {
            let run: RunPayload = parse(event, data)?;
            let fallback = event.trim_start_matches("thread.run.");
            let error = run.terminal_error(fallback);
            Some(RunEvent::RunFailed {
                run: run.handle(),
                error,
            })
        }
        "error" => {
            return Err(AgentError::backend(format!("Stream error: {}", data)));
        }
        _ => None,
    };

    Ok(decoded)
}
