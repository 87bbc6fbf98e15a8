//! Tool argument and result codec
//!
//! Required actions carry arguments as JSON text; results go back as text.
//! Decoding failures become [`AgentError::ToolArguments`] so the caller can
//! end the turn instead of resuming the run.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::core::{AgentError, Result, ToolCall, ToolOutput};

/// Arguments of the sales data query tool
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct FetchSalesDataArgs {
    pub query: String,
}

/// Payload reported back when a query fails
#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct QueryErrorPayload {
    pub error: String,
    pub query: String,
}

/// Decode a tool call's argument payload
pub fn decode_arguments<T: DeserializeOwned>(call: &ToolCall) -> Result<T> {
    let raw = call.arguments.trim();
    if raw.is_empty() {
        return Err(AgentError::tool_arguments(&call.name, "empty argument payload"));
    }
    serde_json::from_str(raw).map_err(|e| AgentError::tool_arguments(&call.name, e.to_string()))
}

/// Serialize a tool result for submission
pub fn encode_result<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// Serialize a failed query; never fails so it can be used on error paths
pub fn encode_query_error(message: impl Into<String>, query: impl Into<String>) -> String {
    let payload = QueryErrorPayload {
        error: message.into(),
        query: query.into(),
    };
    serde_json::to_string(&payload).unwrap_or_else(|_| {
        format!(
            "{{\"error\":{:?},\"query\":{:?}}}",
            payload.error, payload.query
        )
    })
}

/// Pair a result with the call it answers
pub fn tool_output(call: &ToolCall, output: String) -> ToolOutput {
    ToolOutput {
        tool_call_id: call.id.clone(),
        output,
    }
}
