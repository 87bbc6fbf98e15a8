//! Backend module - the remote agent service
//!
//! Protocol trait, streamed run events and the HTTP client.

pub mod client;
pub mod events;
pub mod sse;
pub mod traits;

pub use client::AgentsClient;
pub use events::{RequiredAction, RunEvent, RATE_LIMIT_CODE};
pub use traits::{AgentBackend, CreateAgentRequest, EventStream, RunRequest};
