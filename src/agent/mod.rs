//! Agent module - session lifecycle and run orchestration
//!
//! Sets up the remote agent for a lab, drives turns against its thread and
//! downloads the files it generates.

pub mod artifacts;
pub mod instructions;
pub mod lab;
pub mod orchestrator;
pub mod session;
pub mod turn_state;

pub use artifacts::ArtifactFetcher;
pub use lab::{LabProfile, SetupOutputs, SetupStep};
pub use orchestrator::{RunOrchestrator, RunSettings, TerminalOutcome, TokenCallback};
pub use session::{CleanupReport, Session, SessionManager};
pub use turn_state::TurnState;
