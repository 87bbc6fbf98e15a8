//! Core module - shared infrastructure
//!
//! This module contains foundational types, configuration, and error handling
//! used throughout the application.

pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, Lab};
pub use error::{AgentError, Result};
pub use types::*;
