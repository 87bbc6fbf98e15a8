//! Instruction templates
//!
//! Templates are plain text with `{placeholder}` tokens replaced verbatim.

use std::fs;
use std::path::Path;

use crate::core::{AgentError, Result};

/// Replaced with the database schema description
pub const SCHEMA_PLACEHOLDER: &str = "{database_schema_string}";

/// Replaced with the uploaded font archive id
pub const FONT_FILE_PLACEHOLDER: &str = "{font_file_id}";

/// Read a template; a missing file aborts startup
pub fn load_template(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| {
        AgentError::setup(format!(
            "Cannot read instructions {}: {}",
            path.display(),
            e
        ))
    })
}

/// Substitute every occurrence of each placeholder
pub fn render<K, V>(template: &str, substitutions: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    substitutions
        .iter()
        .fold(template.to_string(), |text, (placeholder, value)| {
            text.replace(placeholder.as_ref(), value.as_ref())
        })
}
