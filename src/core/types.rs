//! Shared types used across modules
//!
//! Contains thread messages, tool descriptors, required-action calls and
//! the handles that identify a run on the agent service.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Extension used for artifacts that do not carry a file name
pub const DEFAULT_ARTIFACT_EXTENSION: &str = "png";

/// Role of a message author on a thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// A completed message on a thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadMessage {
    pub id: String,
    pub role: MessageRole,
    #[serde(default)]
    pub content: Vec<ContentPart>,
}

/// One part of a message's content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Plain text, possibly annotated with generated files
    Text { text: TextContent },
    /// A generated image stored on the service
    ImageFile { image_file: FileIdRef },
    /// Any content kind this client does not act on
    #[serde(other)]
    Unsupported,
}

/// Text body of a content part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    pub value: String,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

/// Annotation attached to a span of text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Annotation {
    /// A file produced by the code interpreter, e.g. `sandbox:/mnt/data/chart.png`
    FilePath { text: String, file_path: FileIdRef },
    #[serde(other)]
    Unsupported,
}

/// Reference to a file stored by the agent service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileIdRef {
    pub file_id: String,
}

/// An artifact referenced by a completed message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRef {
    pub file_id: String,
    pub extension: String,
}

impl ArtifactRef {
    pub fn new(file_id: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            file_id: file_id.into(),
            extension: extension.into(),
        }
    }

    /// Build a reference from a `file_path` annotation, taking the extension
    /// from the sandbox file name
    fn from_annotation(file_id: &str, text: &str) -> Self {
        let name = text.rsplit(':').next().unwrap_or(text);
        let extension = Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty())
            .unwrap_or(DEFAULT_ARTIFACT_EXTENSION);
        Self::new(file_id, extension)
    }
}

impl ThreadMessage {
    /// Concatenated text of every text part
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text { text } => Some(text.value.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Every artifact reference in content order, duplicates included
    pub fn artifact_refs(&self) -> Vec<ArtifactRef> {
        let mut refs = Vec::new();
        for part in &self.content {
            match part {
                ContentPart::ImageFile { image_file } => refs.push(ArtifactRef::new(
                    &image_file.file_id,
                    DEFAULT_ARTIFACT_EXTENSION,
                )),
                ContentPart::Text { text } => {
                    for annotation in &text.annotations {
                        if let Annotation::FilePath { text, file_path } = annotation {
                            refs.push(ArtifactRef::from_annotation(&file_path.file_id, text));
                        }
                    }
                }
                ContentPart::Unsupported => {}
            }
        }
        refs
    }
}

/// A tool call requested by a suspended run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCall {
    /// Correlation handle echoed back with the output
    pub id: String,
    /// Name of the tool to invoke
    pub name: String,
    /// Raw JSON argument payload
    pub arguments: String,
}

impl ToolCall {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// Result of a tool call, submitted to resume the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub tool_call_id: String,
    pub output: String,
}

/// Identifies a run on a thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunHandle {
    pub thread_id: String,
    pub run_id: String,
}

impl RunHandle {
    pub fn new(thread_id: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            run_id: run_id.into(),
        }
    }
}

/// Error reported by the service for a failed run
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// Capability descriptor advertised when the agent is created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolDefinition {
    /// A function executed locally when the run requires action
    Function { function: FunctionDefinition },
    /// Service-hosted search over uploaded documents
    FileSearch,
    /// Service-hosted Python sandbox
    CodeInterpreter,
    /// Service-hosted web search through a Bing connection
    BingGrounding { bing_grounding: BingGroundingConfig },
}

/// Connections the Bing grounding tool may search through
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BingGroundingConfig {
    pub connections: Vec<ToolConnection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolConnection {
    pub connection_id: String,
}

/// Function definition within a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    /// Name of the function
    pub name: String,
    /// Description of what the function does
    pub description: String,
    /// JSON Schema for the parameters
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    /// Create a new function tool definition
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self::Function {
            function: FunctionDefinition {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }

    /// Bing grounding over a single project connection
    pub fn bing_grounding(connection_id: impl Into<String>) -> Self {
        Self::BingGrounding {
            bing_grounding: BingGroundingConfig {
                connections: vec![ToolConnection {
                    connection_id: connection_id.into(),
                }],
            },
        }
    }

    /// Name used to match required actions; hosted tools use their kind
    pub fn name(&self) -> &str {
        match self {
            ToolDefinition::Function { function } => &function.name,
            ToolDefinition::FileSearch => "file_search",
            ToolDefinition::CodeInterpreter => "code_interpreter",
            ToolDefinition::BingGrounding { .. } => "bing_grounding",
        }
    }

    /// Whether the tool runs locally
    pub fn is_function(&self) -> bool {
        matches!(self, ToolDefinition::Function { .. })
    }
}

/// Resources attached to hosted tools at agent creation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolResources {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_search: Option<FileSearchResource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_interpreter: Option<CodeInterpreterResource>,
}

impl ToolResources {
    pub fn is_empty(&self) -> bool {
        self.file_search.is_none() && self.code_interpreter.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileSearchResource {
    pub vector_store_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeInterpreterResource {
    pub file_ids: Vec<String>,
}
