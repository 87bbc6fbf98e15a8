//! Session variants
//!
//! Each lab is a configuration value: which instructions template to use,
//! which hosted tools to advertise and which files to upload before the
//! agent is created. Setup outputs feed both the agent's tool resources and
//! the instruction placeholders.

use std::path::Path;

use tracing::info;

use crate::agent::instructions::FONT_FILE_PLACEHOLDER;
use crate::backend::AgentBackend;
use crate::core::{
    AgentError, CodeInterpreterResource, Config, FileSearchResource, Lab, Result,
    ToolDefinition, ToolResources,
};

/// Name given to the product datasheet index
pub const VECTOR_STORE_NAME: &str = "Contoso Product Information Vector Store";

/// One-time remote setup performed before instructions are rendered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupStep {
    /// Upload documents and index them for file search
    VectorStore {
        name: &'static str,
        files: Vec<&'static str>,
    },
    /// Upload a file for the code interpreter; its id fills `placeholder`
    CodeInterpreterFile {
        path: &'static str,
        placeholder: &'static str,
    },
}

/// Everything that differs between session variants
#[derive(Debug, Clone, PartialEq)]
pub struct LabProfile {
    pub lab: Lab,
    /// Template file name under the instructions directory
    pub instructions_file: &'static str,
    /// Service-hosted tools advertised after the local ones
    pub hosted_tools: Vec<ToolDefinition>,
    pub setup: Vec<SetupStep>,
}

/// Results of running a profile's setup steps
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetupOutputs {
    pub tool_resources: ToolResources,
    /// Placeholder -> value pairs for the instructions template
    pub substitutions: Vec<(String, String)>,
}

impl SetupOutputs {
    /// Resources to send with the agent, if any
    pub fn resources(&self) -> Option<ToolResources> {
        if self.tool_resources.is_empty() {
            None
        } else {
            Some(self.tool_resources.clone())
        }
    }
}

impl LabProfile {
    /// Profile for the configured lab
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::for_lab(config.agent.lab, config.backend.bing_connection_id.as_deref())
    }

    /// Build a lab's profile; only the Bing lab needs a connection id
    pub fn for_lab(lab: Lab, bing_connection_id: Option<&str>) -> Result<Self> {
        let profile = match lab {
            Lab::FunctionCalling => Self {
                lab,
                instructions_file: "function_calling.txt",
                hosted_tools: Vec::new(),
                setup: Vec::new(),
            },
            Lab::FileSearch => Self {
                lab,
                instructions_file: "file_search.txt",
                hosted_tools: vec![ToolDefinition::FileSearch],
                setup: vec![SetupStep::VectorStore {
                    name: VECTOR_STORE_NAME,
                    files: vec!["datasheet/contoso-tents-datasheet.pdf"],
                }],
            },
            Lab::CodeInterpreter => Self {
                lab,
                instructions_file: "code_interpreter.txt",
                hosted_tools: vec![ToolDefinition::CodeInterpreter],
                setup: Vec::new(),
            },
            Lab::Multilingual => Self {
                lab,
                instructions_file: "code_interpreter_multilingual.txt",
                hosted_tools: vec![ToolDefinition::CodeInterpreter],
                setup: vec![SetupStep::CodeInterpreterFile {
                    path: "fonts/fonts.zip",
                    placeholder: FONT_FILE_PLACEHOLDER,
                }],
            },
            Lab::BingGrounding => {
                let connection_id = bing_connection_id
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .ok_or_else(|| {
                        AgentError::setup(
                            "No Bing connection id. Set BING_CONNECTION_ID or backend.bing_connection_id",
                        )
                    })?;
                Self {
                    lab,
                    instructions_file: "bing_grounding.txt",
                    hosted_tools: vec![ToolDefinition::bing_grounding(connection_id)],
                    setup: Vec::new(),
                }
            }
        };
        Ok(profile)
    }

    /// Run the setup steps against the service
    ///
    /// Local files are resolved relative to `shared_dir`; a missing file is
    /// a setup error raised before anything is uploaded for that step.
    pub async fn prepare(
        &self,
        backend: &dyn AgentBackend,
        shared_dir: &Path,
    ) -> Result<SetupOutputs> {
        let mut outputs = SetupOutputs::default();

        for step in &self.setup {
            match step {
                SetupStep::VectorStore { name, files } => {
                    let mut file_ids = Vec::with_capacity(files.len());
                    for file in files {
                        file_ids.push(upload(backend, shared_dir, file).await?);
                    }
                    let store_id = backend.create_vector_store(name, &file_ids).await?;
                    info!(vector_store_id = %store_id, "Vector store ready");

                    outputs
                        .tool_resources
                        .file_search
                        .get_or_insert_with(FileSearchResource::default)
                        .vector_store_ids
                        .push(store_id);
                }
                SetupStep::CodeInterpreterFile { path, placeholder } => {
                    let file_id = upload(backend, shared_dir, path).await?;

                    outputs
                        .tool_resources
                        .code_interpreter
                        .get_or_insert_with(CodeInterpreterResource::default)
                        .file_ids
                        .push(file_id.clone());
                    outputs
                        .substitutions
                        .push((placeholder.to_string(), file_id));
                }
            }
        }

        Ok(outputs)
    }
}

async fn upload(backend: &dyn AgentBackend, shared_dir: &Path, relative: &str) -> Result<String> {
    let path = shared_dir.join(relative);
    if !path.is_file() {
        return Err(AgentError::setup(format!(
            "Required file not found at {}",
            path.display()
        )));
    }
    let file_id = backend.upload_file(&path).await?;
    info!(file_id = %file_id, path = %path.display(), "Uploaded file");
    Ok(file_id)
}
