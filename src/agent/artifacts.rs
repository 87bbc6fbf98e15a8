//! Artifact downloads
//!
//! Files the agent generates (charts, exported data) are referenced by id in
//! completed messages and written to `<directory>/<id>.<ext>`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::backend::AgentBackend;
use crate::core::{AgentError, ArtifactRef, Result, DEFAULT_ARTIFACT_EXTENSION};

/// Downloads artifacts into a local directory
pub struct ArtifactFetcher {
    backend: Arc<dyn AgentBackend>,
    directory: PathBuf,
}

impl ArtifactFetcher {
    pub fn new(backend: Arc<dyn AgentBackend>, directory: impl Into<PathBuf>) -> Self {
        Self {
            backend,
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Local path an artifact is written to
    ///
    /// Ids that are empty or carry characters outside `[A-Za-z0-9_-]` are
    /// refused, so two distinct ids never map onto the same file.
    pub fn path_for(&self, artifact: &ArtifactRef) -> Result<PathBuf> {
        let stem = sanitize(&artifact.file_id);
        if stem.is_empty() || stem != artifact.file_id {
            return Err(AgentError::backend(format!(
                "Artifact id '{}' is not a safe file name",
                artifact.file_id
            )));
        }
        let extension = match sanitize(&artifact.extension) {
            ext if ext.is_empty() => DEFAULT_ARTIFACT_EXTENSION.to_string(),
            ext => ext,
        };
        Ok(self.directory.join(format!("{}.{}", stem, extension)))
    }

    /// Download and write one artifact, overwriting any previous copy
    pub async fn fetch(&self, artifact: &ArtifactRef) -> Result<PathBuf> {
        let path = self.path_for(artifact)?;
        let bytes = self.backend.get_file_content(&artifact.file_id).await?;

        tokio::fs::create_dir_all(&self.directory).await?;
        tokio::fs::write(&path, &bytes).await?;

        debug!(file_id = %artifact.file_id, path = %path.display(), bytes = bytes.len(), "Saved artifact");
        Ok(path)
    }
}

/// Keep only characters that are safe in a file name on every platform
fn sanitize(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}
