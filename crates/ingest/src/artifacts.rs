use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::StepOutput;

pub const RAW_INPUT: &str = "raw_input.json";
pub const NORMALIZED_ENTITIES: &str = "normalized_entities.json";
pub const LITERATURE_REFS: &str = "literature_refs.json";
pub const ADMET_PREDICTIONS: &str = "admet_predictions.json";
pub const REPORT_MD: &str = "report.md";
pub const RUN_META: &str = "run_meta.json";

/// The directory every step of a run writes its artifact into.
///
/// Artifacts are overwritten in place on every run.
#[derive(Debug, Clone)]
pub struct RunDirectory {
    root: PathBuf,
}

impl RunDirectory {
    /// Create the directory if needed and resolve it to an absolute path.
    pub async fn create(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();

        fs::create_dir_all(root)
            .await
            .context(format!("Failed to create output directory: {:?}", root))?;

        let root = fs::canonicalize(root)
            .await
            .context(format!("Failed to resolve output directory: {:?}", root))?;

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, artifact: &str) -> PathBuf {
        self.root.join(artifact)
    }

    /// Run identifier, taken from the directory name
    pub fn job_id(&self) -> String {
        self.root
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    pub async fn write_text(&self, artifact: &str, text: &str) -> Result<PathBuf> {
        let path = self.path(artifact);
        fs::write(&path, text)
            .await
            .context(format!("Failed to write artifact: {:?}", path))?;

        tracing::debug!(artifact, bytes = text.len(), "Artifact written");
        Ok(path)
    }

    pub async fn write_json<T: Serialize + ?Sized>(&self, artifact: &str, value: &T) -> Result<PathBuf> {
        let json = serde_json::to_string_pretty(value)
            .context(format!("Failed to serialize artifact: {}", artifact))?;
        self.write_text(artifact, &json).await
    }

    /// Persist a step's output, or its error payload when validation failed.
    pub async fn write_step<T: Serialize>(&self, artifact: &str, output: &StepOutput<T>) -> Result<PathBuf> {
        match output {
            Ok(value) => self.write_json(artifact, value).await,
            Err(error) => self.write_json(artifact, error).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StepError;

    #[tokio::test]
    async fn test_create_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("run-42");

        let first = RunDirectory::create(&root).await.unwrap();
        let second = RunDirectory::create(&root).await.unwrap();

        assert_eq!(first.root(), second.root());
        assert!(first.root().is_absolute());
        assert_eq!(first.job_id(), "run-42");
    }

    #[tokio::test]
    async fn test_write_step_error_payload() {
        let dir = tempfile::tempdir().unwrap();
        let run_dir = RunDirectory::create(dir.path()).await.unwrap();

        let output: StepOutput<Vec<u32>> = Err(StepError::new("bad input"));
        let path = run_dir.write_step(RAW_INPUT, &output).await.unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(written, serde_json::json!({ "error": "bad input" }));
    }

    #[tokio::test]
    async fn test_rewrite_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let run_dir = RunDirectory::create(dir.path()).await.unwrap();

        run_dir.write_text(REPORT_MD, "first run, longer content").await.unwrap();
        let path = run_dir.write_text(REPORT_MD, "second").await.unwrap();

        assert_eq!(std::fs::read_to_string(path).unwrap(), "second");
    }
}
