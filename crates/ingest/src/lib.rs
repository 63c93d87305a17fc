pub mod artifacts;
pub mod hash;
pub mod reader;

pub use artifacts::RunDirectory;
pub use hash::{hash_bytes, hash_file};
pub use reader::{CsvReader, RawRow, RawRows};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Structured payload a step emits in place of its output when its input
/// fails validation. Serialized as `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepError {
    pub error: String,
}

impl StepError {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into() }
    }
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.error)
    }
}

impl std::error::Error for StepError {}

pub type StepOutput<T> = std::result::Result<T, StepError>;

/// Load step: read the input CSV and persist it as `raw_input.json`.
///
/// A missing or malformed file is reported as a [`StepError`]; only failures
/// to write the artifact are returned as errors.
pub async fn load_csv(path: &Path, run_dir: &RunDirectory) -> Result<StepOutput<RawRows>> {
    let output = if !path.exists() {
        Err(StepError::new(format!("File not found: {}", path.display())))
    } else {
        CsvReader::read_file(path)
            .await
            .map_err(|e| StepError::new(format!("{:#}", e)))
    };

    match &output {
        Ok(rows) => tracing::info!(rows = rows.len(), path = %path.display(), "CSV loaded"),
        Err(e) => tracing::warn!(error = %e, "CSV load failed"),
    }

    run_dir.write_step(artifacts::RAW_INPUT, &output).await?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_csv_writes_raw_input() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("input.csv");
        std::fs::write(&csv_path, "entity_type,identifier,name,context_tags\ncompound,CCO,Ethanol,\n").unwrap();

        let run_dir = RunDirectory::create(dir.path().join("output")).await.unwrap();
        let rows = load_csv(&csv_path, &run_dir).await.unwrap().unwrap();

        assert_eq!(rows.len(), 1);
        let written: RawRows = serde_json::from_str(
            &std::fs::read_to_string(run_dir.path(artifacts::RAW_INPUT)).unwrap(),
        )
        .unwrap();
        assert_eq!(written, rows);
    }

    #[tokio::test]
    async fn test_load_missing_file_is_step_error() {
        let dir = tempfile::tempdir().unwrap();
        let run_dir = RunDirectory::create(dir.path()).await.unwrap();

        let output = load_csv(&dir.path().join("missing.csv"), &run_dir).await.unwrap();
        let error = output.unwrap_err();
        assert!(error.error.starts_with("File not found:"));
    }
}
