pub mod render;
pub mod web;

pub use render::{render_markdown, Joined, Preamble};
pub use web::{index_web_summaries, load_web_summaries, LitWebSummaries, LitWebSummary};

use admet::AdmetPrediction;
use anyhow::Result;
use ingest::{artifacts, RunDirectory};
use literature::LiteratureBundle;
use normalize::NormalizedEntity;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Metadata for one run, persisted as `run_meta.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub job_id: String,
    pub input_hash: String,
    pub n_entities: usize,
    pub outputs: BTreeMap<String, String>,
}

/// Everything the compiler joins.
pub struct ReportInputs<'a> {
    pub entities: &'a [NormalizedEntity],
    pub web_summaries: &'a Value,
    pub bundles: &'a [LiteratureBundle],
    pub predictions: &'a [AdmetPrediction],
    pub input_path: &'a Path,
}

pub struct ReportCompiler {
    run_dir: RunDirectory,
}

impl ReportCompiler {
    pub fn new(run_dir: RunDirectory) -> Self {
        Self { run_dir }
    }

    /// Join all artifacts onto the entity list, write `report.md` and
    /// `run_meta.json`, and return the report's absolute path.
    pub async fn compile(&self, inputs: &ReportInputs<'_>) -> Result<PathBuf> {
        let joined = Joined::new(
            index_web_summaries(inputs.web_summaries),
            inputs.bundles,
            inputs.predictions,
        );

        let input_hash = ingest::hash_file(inputs.input_path).await?;
        let job_id = self.run_dir.job_id();
        let input_file = inputs.input_path.display().to_string();

        let preamble = Preamble {
            job_id: &job_id,
            input_file: &input_file,
            input_hash: &input_hash,
        };
        let markdown = render_markdown(&preamble, inputs.entities, &joined)?;
        let report_path = self.run_dir.write_text(artifacts::REPORT_MD, &markdown).await?;

        let meta = RunReport {
            job_id,
            input_hash,
            n_entities: inputs.entities.len(),
            outputs: self.outputs(&report_path),
        };
        self.run_dir.write_json(artifacts::RUN_META, &meta).await?;

        tracing::info!(
            entities = meta.n_entities,
            with_literature = joined.literature.len(),
            with_admet = joined.admet.len(),
            report = %report_path.display(),
            "Report compiled"
        );

        Ok(report_path)
    }

    fn outputs(&self, report_path: &Path) -> BTreeMap<String, String> {
        let path = |artifact: &str| self.run_dir.path(artifact).display().to_string();

        BTreeMap::from([
            ("report_md".to_string(), report_path.display().to_string()),
            ("entities_json".to_string(), path(artifacts::NORMALIZED_ENTITIES)),
            ("literature_json".to_string(), path(artifacts::LITERATURE_REFS)),
            ("admet_json".to_string(), path(artifacts::ADMET_PREDICTIONS)),
        ])
    }
}
