pub mod config;

pub use config::{ConfigError, LiteratureConfig, PipelineConfig};

use admet::{AdmetPredictor, AdmetService, AdmeticaClient};
use anyhow::{Context, Result};
use ingest::{RunDirectory, StepError};
use literature::{LiteratureFetcher, PubMedClient, ReferenceSource};
use normalize::EntityNormalizer;
use report::{ReportCompiler, ReportInputs};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("an error occurred while running the pipeline: {0:#}")]
    Run(#[source] anyhow::Error),
}

/// How a run ended when nothing went fatally wrong.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Absolute path of the compiled report
    Completed(PathBuf),
    /// A step rejected its input; its artifact holds the error payload
    Stopped { step: &'static str, error: StepError },
}

pub struct Pipeline {
    config: PipelineConfig,
    normalizer: EntityNormalizer,
    fetcher: LiteratureFetcher,
    predictor: AdmetPredictor,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        references: Box<dyn ReferenceSource>,
        admet: Box<dyn AdmetService>,
    ) -> Self {
        let normalizer = if config.structure_parsing {
            EntityNormalizer::default()
        } else {
            EntityNormalizer::without_structures()
        };
        let fetcher = LiteratureFetcher::new(references).with_max_results(config.literature.max_results);

        Self {
            config,
            normalizer,
            fetcher,
            predictor: AdmetPredictor::new(admet),
        }
    }

    /// Pipeline talking to PubMed and the configured ADMET service.
    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        let pubmed = PubMedClient::new(&config.literature.pubmed_base_url, timeout)?;
        let admetica = AdmeticaClient::new(&config.admetica_url, timeout)?;

        Ok(Self::new(config, Box::new(pubmed), Box::new(admetica)))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub async fn run(&self) -> Result<RunOutcome, PipelineError> {
        self.run_steps().await.map_err(PipelineError::Run)
    }

    /// load → normalize → literature → ADMET → report, one after another.
    async fn run_steps(&self) -> Result<RunOutcome> {
        let run_dir = RunDirectory::create(&self.config.output_dir).await?;
        tracing::info!(job_id = %run_dir.job_id(), input = %self.config.input_csv.display(), "Run started");

        let rows = match ingest::load_csv(&self.config.input_csv, &run_dir).await? {
            Ok(rows) => rows,
            Err(error) => return Ok(RunOutcome::Stopped { step: "load", error }),
        };

        let entities = normalize::normalize_step(&self.normalizer, &rows.rows, &run_dir)
            .await
            .context("Normalize step failed")?;

        let web_summaries = report::load_web_summaries(self.config.web_summaries.as_deref()).await;

        let bundles = literature::literature_step(&self.fetcher, &entities, &run_dir)
            .await
            .context("Literature step failed")?;

        let predictions = admet::admet_step(&self.predictor, &entities, &run_dir)
            .await
            .context("ADMET step failed")?;

        let report_path = ReportCompiler::new(run_dir)
            .compile(&ReportInputs {
                entities: &entities,
                web_summaries: &web_summaries,
                bundles: &bundles,
                predictions: &predictions,
                input_path: &self.config.input_csv,
            })
            .await
            .context("Report step failed")?;

        Ok(RunOutcome::Completed(report_path))
    }
}
