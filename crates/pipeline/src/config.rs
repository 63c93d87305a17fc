use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_OUTPUT_DIR: &str = "output";
pub const DEFAULT_PUBMED_BASE_URL: &str = literature::pubmed::DEFAULT_BASE_URL;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub input_csv: PathBuf,
    pub admetica_url: String,
    pub output_dir: PathBuf,
    pub web_summaries: Option<PathBuf>,
    pub literature: LiteratureConfig,
    pub request_timeout_secs: u64,
    pub structure_parsing: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiteratureConfig {
    pub pubmed_base_url: String,
    pub max_results: usize,
}

impl Default for LiteratureConfig {
    fn default() -> Self {
        Self {
            pubmed_base_url: DEFAULT_PUBMED_BASE_URL.to_string(),
            max_results: literature::DEFAULT_MAX_RESULTS,
        }
    }
}

impl PipelineConfig {
    /// Config with every optional knob at its default.
    pub fn new(input_csv: impl Into<PathBuf>, admetica_url: impl Into<String>) -> Self {
        Self {
            input_csv: input_csv.into(),
            admetica_url: admetica_url.into(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            web_summaries: None,
            literature: LiteratureConfig::default(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            structure_parsing: true,
        }
    }

    /// Resolve from the process environment, after loading `.env` over it.
    /// The first CLI argument, when given, takes precedence over `INPUT_CSV`.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv_override() {
            if !e.not_found() {
                tracing::warn!(error = %e, "Failed to load .env");
            }
        }

        let arg = std::env::args().nth(1);
        Self::from_lookup(arg, |key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(input_arg: Option<String>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let input_csv = input_arg
            .filter(|v| !v.trim().is_empty())
            .or_else(|| get("INPUT_CSV"))
            .ok_or(ConfigError::Missing("INPUT_CSV"))?;
        let admetica_url = get("ADMETICA_API").ok_or(ConfigError::Missing("ADMETICA_API"))?;

        let mut config = Self::new(input_csv, admetica_url.trim());

        if let Some(dir) = get("OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }
        config.web_summaries = get("WEB_SUMMARIES_JSON").map(PathBuf::from);
        if let Some(url) = get("PUBMED_BASE_URL") {
            config.literature.pubmed_base_url = url.trim().to_string();
        }
        if let Some(value) = get("REQUEST_TIMEOUT_SECS") {
            config.request_timeout_secs = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { key: "REQUEST_TIMEOUT_SECS", value })?;
        }
        if let Some(value) = get("DISABLE_STRUCTURE_PARSING") {
            config.structure_parsing = !is_truthy(&value);
        }

        Ok(config)
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::from_lookup(
            None,
            lookup(&[("INPUT_CSV", "data/input.csv"), ("ADMETICA_API", "http://localhost:8000")]),
        )
        .unwrap();

        assert_eq!(config, PipelineConfig::new("data/input.csv", "http://localhost:8000"));
        assert_eq!(config.output_dir, PathBuf::from("output"));
        assert_eq!(config.request_timeout_secs, 10);
        assert_eq!(config.literature.max_results, 5);
        assert!(config.structure_parsing);
    }

    #[test]
    fn test_missing_admetica_is_fatal() {
        let result = PipelineConfig::from_lookup(Some("in.csv".to_string()), lookup(&[]));
        assert_eq!(result, Err(ConfigError::Missing("ADMETICA_API")));

        let result = PipelineConfig::from_lookup(Some("in.csv".to_string()), lookup(&[("ADMETICA_API", "  ")]));
        assert_eq!(result, Err(ConfigError::Missing("ADMETICA_API")));
    }

    #[test]
    fn test_missing_input() {
        let result = PipelineConfig::from_lookup(None, lookup(&[("ADMETICA_API", "http://x")]));
        assert_eq!(result, Err(ConfigError::Missing("INPUT_CSV")));
    }

    #[test]
    fn test_overrides() {
        let config = PipelineConfig::from_lookup(
            Some("arg.csv".to_string()),
            lookup(&[
                ("INPUT_CSV", "env.csv"),
                ("ADMETICA_API", "http://admet:8000"),
                ("OUTPUT_DIR", "runs/42"),
                ("WEB_SUMMARIES_JSON", "web.json"),
                ("PUBMED_BASE_URL", "http://127.0.0.1:9999"),
                ("REQUEST_TIMEOUT_SECS", "3"),
                ("DISABLE_STRUCTURE_PARSING", "1"),
            ]),
        )
        .unwrap();

        assert_eq!(config.input_csv, PathBuf::from("arg.csv"));
        assert_eq!(config.output_dir, PathBuf::from("runs/42"));
        assert_eq!(config.web_summaries, Some(PathBuf::from("web.json")));
        assert_eq!(config.literature.pubmed_base_url, "http://127.0.0.1:9999");
        assert_eq!(config.request_timeout_secs, 3);
        assert!(!config.structure_parsing);
    }

    #[test]
    fn test_invalid_timeout() {
        let result = PipelineConfig::from_lookup(
            Some("in.csv".to_string()),
            lookup(&[("ADMETICA_API", "http://x"), ("REQUEST_TIMEOUT_SECS", "soon")]),
        );
        assert!(matches!(result, Err(ConfigError::Invalid { key: "REQUEST_TIMEOUT_SECS", .. })));
    }
}
