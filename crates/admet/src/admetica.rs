use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::AdmetService;

/// Models requested from the service, in response column order.
pub const MODELS: [&str; 5] = ["solubility", "ppbr", "cyp1a2-inhibitor", "cl-hepa", "herg"];

/// One cell of the prediction response.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Number(f64),
    Text(String),
}

impl Field {
    fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.parse::<f64>() {
            Ok(value) => Field::Number(value),
            Err(_) => Field::Text(raw.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Field::Number(value) => Some(*value),
            Field::Text(_) => None,
        }
    }
}

/// Client for an Admetica-compatible `/predict` endpoint.
#[derive(Clone)]
pub struct AdmeticaClient {
    base_url: String,
    client: reqwest::Client,
}

impl AdmeticaClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build ADMET HTTP client")?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl AdmetService for AdmeticaClient {
    async fn predict(&self, smiles: &str) -> Result<BTreeMap<String, Field>> {
        let url = format!("{}/predict", self.base_url);
        let models = MODELS.join(",");
        let params = [
            ("models", models.as_str()),
            ("smiles_column", "smiles"),
            ("probability", "false"),
        ];

        tracing::debug!(url = %url, smiles, "Requesting ADMET prediction");

        let response = self
            .client
            .post(&url)
            .query(&params)
            .header("accept", "text/csv")
            .header("Content-Type", "text/csv")
            .body(format!("smiles\n{}\n", smiles))
            .send()
            .await
            .context("Failed to send ADMET request")?;

        if !response.status().is_success() {
            anyhow::bail!("ADMET request failed: {}", response.status());
        }

        let body = response
            .text()
            .await
            .context("Failed to read ADMET response")?;

        parse_results(&body)
    }
}

/// Parse a CSV response into column name → value, from the first data row.
/// A response without data rows gives an empty map.
pub fn parse_results(body: &str) -> Result<BTreeMap<String, Field>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(body.as_bytes());

    let headers = reader
        .headers()
        .context("Failed to read ADMET response header")?
        .clone();

    let Some(record) = reader.records().next() else {
        return Ok(BTreeMap::new());
    };
    let record = record.context("Failed to read ADMET response row")?;

    Ok(headers
        .iter()
        .zip(record.iter())
        .map(|(name, value)| (name.trim().to_string(), Field::parse(value)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_results() {
        let body = "smiles,solubility,ppbr,cyp1a2-inhibitor,cl-hepa,herg\nCCO,0.5,0.3,0.1,0.2,0.05\n";
        let fields = parse_results(body).unwrap();

        assert_eq!(fields["smiles"], Field::Text("CCO".to_string()));
        assert_eq!(fields["solubility"], Field::Number(0.5));
        assert_eq!(fields["herg"].as_f64(), Some(0.05));
    }

    #[test]
    fn test_parse_results_first_row_only() {
        let fields = parse_results("herg\n0.1\n0.9\n").unwrap();
        assert_eq!(fields["herg"], Field::Number(0.1));
    }

    #[test]
    fn test_parse_results_header_only() {
        assert!(parse_results("solubility,ppbr\n").unwrap().is_empty());
        assert!(parse_results("").unwrap().is_empty());
    }
}
