use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tokio::fs;

/// One CSV record keyed by header name. Values are kept as raw strings.
pub type RawRow = BTreeMap<String, String>;

/// Verbatim CSV content, the shape persisted as `raw_input.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRows {
    pub rows: Vec<RawRow>,
}

impl RawRows {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

pub struct CsvReader;

impl CsvReader {
    pub async fn read_file(path: &Path) -> Result<RawRows> {
        let content = fs::read(path)
            .await
            .context(format!("Failed to read file: {:?}", path))?;

        Self::parse(&content)
    }

    /// Parse CSV bytes with a header row. Short records only yield the
    /// columns they have; extra cells beyond the header are dropped.
    pub fn parse(bytes: &[u8]) -> Result<RawRows> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(bytes);

        let headers = reader
            .headers()
            .context("Failed to read CSV header")?
            .clone();

        let mut rows = Vec::new();

        for (index, record) in reader.records().enumerate() {
            let record = record.context(format!("Malformed CSV record at row {}", index))?;

            let row: RawRow = headers
                .iter()
                .zip(record.iter())
                .map(|(header, value)| (header.trim().to_string(), value.to_string()))
                .collect();

            rows.push(row);
        }

        Ok(RawRows { rows })
    }
}
