//! PubMed E-utilities client.
//!
//! Endpoints used:
//!   esearch: {base}/esearch.fcgi (query to PMIDs)
//!   esummary: {base}/esummary.fcgi (PMIDs to title and publication date)

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::model::LiteratureRef;
use crate::ReferenceSource;

pub const DEFAULT_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

#[derive(Clone)]
pub struct PubMedClient {
    base_url: String,
    client: reqwest::Client,
}

impl PubMedClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build PubMed HTTP client")?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn get_json(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Value> {
        let url = format!("{}/{}", self.base_url, endpoint);

        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .context(format!("Failed to send {} request", endpoint))?;

        if !response.status().is_success() {
            anyhow::bail!("{} request failed: {}", endpoint, response.status());
        }

        response
            .json()
            .await
            .context(format!("Failed to parse {} response", endpoint))
    }

    /// Search PubMed and return up to `max` PMIDs.
    async fn esearch(&self, query: &str, max: usize) -> Result<Vec<String>> {
        let params = [
            ("db", "pubmed".to_string()),
            ("term", query.to_string()),
            ("retmax", max.to_string()),
            ("retmode", "json".to_string()),
        ];

        let response = self.get_json("esearch.fcgi", &params).await?;
        let ids = parse_esearch(&response);

        tracing::debug!(?ids, query, "PubMed esearch returned PMIDs");
        Ok(ids)
    }

    async fn esummary(&self, ids: &[String], query: &str) -> Result<Vec<LiteratureRef>> {
        let params = [
            ("db", "pubmed".to_string()),
            ("id", ids.join(",")),
            ("retmode", "json".to_string()),
        ];

        let response = self.get_json("esummary.fcgi", &params).await?;
        Ok(parse_esummary(&response, ids, query))
    }
}

#[async_trait]
impl ReferenceSource for PubMedClient {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<LiteratureRef>> {
        let ids = self.esearch(query, max_results).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.esummary(&ids, query).await
    }
}

pub(crate) fn parse_esearch(response: &Value) -> Vec<String> {
    response["esearchresult"]["idlist"]
        .as_array()
        .map(|ids| {
            ids.iter()
                .filter_map(|id| id.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

/// One reference per PMID, in esearch order. A PMID missing from the summary
/// still yields a linked reference titled with the query.
pub(crate) fn parse_esummary(response: &Value, ids: &[String], query: &str) -> Vec<LiteratureRef> {
    let docs = &response["result"];

    ids.iter()
        .map(|pmid| {
            let doc = &docs[pmid.as_str()];
            let title = doc["title"]
                .as_str()
                .filter(|t| !t.is_empty())
                .unwrap_or(query);
            let year = doc["pubdate"].as_str().and_then(parse_year);
            LiteratureRef::pubmed(pmid, title, year)
        })
        .collect()
}

/// Year from the leading four characters of a PubMed `pubdate`, e.g. "2019 Mar 4".
pub(crate) fn parse_year(pubdate: &str) -> Option<i32> {
    let head: String = pubdate.chars().take(4).collect();
    if head.len() == 4 && head.chars().all(|c| c.is_ascii_digit()) {
        head.parse().ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_year() {
        assert_eq!(parse_year("2019 Mar 4"), Some(2019));
        assert_eq!(parse_year("1998"), Some(1998));
        assert_eq!(parse_year("Spring 2001"), None);
        assert_eq!(parse_year("201"), None);
        assert_eq!(parse_year(""), None);
    }

    #[test]
    fn test_parse_esearch() {
        let response = json!({ "esearchresult": { "count": "2", "idlist": ["111", "222"] } });
        assert_eq!(parse_esearch(&response), vec!["111", "222"]);

        assert!(parse_esearch(&json!({ "error": "bad" })).is_empty());
    }

    #[test]
    fn test_parse_esummary() {
        let response = json!({
            "result": {
                "uids": ["111", "222"],
                "111": { "title": "Ethanol and the liver", "pubdate": "2015 Jan" },
                "222": { "title": "", "pubdate": "n.d." }
            }
        });
        let ids = vec!["111".to_string(), "222".to_string(), "333".to_string()];

        let refs = parse_esummary(&response, &ids, "Ethanol");
        assert_eq!(refs.len(), 3);
        assert_eq!(refs[0].title, "Ethanol and the liver");
        assert_eq!(refs[0].year, Some(2015));
        assert_eq!(refs[0].url.as_deref(), Some("https://pubmed.ncbi.nlm.nih.gov/111/"));
        assert_eq!(refs[1].title, "Ethanol");
        assert_eq!(refs[1].year, None);
        assert_eq!(refs[2].pmid.as_deref(), Some("333"));
        assert_eq!(refs[2].title, "Ethanol");
    }

    #[tokio::test]
    #[ignore] // Requires network access to NCBI
    async fn test_live_pubmed_search() {
        let client = PubMedClient::new(DEFAULT_BASE_URL, Duration::from_secs(10)).unwrap();
        let refs = client.search("ethanol metabolism", 3).await.unwrap();
        assert!(!refs.is_empty());
        assert!(refs.len() <= 3);
    }
}
