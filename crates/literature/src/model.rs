use serde::{Deserialize, Serialize};

fn default_source() -> String {
    "pubmed".to_string()
}

/// A single citation, real or placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiteratureRef {
    pub title: String,
    pub year: Option<i32>,
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default)]
    pub pmid: Option<String>,
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub snippet: Option<String>,
}

impl LiteratureRef {
    pub fn new(title: impl Into<String>, year: Option<i32>) -> Self {
        Self {
            title: title.into(),
            year,
            source: default_source(),
            pmid: None,
            doi: None,
            url: None,
            snippet: None,
        }
    }

    /// Reference to a PubMed article, linked by its PMID.
    pub fn pubmed(pmid: &str, title: impl Into<String>, year: Option<i32>) -> Self {
        Self {
            pmid: Some(pmid.to_string()),
            url: Some(format!("https://pubmed.ncbi.nlm.nih.gov/{}/", pmid)),
            ..Self::new(title, year)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiteratureBundle {
    pub normalized_id: String,
    #[serde(default)]
    pub references: Vec<LiteratureRef>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pubmed_ref_url() {
        let r = LiteratureRef::pubmed("12345", "Ethanol metabolism", Some(2020));
        assert_eq!(r.url.as_deref(), Some("https://pubmed.ncbi.nlm.nih.gov/12345/"));
        assert_eq!(r.source, "pubmed");
    }

    #[test]
    fn test_source_defaults_on_deserialize() {
        let r: LiteratureRef = serde_json::from_str(r#"{"title": "x", "year": null}"#).unwrap();
        assert_eq!(r.source, "pubmed");
        assert!(r.pmid.is_none());
    }
}
