use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// Free-text summaries gathered from the web for one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LitWebSummary {
    pub normalized_id: String,
    pub summaries: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LitWebSummaries {
    pub items: Vec<LitWebSummary>,
}

/// Read a web summaries document. A missing path, an unreadable file or
/// invalid JSON all give `Value::Null`, which indexes to nothing.
pub async fn load_web_summaries(path: Option<&Path>) -> Value {
    let Some(path) = path else {
        return Value::Null;
    };

    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Web summaries unreadable");
            return Value::Null;
        }
    };

    serde_json::from_str(&text).unwrap_or_else(|e| {
        tracing::warn!(path = %path.display(), error = %e, "Web summaries are not valid JSON");
        Value::Null
    })
}

/// Key summaries by `normalized_id`. Later items win on duplicate ids.
pub fn index_web_summaries(web: &Value) -> HashMap<String, Vec<String>> {
    let Some(items) = web.get("items").and_then(Value::as_array) else {
        if !web.is_null() {
            tracing::warn!("Unexpected web summaries structure, ignoring");
        }
        return HashMap::new();
    };

    items
        .iter()
        .filter_map(|item| match LitWebSummary::deserialize(item) {
            Ok(summary) => Some((summary.normalized_id, summary.summaries)),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed web summary item");
                None
            }
        })
        .collect()
}
