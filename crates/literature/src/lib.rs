pub mod model;
pub mod pubmed;

pub use model::{LiteratureBundle, LiteratureRef};
pub use pubmed::PubMedClient;

use anyhow::Result;
use async_trait::async_trait;
use ingest::{artifacts, RunDirectory};
use normalize::NormalizedEntity;

/// Number of PMIDs requested per entity
pub const DEFAULT_MAX_RESULTS: usize = 5;

/// Anything that can turn a free-text query into citations.
#[async_trait]
pub trait ReferenceSource: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<LiteratureRef>>;
}

/// Result of looking up one entity.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    Found(Vec<LiteratureRef>),
    /// The search failed or came back empty; placeholders stand in
    Degraded(String),
}

/// Query text for an entity: its name (or identifier) followed by its tags.
pub fn build_query(entity: &NormalizedEntity) -> String {
    let mut query = entity.display_name().to_string();
    if !entity.context_tags.is_empty() {
        query.push(' ');
        query.push_str(&entity.context_tags.join(" "));
    }
    query
}

/// The two synthetic citations used when no real reference is available.
pub fn placeholder_refs(query: &str) -> Vec<LiteratureRef> {
    vec![
        LiteratureRef::new(format!("{} – placeholder study", query), Some(2018)),
        LiteratureRef::new(format!("{} – review article", query), Some(2021)),
    ]
}

pub struct LiteratureFetcher {
    source: Box<dyn ReferenceSource>,
    max_results: usize,
}

impl LiteratureFetcher {
    pub fn new(source: Box<dyn ReferenceSource>) -> Self {
        Self {
            source,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub async fn lookup(&self, query: &str) -> LookupOutcome {
        if query.trim().is_empty() {
            return LookupOutcome::Degraded("empty query".to_string());
        }

        match self.source.search(query, self.max_results).await {
            Ok(refs) if refs.is_empty() => LookupOutcome::Degraded("no results".to_string()),
            Ok(refs) => LookupOutcome::Found(refs),
            Err(e) => LookupOutcome::Degraded(format!("{:#}", e)),
        }
    }

    /// One bundle per entity, in input order. Entities are looked up one at a time.
    pub async fn fetch_all(&self, entities: &[NormalizedEntity]) -> Vec<LiteratureBundle> {
        let mut bundles = Vec::with_capacity(entities.len());

        for entity in entities {
            let query = build_query(entity);

            let references = match self.lookup(&query).await {
                LookupOutcome::Found(refs) => {
                    tracing::debug!(normalized_id = %entity.normalized_id, refs = refs.len(), "References found");
                    refs
                }
                LookupOutcome::Degraded(reason) => {
                    tracing::warn!(
                        normalized_id = %entity.normalized_id,
                        query = %query,
                        error = %reason,
                        "Literature lookup degraded to placeholders"
                    );
                    placeholder_refs(&query)
                }
            };

            bundles.push(LiteratureBundle {
                normalized_id: entity.normalized_id.clone(),
                references,
            });
        }

        bundles
    }
}

/// Literature step: fetch bundles for every entity and persist
/// `literature_refs.json`.
pub async fn literature_step(
    fetcher: &LiteratureFetcher,
    entities: &[NormalizedEntity],
    run_dir: &RunDirectory,
) -> Result<Vec<LiteratureBundle>> {
    let bundles = fetcher.fetch_all(entities).await;

    let real = bundles
        .iter()
        .filter(|b| b.references.iter().any(|r| r.pmid.is_some()))
        .count();
    tracing::info!(bundles = bundles.len(), with_pubmed_refs = real, "Literature fetched");

    run_dir.write_json(artifacts::LITERATURE_REFS, &bundles).await?;
    Ok(bundles)
}
