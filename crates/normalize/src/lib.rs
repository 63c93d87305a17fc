pub mod normalizer;
pub mod schema;
pub mod structure;

pub use normalizer::{compound_id, EntityNormalizer, NORMALIZED_ID_LEN};
pub use schema::{EntityType, ExtraValue, Extras, NormalizedEntity};
pub use structure::{SmilesToolkit, StructureError, StructureSummary, StructureToolkit, UnavailableToolkit};

use anyhow::Result;
use ingest::{artifacts, RawRow, RunDirectory, StepError, StepOutput};
use serde_json::Value;

/// Normalize step: turn raw rows into entity records and persist them as
/// `normalized_entities.json`.
pub async fn normalize_step(
    normalizer: &EntityNormalizer,
    rows: &[RawRow],
    run_dir: &RunDirectory,
) -> Result<Vec<NormalizedEntity>> {
    let entities = normalizer.normalize_rows(rows);

    let compounds = entities
        .iter()
        .filter(|e| e.entity_type == EntityType::Compound)
        .count();
    tracing::info!(entities = entities.len(), compounds, "Entities normalized");

    run_dir.write_json(artifacts::NORMALIZED_ENTITIES, &entities).await?;
    Ok(entities)
}

/// Validate a `normalized_entities.json` hand-off: a JSON list of entity
/// objects. Anything else becomes a [`StepError`].
pub fn parse_entities(json: &str) -> StepOutput<Vec<NormalizedEntity>> {
    let data: Value = serde_json::from_str(json)
        .map_err(|e| StepError::new(format!("Invalid JSON input: {}", e)))?;

    let Value::Array(items) = data else {
        return Err(StepError::new("Expected a list of entities"));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            if !item.is_object() {
                return Err(StepError::new(format!("Entity {} is not an object", index)));
            }
            serde_json::from_value(item)
                .map_err(|e| StepError::new(format!("Invalid entity {}: {}", index, e)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<RawRow> {
        let mut ethanol = RawRow::new();
        ethanol.insert("entity_type".to_string(), "compound".to_string());
        ethanol.insert("identifier".to_string(), "CCO".to_string());
        ethanol.insert("name".to_string(), "Ethanol".to_string());

        let mut hemoglobin = RawRow::new();
        hemoglobin.insert("entity_type".to_string(), "protein".to_string());
        hemoglobin.insert("identifier".to_string(), "P69905".to_string());

        vec![ethanol, hemoglobin]
    }

    #[tokio::test]
    async fn test_normalize_step_persists_entities() {
        let dir = tempfile::tempdir().unwrap();
        let run_dir = RunDirectory::create(dir.path()).await.unwrap();

        let entities = normalize_step(&EntityNormalizer::default(), &rows(), &run_dir)
            .await
            .unwrap();
        assert_eq!(entities.len(), 2);

        let json = std::fs::read_to_string(run_dir.path(artifacts::NORMALIZED_ENTITIES)).unwrap();
        let parsed = parse_entities(&json).unwrap();
        assert_eq!(parsed, entities);
    }

    #[test]
    fn test_parse_entities_rejects_non_list() {
        let error = parse_entities(r#"{"rows": []}"#).unwrap_err();
        assert_eq!(error.error, "Expected a list of entities");

        let error = parse_entities(r#"[1, 2]"#).unwrap_err();
        assert_eq!(error.error, "Entity 0 is not an object");
    }

    #[test]
    fn test_parse_entities_empty_list() {
        assert!(parse_entities("[]").unwrap().is_empty());
    }
}
