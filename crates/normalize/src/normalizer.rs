use ingest::{RawRow, StepError, StepOutput};
use serde_json::Value;

use crate::schema::{EntityType, Extras, NormalizedEntity};
use crate::structure::{SmilesToolkit, StructureError, StructureToolkit, UnavailableToolkit};

/// Length of the hex prefix used as a compound's normalized id
pub const NORMALIZED_ID_LEN: usize = 27;

pub struct EntityNormalizer {
    toolkit: Box<dyn StructureToolkit>,
}

impl Default for EntityNormalizer {
    fn default() -> Self {
        Self::new(Box::new(SmilesToolkit))
    }
}

impl EntityNormalizer {
    pub fn new(toolkit: Box<dyn StructureToolkit>) -> Self {
        Self { toolkit }
    }

    /// Normalizer that never parses structures; compounds keep their raw ids.
    pub fn without_structures() -> Self {
        Self::new(Box::new(UnavailableToolkit))
    }

    /// Normalize rows in order; `row_id` is the row's position.
    pub fn normalize_rows(&self, rows: &[RawRow]) -> Vec<NormalizedEntity> {
        rows.iter()
            .enumerate()
            .map(|(row_id, row)| self.normalize_row(row_id, row))
            .collect()
    }

    /// Normalize a JSON hand-off: either a list of rows or `{"rows": [...]}`.
    pub fn normalize_json(&self, json: &str) -> StepOutput<Vec<NormalizedEntity>> {
        let data: Value = serde_json::from_str(json)
            .map_err(|e| StepError::new(format!("Invalid JSON input: {}", e)))?;

        let rows = match &data {
            Value::Array(rows) => rows.as_slice(),
            Value::Object(map) => match map.get("rows") {
                Some(Value::Array(rows)) => rows.as_slice(),
                None => &[],
                Some(other) => {
                    return Err(StepError::new(format!(
                        "Expected a list of rows, got {}",
                        json_kind(other)
                    )));
                }
            },
            other => {
                return Err(StepError::new(format!(
                    "Expected list or object, got {}",
                    json_kind(other)
                )));
            }
        };

        let rows: Vec<RawRow> = rows.iter().map(row_from_value).collect();
        Ok(self.normalize_rows(&rows))
    }

    pub fn normalize_row(&self, row_id: usize, row: &RawRow) -> NormalizedEntity {
        let field = |key: &str| row.get(key).map(|v| v.trim()).unwrap_or("");

        let entity_type = EntityType::from(field("entity_type"));
        let identifier = field("identifier").to_string();
        let name = Some(field("name")).filter(|n| !n.is_empty()).map(str::to_string);
        let context_tags = split_tags(field("context_tags"));

        let mut normalized_id = identifier.clone();
        let mut extras = Extras::new();

        match entity_type {
            EntityType::Compound => match self.toolkit.analyze(&identifier) {
                Ok(summary) => {
                    normalized_id = compound_id(&summary.canonical_smiles);
                    extras.insert("mw".to_string(), summary.mw.into());
                    extras.insert("logp".to_string(), summary.logp.into());
                    extras.insert("canonical_smiles".to_string(), summary.canonical_smiles.into());
                }
                Err(StructureError::Unavailable) => {
                    extras.insert(
                        "note".to_string(),
                        "Structure parsing not available; kept original identifier".into(),
                    );
                }
                Err(e) => {
                    tracing::warn!(row_id, identifier = %identifier, error = %e, "Compound not normalized");
                    extras.insert(
                        "note".to_string(),
                        format!("Could not parse structure ({}); kept original identifier", e).into(),
                    );
                }
            },
            EntityType::Protein => {
                extras.insert(
                    "note".to_string(),
                    "Protein normalization is a pass-through".into(),
                );
            }
            _ => {}
        }

        NormalizedEntity {
            row_id,
            entity_type,
            identifier,
            normalized_id,
            name,
            context_tags,
            extras,
        }
    }
}

/// Stable id for a compound: hex SHA-1 prefix of its canonical form
pub fn compound_id(canonical: &str) -> String {
    let mut digest = ingest::hash_bytes(canonical.as_bytes());
    digest.truncate(NORMALIZED_ID_LEN);
    digest
}

fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

/// Convert a JSON row to string cells; anything but an object is an empty row.
fn row_from_value(value: &Value) -> RawRow {
    let Value::Object(map) = value else {
        return RawRow::new();
    };

    map.iter()
        .filter_map(|(key, value)| {
            let text = match value {
                Value::Null => return None,
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            Some((key.clone(), text))
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ExtraValue;

    fn row(entity_type: &str, identifier: &str, name: &str, tags: &str) -> RawRow {
        [
            ("entity_type", entity_type),
            ("identifier", identifier),
            ("name", name),
            ("context_tags", tags),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn test_compound_normalization() {
        let normalizer = EntityNormalizer::default();
        let entity = normalizer.normalize_row(0, &row(" Compound ", " CCO ", "Ethanol", ""));

        assert_eq!(entity.entity_type, EntityType::Compound);
        assert_eq!(entity.identifier, "CCO");
        assert_eq!(entity.normalized_id.len(), NORMALIZED_ID_LEN);
        assert_eq!(entity.normalized_id, compound_id("CCO"));
        assert_eq!(entity.extras["canonical_smiles"], ExtraValue::Text("CCO".to_string()));
        assert!(matches!(entity.extras["mw"], ExtraValue::Number(mw) if (mw - 46.069).abs() < 1e-3));
        assert!(entity.extras.contains_key("logp"));
    }

    #[test]
    fn test_equivalent_smiles_share_id() {
        let normalizer = EntityNormalizer::default();
        let ids: Vec<String> = ["CCO", "OCC", "C(O)C"]
            .iter()
            .map(|smiles| normalizer.normalize_row(0, &row("compound", smiles, "", "")).normalized_id)
            .collect();

        assert_eq!(ids[0], ids[1]);
        assert_eq!(ids[1], ids[2]);

        // Same input in a fresh normalizer gives the same id
        let again = EntityNormalizer::default().normalize_row(5, &row("compound", "CCO", "", ""));
        assert_eq!(again.normalized_id, ids[0]);
    }

    fn compound(normalizer: &EntityNormalizer, smiles: &str) -> String {
        normalizer.normalize_row(0, &row("compound", smiles, "", "")).normalized_id
    }

    #[test]
    fn test_kekule_aromatic_and_hydrogen_forms_share_id() {
        let normalizer = EntityNormalizer::default();
        for (a, b) in [
            ("c1ccccc1", "C1=CC=CC=C1"),
            ("CC1=C(O)C=CC=C1", "CC1=CC=CC=C1O"),
            ("Oc1ccccc1", "C1=CC=C(C=C1)O"),
            ("[H]OCC", "CCO"),
        ] {
            assert_eq!(compound(&normalizer, a), compound(&normalizer, b), "{} vs {}", a, b);
        }
        assert_eq!(compound(&normalizer, "C1=CC=CC=C1").len(), NORMALIZED_ID_LEN);
    }

    #[test]
    fn test_stereoisomers_get_distinct_ids() {
        let normalizer = EntityNormalizer::default();
        assert_ne!(compound(&normalizer, "C[C@@H](O)F"), compound(&normalizer, "C[C@H](O)F"));
        assert_ne!(compound(&normalizer, "F/C=C/F"), compound(&normalizer, "F/C=C\\F"));
        assert_eq!(compound(&normalizer, "C[C@@H](O)F"), compound(&normalizer, "O[C@H](C)F"));

        let entity = normalizer.normalize_row(0, &row("compound", "F/C=C\\F", "", ""));
        assert_eq!(entity.extras["canonical_smiles"], ExtraValue::Text("C(=C/F)/F".to_string()));
    }

    #[test]
    fn test_overvalent_compound_keeps_identifier() {
        let normalizer = EntityNormalizer::default();
        let smiles = format!("C{}", "(C)".repeat(300));
        let entity = normalizer.normalize_row(0, &row("compound", &smiles, "", ""));

        assert_eq!(entity.normalized_id, smiles);
        assert!(matches!(&entity.extras["note"], ExtraValue::Text(note) if note.contains("kept original identifier")));
    }

    #[test]
    fn test_unparseable_compound_keeps_identifier() {
        let normalizer = EntityNormalizer::default();
        let entity = normalizer.normalize_row(0, &row("compound", "not-a-smiles(", "", ""));

        assert_eq!(entity.normalized_id, "not-a-smiles(");
        assert!(matches!(&entity.extras["note"], ExtraValue::Text(note) if note.contains("kept original identifier")));
    }

    #[test]
    fn test_structure_parsing_unavailable() {
        let normalizer = EntityNormalizer::without_structures();
        let entity = normalizer.normalize_row(0, &row("compound", "CCO", "", ""));

        assert_eq!(entity.normalized_id, "CCO");
        assert_eq!(
            entity.extras["note"],
            ExtraValue::Text("Structure parsing not available; kept original identifier".to_string())
        );
    }

    #[test]
    fn test_protein_and_other_pass_through() {
        let normalizer = EntityNormalizer::default();

        let protein = normalizer.normalize_row(0, &row("protein", "P69905", "HBA1", "oxygen transport"));
        assert_eq!(protein.normalized_id, "P69905");
        assert!(protein.extras.contains_key("note"));

        let peptide = normalizer.normalize_row(1, &row("peptide", "GLP-1", "", ""));
        assert_eq!(peptide.normalized_id, "GLP-1");
        assert!(peptide.extras.is_empty());
        assert!(peptide.name.is_none());

        let unknown = normalizer.normalize_row(2, &row("", "X", "", ""));
        assert_eq!(unknown.entity_type, EntityType::Other(String::new()));
        assert!(unknown.extras.is_empty());
    }

    #[test]
    fn test_context_tags_split() {
        let normalizer = EntityNormalizer::default();
        let entity = normalizer.normalize_row(0, &row("protein", "P1", "", " kinase, ,oncology ,  ,lung"));
        assert_eq!(entity.context_tags, vec!["kinase", "oncology", "lung"]);
    }

    #[test]
    fn test_row_ids_dense_in_order() {
        let normalizer = EntityNormalizer::default();
        let rows = vec![
            row("compound", "CCO", "Ethanol", ""),
            row("protein", "P69905", "", ""),
            row("compound", "OCC", "", ""),
            row("peptide", "AAA", "", ""),
        ];

        let entities = normalizer.normalize_rows(&rows);
        assert_eq!(entities.len(), rows.len());
        let ids: Vec<usize> = entities.iter().map(|e| e.row_id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
        // Two rows may share a normalized id
        assert_eq!(entities[0].normalized_id, entities[2].normalized_id);
    }

    #[test]
    fn test_normalize_json_shapes() {
        let normalizer = EntityNormalizer::default();

        let wrapped = r#"{"rows": [{"entity_type": "protein", "identifier": "P1", "name": null}]}"#;
        let entities = normalizer.normalize_json(wrapped).unwrap();
        assert_eq!(entities.len(), 1);
        assert!(entities[0].name.is_none());

        let list = r#"[{"entity_type": "compound", "identifier": "CCO"}, 42]"#;
        let entities = normalizer.normalize_json(list).unwrap();
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[1].identifier, "");
    }

    #[test]
    fn test_normalize_json_malformed() {
        let normalizer = EntityNormalizer::default();

        let error = normalizer.normalize_json("\"just a string\"").unwrap_err();
        assert_eq!(error.error, "Expected list or object, got string");

        let error = normalizer.normalize_json("{not json").unwrap_err();
        assert!(error.error.starts_with("Invalid JSON input"));
    }
}
