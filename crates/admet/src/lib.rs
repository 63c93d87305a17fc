pub mod admetica;

pub use admetica::{AdmeticaClient, Field};

use anyhow::Result;
use async_trait::async_trait;
use ingest::{artifacts, RunDirectory};
use normalize::{EntityType, NormalizedEntity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Transport to a prediction service: one SMILES in, one row of model
/// outputs keyed by model name out.
#[async_trait]
pub trait AdmetService: Send + Sync {
    async fn predict(&self, smiles: &str) -> Result<BTreeMap<String, Field>>;
}

/// Five ADMET scores for one entity. All zeros means "not applicable".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdmetPrediction {
    pub normalized_id: String,
    pub absorption: f64,
    pub distribution: f64,
    pub metabolism: f64,
    pub excretion: f64,
    pub toxicity: f64,
}

impl AdmetPrediction {
    pub fn not_applicable(normalized_id: &str) -> Self {
        Self {
            normalized_id: normalized_id.to_string(),
            absorption: 0.0,
            distribution: 0.0,
            metabolism: 0.0,
            excretion: 0.0,
            toxicity: 0.0,
        }
    }

    /// Map service outputs onto the five scores. Fails when any model is
    /// missing or not a finite number.
    pub fn from_fields(normalized_id: &str, fields: &BTreeMap<String, Field>) -> Result<Self> {
        let score = |model: &str| -> Result<f64> {
            let Some(field) = fields.get(model) else {
                anyhow::bail!("Model {} missing from response", model);
            };
            match field.as_f64() {
                Some(value) if value.is_finite() => Ok(value),
                _ => anyhow::bail!("Model {} returned a non-numeric value: {:?}", model, field),
            }
        };

        Ok(Self {
            normalized_id: normalized_id.to_string(),
            absorption: score("solubility")?,
            distribution: score("ppbr")?,
            metabolism: score("cyp1a2-inhibitor")?,
            excretion: score("cl-hepa")?,
            toxicity: score("herg")?,
        })
    }
}

/// What happened for one entity.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionOutcome {
    Predicted(AdmetPrediction),
    /// Zeroed record for entity types the service does not cover
    NotApplicable(AdmetPrediction),
    Omitted(String),
}

impl PredictionOutcome {
    pub fn into_prediction(self) -> Option<AdmetPrediction> {
        match self {
            PredictionOutcome::Predicted(p) | PredictionOutcome::NotApplicable(p) => Some(p),
            PredictionOutcome::Omitted(_) => None,
        }
    }
}

pub struct AdmetPredictor {
    service: Box<dyn AdmetService>,
}

impl AdmetPredictor {
    pub fn new(service: Box<dyn AdmetService>) -> Self {
        Self { service }
    }

    pub async fn predict_entity(&self, entity: &NormalizedEntity) -> PredictionOutcome {
        match entity.entity_type {
            EntityType::Compound => {
                let result = self
                    .service
                    .predict(&entity.identifier)
                    .await
                    .and_then(|fields| AdmetPrediction::from_fields(&entity.normalized_id, &fields));

                match result {
                    Ok(prediction) => PredictionOutcome::Predicted(prediction),
                    Err(e) => PredictionOutcome::Omitted(format!("{:#}", e)),
                }
            }
            EntityType::Protein => {
                PredictionOutcome::NotApplicable(AdmetPrediction::not_applicable(&entity.normalized_id))
            }
            _ => PredictionOutcome::Omitted(format!("no ADMET model for {} entities", entity.entity_type)),
        }
    }

    /// Predictions in processing order. Compounds the service could not
    /// score and non-compound, non-protein entities produce no record.
    pub async fn predict_all(&self, entities: &[NormalizedEntity]) -> Vec<AdmetPrediction> {
        let mut predictions = Vec::new();

        for entity in entities {
            match self.predict_entity(entity).await {
                PredictionOutcome::Omitted(reason) if entity.entity_type == EntityType::Compound => {
                    tracing::warn!(
                        normalized_id = %entity.normalized_id,
                        error = %reason,
                        "ADMET prediction omitted"
                    );
                }
                outcome => predictions.extend(outcome.into_prediction()),
            }
        }

        predictions
    }
}

/// ADMET step: predict for every entity and persist `admet_predictions.json`.
pub async fn admet_step(
    predictor: &AdmetPredictor,
    entities: &[NormalizedEntity],
    run_dir: &RunDirectory,
) -> Result<Vec<AdmetPrediction>> {
    let predictions = predictor.predict_all(entities).await;
    tracing::info!(predictions = predictions.len(), entities = entities.len(), "ADMET predicted");

    run_dir.write_json(artifacts::ADMET_PREDICTIONS, &predictions).await?;
    Ok(predictions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use normalize::Extras;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct StubService {
        body: &'static str,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl AdmetService for StubService {
        async fn predict(&self, _smiles: &str) -> Result<BTreeMap<String, Field>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            admetica::parse_results(self.body)
        }
    }

    struct DownService;

    #[async_trait]
    impl AdmetService for DownService {
        async fn predict(&self, _smiles: &str) -> Result<BTreeMap<String, Field>> {
            anyhow::bail!("ADMET request failed: 503 Service Unavailable")
        }
    }

    const FULL: &str = "solubility,ppbr,cyp1a2-inhibitor,cl-hepa,herg\n0.5,0.3,0.1,0.2,0.05\n";

    fn entity(entity_type: &str, id: &str) -> NormalizedEntity {
        NormalizedEntity {
            row_id: 0,
            entity_type: EntityType::from(entity_type),
            identifier: id.to_string(),
            normalized_id: id.to_string(),
            name: None,
            context_tags: Vec::new(),
            extras: Extras::new(),
        }
    }

    fn stub(body: &'static str) -> (AdmetPredictor, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let service = StubService { body, calls: calls.clone() };
        (AdmetPredictor::new(Box::new(service)), calls)
    }

    #[tokio::test]
    async fn test_compound_mapping() {
        let (predictor, _) = stub(FULL);
        let outcome = predictor.predict_entity(&entity("compound", "CCO")).await;

        let PredictionOutcome::Predicted(p) = outcome else {
            panic!("expected a prediction, got {:?}", outcome);
        };
        assert_eq!(p.absorption, 0.5);
        assert_eq!(p.distribution, 0.3);
        assert_eq!(p.metabolism, 0.1);
        assert_eq!(p.excretion, 0.2);
        assert_eq!(p.toxicity, 0.05);
    }

    #[test]
    fn test_from_fields_needs_finite_numbers() {
        let mut fields = admetica::parse_results(FULL).unwrap();
        let prediction = AdmetPrediction::from_fields("id", &fields).unwrap();
        assert_eq!(prediction.toxicity, 0.05);

        fields.insert("herg".to_string(), Field::Number(f64::NAN));
        let err = AdmetPrediction::from_fields("id", &fields).unwrap_err();
        assert!(err.to_string().contains("herg returned a non-numeric value"));

        fields.insert("herg".to_string(), Field::Text("n/a".to_string()));
        assert!(AdmetPrediction::from_fields("id", &fields).is_err());

        fields.remove("herg");
        let err = AdmetPrediction::from_fields("id", &fields).unwrap_err();
        assert_eq!(err.to_string(), "Model herg missing from response");
    }

    #[tokio::test]
    async fn test_protein_zeroed_without_call() {
        let (predictor, calls) = stub(FULL);
        let predictions = predictor
            .predict_all(&[entity("protein", "P69905"), entity("protein", "P68871")])
            .await;

        assert_eq!(predictions.len(), 2);
        assert_eq!(predictions[0], AdmetPrediction::not_applicable("P69905"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_other_types_produce_nothing() {
        let (predictor, calls) = stub(FULL);
        let predictions = predictor
            .predict_all(&[entity("peptide", "GLP-1"), entity("", "x")])
            .await;

        assert!(predictions.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_incomplete_response_omits_entity() {
        let (predictor, _) = stub("solubility,ppbr\n0.5,0.3\n");
        let outcome = predictor.predict_entity(&entity("compound", "CCO")).await;
        assert!(matches!(outcome, PredictionOutcome::Omitted(reason) if reason.contains("cyp1a2-inhibitor")));

        let (predictor, _) = stub("solubility,ppbr,cyp1a2-inhibitor,cl-hepa,herg\n0.5,n/a,0.1,0.2,0.05\n");
        assert!(predictor.predict_all(&[entity("compound", "CCO")]).await.is_empty());
    }

    #[tokio::test]
    async fn test_service_failure_omits_only_that_entity() {
        let predictor = AdmetPredictor::new(Box::new(DownService));
        let predictions = predictor
            .predict_all(&[entity("compound", "CCO"), entity("protein", "P69905")])
            .await;

        assert_eq!(predictions, vec![AdmetPrediction::not_applicable("P69905")]);
    }

    #[tokio::test]
    async fn test_admet_step_persists_predictions() {
        let dir = tempfile::tempdir().unwrap();
        let run_dir = RunDirectory::create(dir.path()).await.unwrap();
        let (predictor, _) = stub(FULL);

        let predictions = admet_step(&predictor, &[entity("compound", "CCO")], &run_dir)
            .await
            .unwrap();

        let json = std::fs::read_to_string(run_dir.path(artifacts::ADMET_PREDICTIONS)).unwrap();
        let written: Vec<AdmetPrediction> = serde_json::from_str(&json).unwrap();
        assert_eq!(written, predictions);
    }
}
