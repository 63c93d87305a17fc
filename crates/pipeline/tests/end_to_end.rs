use admet::{AdmetPrediction, AdmeticaClient};
use async_trait::async_trait;
use axum::{extract::State, routing::post, Router};
use literature::{LiteratureBundle, LiteratureRef, ReferenceSource};
use normalize::NormalizedEntity;
use pipeline::{Pipeline, PipelineConfig, RunOutcome};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const ADMET_RESPONSE: &str = "solubility,ppbr,cyp1a2-inhibitor,cl-hepa,herg\n0.5,0.3,0.1,0.2,0.05\n";

struct UnreachableSource;

#[async_trait]
impl ReferenceSource for UnreachableSource {
    async fn search(&self, _query: &str, _max_results: usize) -> anyhow::Result<Vec<LiteratureRef>> {
        anyhow::bail!("PubMed unreachable")
    }
}

type Requests = Arc<Mutex<Vec<String>>>;

async fn predict(State(requests): State<Requests>, body: String) -> &'static str {
    if let Ok(mut requests) = requests.lock() {
        requests.push(body);
    }
    ADMET_RESPONSE
}

/// Serve a stub prediction endpoint on an ephemeral port.
async fn spawn_admet_stub() -> (String, Requests) {
    let requests = Requests::default();
    let app = Router::new()
        .route("/predict", post(predict))
        .with_state(requests.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), requests)
}

fn read_json<T: serde::de::DeserializeOwned>(path: std::path::PathBuf) -> T {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[tokio::test]
async fn test_single_compound_run() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.csv");
    std::fs::write(&input, "entity_type,identifier,name,context_tags\ncompound,CCO,Ethanol,\n").unwrap();

    let (admet_url, requests) = spawn_admet_stub().await;
    let mut config = PipelineConfig::new(&input, admet_url.clone());
    config.output_dir = dir.path().join("output");
    let output_dir = config.output_dir.clone();

    let admetica = AdmeticaClient::new(admet_url, Duration::from_secs(5)).unwrap();
    let pipeline = Pipeline::new(config, Box::new(UnreachableSource), Box::new(admetica));

    let outcome = pipeline.run().await.unwrap();
    let RunOutcome::Completed(report_path) = outcome else {
        panic!("expected a completed run, got {:?}", outcome);
    };

    let entities: Vec<NormalizedEntity> = read_json(output_dir.join("normalized_entities.json"));
    assert_eq!(entities.len(), 1);
    let normalized_id = &entities[0].normalized_id;
    assert_eq!(normalized_id.len(), 27);

    let bundles: Vec<LiteratureBundle> = read_json(output_dir.join("literature_refs.json"));
    assert_eq!(bundles.len(), 1);
    let years: Vec<Option<i32>> = bundles[0].references.iter().map(|r| r.year).collect();
    assert_eq!(years, vec![Some(2018), Some(2021)]);

    let predictions: Vec<AdmetPrediction> = read_json(output_dir.join("admet_predictions.json"));
    assert_eq!(
        predictions,
        vec![AdmetPrediction {
            normalized_id: normalized_id.clone(),
            absorption: 0.5,
            distribution: 0.3,
            metabolism: 0.1,
            excretion: 0.2,
            toxicity: 0.05,
        }]
    );

    assert_eq!(requests.lock().unwrap().as_slice(), ["smiles\nCCO\n"]);

    let md = std::fs::read_to_string(&report_path).unwrap();
    assert_eq!(md.matches("### Ethanol (compound)").count(), 1);
    assert!(md.contains("- **PubMed refs**:\n- (no URL available)\n- (no URL available)\n"));
    assert!(md.contains("```json\n"));
    assert!(md.contains("\"absorption\": 0.5"));
    assert!(md.contains("\"toxicity\": 0.05"));

    let meta: serde_json::Value = read_json(output_dir.join("run_meta.json"));
    assert_eq!(meta["n_entities"], 1);
}

#[tokio::test]
async fn test_admet_service_down_omits_prediction() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.csv");
    std::fs::write(&input, "entity_type,identifier,name,context_tags\ncompound,CCO,Ethanol,\n").unwrap();

    // Nothing listens on this port once the listener is dropped
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let admet_url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let mut config = PipelineConfig::new(&input, admet_url.clone());
    config.output_dir = dir.path().join("output");
    let admetica = AdmeticaClient::new(admet_url, Duration::from_secs(2)).unwrap();
    let pipeline = Pipeline::new(config, Box::new(UnreachableSource), Box::new(admetica));

    let RunOutcome::Completed(report_path) = pipeline.run().await.unwrap() else {
        panic!("expected a completed run");
    };

    let md = std::fs::read_to_string(report_path).unwrap();
    assert!(md.contains("### Ethanol (compound)"));
    assert!(md.contains("#### ADMET / Toxicity\nNo ADMET data available"));
}
