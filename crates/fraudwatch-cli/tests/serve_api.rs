//! HTTP surface tests against a freshly trained model.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use fraudwatch_cli::serve::build_router;
use fraudwatch_pipeline::config::{ForestParams, LinearParams, ModelConfig, PipelineConfig};
use fraudwatch_pipeline::predictor::Predictor;
use fraudwatch_pipeline::schema::{FieldSpec, FieldType};
use fraudwatch_pipeline::trainer::run_training;

fn trained_router(dir: &Path) -> Router {
    let dataset = dir.join("train.csv");
    let mut file = std::fs::File::create(&dataset).unwrap();
    writeln!(file, "amount,type,isFraud").unwrap();
    for i in 0..100 {
        let tx_type = if i % 2 == 0 { "PAYMENT" } else { "TRANSFER" };
        let label = if i >= 60 { 1 } else { 0 };
        writeln!(file, "{},{},{}", (i as f64) * 10.0, tx_type, label).unwrap();
    }

    let config = PipelineConfig {
        dataset_path: dataset.to_str().unwrap().to_string(),
        label_column: "isFraud".to_string(),
        schema: vec![
            FieldSpec::new("amount", FieldType::Float),
            FieldSpec::new("type", FieldType::Text),
        ],
        encoders_path: dir.join("label_encoders.json").to_str().unwrap().to_string(),
        scaler_path: dir.join("scaler.json").to_str().unwrap().to_string(),
        model_path: dir.join("model.json").to_str().unwrap().to_string(),
        metrics_path: dir.join("metrics.csv").to_str().unwrap().to_string(),
        model_name: "stacking".to_string(),
        test_fraction: 0.2,
        model: ModelConfig {
            forest: ForestParams {
                n_trees: 10,
                max_depth: 3,
                sample_fraction: 1.0,
            },
            linear: LinearParams::default(),
            n_folds: 4,
            seed: 42,
        },
    };

    run_training(&config).unwrap();
    let predictor = Predictor::load(&config).unwrap();
    build_router(Arc::new(predictor))
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let dir = tempfile::tempdir().unwrap();
    let app = trained_router(dir.path());

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["features"], 2);
}

#[tokio::test]
async fn predict_scores_a_valid_record() {
    let dir = tempfile::tempdir().unwrap();
    let app = trained_router(dir.path());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/predict")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"amount": 950.0, "type": "TRANSFER"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let prediction = body["prediction"].as_i64().unwrap();
    assert!(prediction == 0 || prediction == 1);
    let proba = body["fraud_probability"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&proba), "probability out of range: {}", proba);
}

#[tokio::test]
async fn predict_rejects_unseen_category_with_400() {
    let dir = tempfile::tempdir().unwrap();
    let app = trained_router(dir.path());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/predict")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"amount": 950.0, "type": "WIRE"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("WIRE"));
}

#[tokio::test]
async fn predict_rejects_missing_field_with_400() {
    let dir = tempfile::tempdir().unwrap();
    let app = trained_router(dir.path());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/predict")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"amount": 950.0}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn predict_rejects_malformed_body() {
    let dir = tempfile::tempdir().unwrap();
    let app = trained_router(dir.path());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/predict")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}
