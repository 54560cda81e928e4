//! HTTP front end exposing the predictor.
//!
//! The predictor is loaded once at startup and shared read-only across
//! requests; there is no per-request locking and no model reloading. Restart
//! the service to pick up newly trained artifacts.
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;

use fraudwatch_pipeline::config::PipelineConfig;
use fraudwatch_pipeline::error::PipelineError;
use fraudwatch_pipeline::predictor::{Prediction, Predictor};
use fraudwatch_pipeline::schema::Record;

use crate::input::ServeOptions;

/// Pipeline failures mapped onto HTTP statuses. Malformed inputs are the
/// caller's fault; missing artifacts mean the service cannot serve at all.
#[derive(Debug)]
pub struct ApiError(PipelineError);

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            PipelineError::UnseenCategory { .. }
            | PipelineError::FeatureMismatch(_)
            | PipelineError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            PipelineError::ArtifactMissing(_) | PipelineError::ModelNotLoaded => {
                log::error!("Service not ready: {}", self.0);
                StatusCode::SERVICE_UNAVAILABLE
            }
        };

        let body = Json(json!({
            "error": self.0.to_string(),
            "status": status.as_u16(),
        }));
        (status, body).into_response()
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    message: &'static str,
    version: &'static str,
    features: usize,
}

async fn health(State(predictor): State<Arc<Predictor>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        message: "Fraud detection service is running",
        version: env!("CARGO_PKG_VERSION"),
        features: predictor.feature_names().len(),
    })
}

async fn predict(
    State(predictor): State<Arc<Predictor>>,
    Json(record): Json<Record>,
) -> Result<Json<Prediction>, ApiError> {
    let prediction = predictor.predict(&record)?;
    Ok(Json(prediction))
}

/// Build the service router around an already-loaded predictor.
pub fn build_router(predictor: Arc<Predictor>) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/predict", post(predict))
        .with_state(predictor)
}

/// Load the persisted model and serve it until the process is stopped.
pub async fn run_serve(config: &PipelineConfig, options: &ServeOptions) -> Result<()> {
    let predictor = Arc::new(Predictor::load(config)?);
    let app = build_router(predictor);

    let addr = format!("{}:{}", options.host, options.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    log::info!("Serving predictions on http://{}", addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
