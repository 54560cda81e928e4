//! Single-record inference against the persisted model and artifacts.
use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::frame::Frame;
use crate::metrics::round4;
use crate::models::{Classifier, StackedClassifier};
use crate::preprocess::{apply_pipeline, PreprocessArtifacts};
use crate::schema::{Record, Schema};

/// One scored transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub prediction: i32,
    pub fraud_probability: f64,
}

/// Inference engine holding the model and preprocessing artifacts, loaded
/// eagerly at construction and read-only afterwards. Safe to share across
/// concurrent requests without locking.
#[derive(Debug)]
pub struct Predictor {
    model: StackedClassifier,
    artifacts: PreprocessArtifacts,
    schema: Schema,
}

impl Predictor {
    /// Load the persisted model and artifacts named by the configuration.
    /// Fails with `ArtifactMissing` when any of them has not been produced
    /// by a training run yet.
    pub fn load(config: &PipelineConfig) -> Result<Self, PipelineError> {
        let model = StackedClassifier::load(&config.model_path)?;
        let artifacts = PreprocessArtifacts::load(&config.encoders_path, &config.scaler_path)?;
        log::info!(
            "Predictor loaded: model '{}' on {} features",
            model.name(),
            model.feature_names.len()
        );
        Ok(Predictor::new(model, artifacts, config.schema.clone()))
    }

    /// Build a predictor from already-loaded parts.
    pub fn new(model: StackedClassifier, artifacts: PreprocessArtifacts, schema: Schema) -> Self {
        Predictor {
            model,
            artifacts,
            schema,
        }
    }

    /// Score one record: preprocess it with the fit-time artifacts, reindex
    /// its columns to the model's feature order, and threshold the positive
    /// class probability at 0.5. The probability is rounded to 4 decimal
    /// digits.
    pub fn predict(&self, record: &Record) -> Result<Prediction, PipelineError> {
        let mut frame = Frame::from_record(record, &self.schema)?;
        apply_pipeline(&mut frame, &self.artifacts)?;

        let x = frame.to_matrix(&self.model.feature_names)?;
        let probs = self.model.predict_proba(&x)?;
        let proba = probs
            .first()
            .copied()
            .ok_or(PipelineError::ModelNotLoaded)? as f64;

        Ok(Prediction {
            prediction: if proba >= 0.5 { 1 } else { 0 },
            fraud_probability: round4(proba),
        })
    }

    pub fn feature_names(&self) -> &[String] {
        &self.model.feature_names
    }
}
