//! Central configuration for the pipeline.
//!
//! Every path the pipeline touches (dataset, preprocessing artifacts, model,
//! metrics table) is named here explicitly and passed into components at
//! construction; nothing reads a hard-coded global path.
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::schema::{FieldSpec, FieldType, Schema};

/// Hyper-parameters for the bagged-tree base learner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: u32,
    /// Fraction of rows drawn (with replacement) for each bootstrap sample.
    pub sample_fraction: f64,
}

impl Default for ForestParams {
    fn default() -> Self {
        ForestParams {
            n_trees: 50,
            max_depth: 6,
            sample_fraction: 1.0,
        }
    }
}

/// Hyper-parameters for the logistic base and meta learners.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearParams {
    pub learning_rate: f32,
    pub epochs: usize,
    pub l2: f32,
}

impl Default for LinearParams {
    fn default() -> Self {
        LinearParams {
            learning_rate: 0.1,
            epochs: 200,
            l2: 0.0,
        }
    }
}

/// Hyper-parameters for the stacked ensemble.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub forest: ForestParams,
    pub linear: LinearParams,
    /// Number of folds used to generate out-of-fold meta features.
    pub n_folds: usize,
    pub seed: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            forest: ForestParams::default(),
            linear: LinearParams::default(),
            n_folds: 5,
            seed: 42,
        }
    }
}

/// Full pipeline configuration: dataset, schema, artifact paths and model
/// hyper-parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Processed training dataset (CSV with header, label column included).
    pub dataset_path: String,
    /// Name of the fraud label column, present only in training data.
    pub label_column: String,
    /// Versioned feature schema, label column excluded.
    pub schema: Schema,
    pub encoders_path: String,
    pub scaler_path: String,
    pub model_path: String,
    pub metrics_path: String,
    /// Name under which metrics rows are keyed (overwrite-by-name).
    pub model_name: String,
    /// Held-out fraction for evaluation.
    pub test_fraction: f32,
    pub model: ModelConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            dataset_path: String::from("data/processed/train_final_ready.csv"),
            label_column: String::from("isFraud"),
            schema: default_transaction_schema(),
            encoders_path: String::from("models/label_encoders.json"),
            scaler_path: String::from("models/scaler.json"),
            model_path: String::from("models/final_model_stacking.json"),
            metrics_path: String::from("reports/model_metrics.csv"),
            model_name: String::from("stacking"),
            test_fraction: 0.2,
            model: ModelConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load a pipeline configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config: {}", path.as_ref().display()))?;
        let config: PipelineConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.as_ref().display()))?;
        Ok(config)
    }

    /// Ordered feature names the model is trained on.
    pub fn feature_names(&self) -> Vec<String> {
        self.schema.iter().map(|f| f.name.clone()).collect()
    }
}

/// The default PaySim-style transaction schema used by the shipped config.
fn default_transaction_schema() -> Schema {
    vec![
        FieldSpec::new("step", FieldType::Int),
        FieldSpec::new("type", FieldType::Text),
        FieldSpec::new("amount", FieldType::Float),
        FieldSpec::new("oldbalanceOrg", FieldType::Float),
        FieldSpec::new("newbalanceOrig", FieldType::Float),
        FieldSpec::new("oldbalanceDest", FieldType::Float),
        FieldSpec::new("newbalanceDest", FieldType::Float),
    ]
}
