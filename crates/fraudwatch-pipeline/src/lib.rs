//! fraudwatch-pipeline: training and inference core for the fraud classifier.
//!
//! This crate owns everything between the raw transaction CSV and a scored
//! prediction: the schema-driven dataset loader, the deterministic
//! impute/encode/scale preprocessing pipeline with persisted artifacts, the
//! stacked ensemble model (bagged trees + logistic regression under a logistic
//! meta-learner), the batch trainer, and the single-record predictor.
//!
//! Artifacts are fitted by exactly one training run, written to the configured
//! paths, and treated as read-only by every inference call.
pub mod config;
pub mod dataset;
pub mod error;
pub mod frame;
pub mod metrics;
pub mod models;
pub mod predictor;
pub mod preprocess;
pub mod schema;
pub mod trainer;
