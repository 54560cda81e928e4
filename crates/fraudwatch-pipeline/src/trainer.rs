//! Offline training entry point invoked by the orchestrator.
use anyhow::{bail, Result};
use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::config::PipelineConfig;
use crate::dataset::read_dataset_csv;
use crate::metrics::{classification_report, evaluate, MetricsRow, MetricsStore};
use crate::models::{Classifier, StackedClassifier};
use crate::preprocess::fit_pipeline;

/// Outcome of one training run.
#[derive(Debug)]
pub struct TrainSummary {
    pub metrics: MetricsRow,
    pub n_train: usize,
    pub n_test: usize,
}

/// Run one full training pass: load the dataset, fit and persist the
/// preprocessing artifacts, fit the stacked ensemble on a seeded 80/20 split,
/// report evaluation metrics, and persist the model.
///
/// Failures propagate to the caller (and through it to the orchestrator's
/// retry policy); nothing here retries, and a failed model fit leaves no
/// model artifact behind.
pub fn run_training(config: &PipelineConfig) -> Result<TrainSummary> {
    let mut data = read_dataset_csv(&config.dataset_path, &config.schema, &config.label_column)?;

    // Fit mode: artifacts are produced exactly once per run and overwritten
    // unconditionally.
    let artifacts = fit_pipeline(&mut data.frame)?;
    artifacts.save(&config.encoders_path, &config.scaler_path)?;
    log::info!(
        "Preprocessing artifacts saved to {} and {}",
        config.encoders_path,
        config.scaler_path
    );

    let feature_names = config.feature_names();
    let x = data.frame.to_matrix(&feature_names)?;
    let y = data.labels;

    let (x_train, y_train, x_test, y_test) = split_train_test(
        &x,
        &y,
        config.test_fraction,
        config.model.seed,
    )?;
    log::info!(
        "Split {} rows into {} train / {} test",
        y.len(),
        y_train.len(),
        y_test.len()
    );

    let mut model = StackedClassifier::new(&config.model, feature_names);
    model.fit(&x_train, &y_train)?;

    // Evaluation is observational only and never blocks persistence.
    let probs = model.predict_proba(&x_test)?;
    let y_pred: Vec<i32> = probs.iter().map(|&p| if p >= 0.5 { 1 } else { 0 }).collect();
    let eval = evaluate(&y_test, &probs, 0.5);
    println!("{}", classification_report(&y_test, &y_pred));
    log::info!(
        "Evaluation: accuracy={:.4} precision={:.4} recall={:.4} f1={:.4} roc_auc={:.4}",
        eval.accuracy,
        eval.precision,
        eval.recall,
        eval.f1,
        eval.roc_auc
    );

    let row = MetricsRow::from_evaluation(&config.model_name, &eval);
    MetricsStore::new(&config.metrics_path).upsert(&row)?;

    model.trained_at = Some(row.trained_at.clone());
    model.save(&config.model_path)?;

    Ok(TrainSummary {
        metrics: row,
        n_train: y_train.len(),
        n_test: y_test.len(),
    })
}

/// Seeded shuffle split; the same seed on the same data yields the same
/// partition.
fn split_train_test(
    x: &Array2<f32>,
    y: &[i32],
    test_fraction: f32,
    seed: u64,
) -> Result<(Array2<f32>, Vec<i32>, Array2<f32>, Vec<i32>)> {
    let n = x.nrows();
    let n_test = ((n as f32) * test_fraction).round() as usize;
    if n_test == 0 || n_test >= n {
        bail!(
            "Cannot split {} rows with test fraction {}",
            n,
            test_fraction
        );
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let (test_idx, train_idx) = indices.split_at(n_test);
    let mut train_idx = train_idx.to_vec();
    let mut test_idx = test_idx.to_vec();
    train_idx.sort_unstable();
    test_idx.sort_unstable();

    let x_train = x.select(Axis(0), &train_idx);
    let y_train = train_idx.iter().map(|&i| y[i]).collect();
    let x_test = x.select(Axis(0), &test_idx);
    let y_test = test_idx.iter().map(|&i| y[i]).collect();
    Ok((x_train, y_train, x_test, y_test))
}
