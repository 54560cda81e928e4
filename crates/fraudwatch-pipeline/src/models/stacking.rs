//! Stacked ensemble: bagged trees + logistic regression under a logistic
//! meta-learner.
use std::path::Path;

use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::config::ModelConfig;
use crate::error::PipelineError;
use crate::models::classifier::Classifier;
use crate::models::forest::BaggedTreesClassifier;
use crate::models::linear::LogisticRegression;

/// The persisted model artifact: both fitted base learners, the meta-learner
/// fit on their out-of-fold predictions, and the ordered feature-name list
/// the ensemble was trained on.
#[derive(Debug, Serialize, Deserialize)]
pub struct StackedClassifier {
    forest: BaggedTreesClassifier,
    linear: LogisticRegression,
    meta: LogisticRegression,
    config: ModelConfig,
    pub feature_names: Vec<String>,
    pub trained_at: Option<String>,
}

impl StackedClassifier {
    pub fn new(config: &ModelConfig, feature_names: Vec<String>) -> Self {
        StackedClassifier {
            forest: BaggedTreesClassifier::new(config.forest.clone(), config.seed),
            linear: LogisticRegression::new(config.linear.clone()),
            meta: LogisticRegression::new(config.linear.clone()),
            config: config.clone(),
            feature_names,
            trained_at: None,
        }
    }

    /// Out-of-fold predictions from fresh base learners: row `i` belongs to
    /// fold `i % n_folds`, each fold is scored by learners fit on the
    /// remaining folds.
    fn out_of_fold_features(
        &self,
        x: &Array2<f32>,
        y: &[i32],
    ) -> Result<Array2<f32>, PipelineError> {
        let n = x.nrows();
        if n < 2 {
            return Err(PipelineError::InvalidInput(format!(
                "stacking requires at least 2 training rows, got {}",
                n
            )));
        }
        let n_folds = self.config.n_folds.clamp(2, n);
        let mut oof = Array2::<f32>::zeros((n, 2));

        for fold in 0..n_folds {
            let (train_idx, holdout_idx): (Vec<usize>, Vec<usize>) =
                (0..n).partition(|i| i % n_folds != fold);

            let x_train = x.select(Axis(0), &train_idx);
            let y_train: Vec<i32> = train_idx.iter().map(|&i| y[i]).collect();
            let x_holdout = x.select(Axis(0), &holdout_idx);

            let mut forest = BaggedTreesClassifier::new(
                self.config.forest.clone(),
                // Distinct stream per fold so folds are not trained on
                // identical bootstraps.
                self.config.seed.wrapping_add(1000 + fold as u64),
            );
            let mut linear = LogisticRegression::new(self.config.linear.clone());
            forest.fit(&x_train, &y_train)?;
            linear.fit(&x_train, &y_train)?;

            let forest_probs = forest.predict_proba(&x_holdout)?;
            let linear_probs = linear.predict_proba(&x_holdout)?;
            for ((&row, &fp), &lp) in holdout_idx
                .iter()
                .zip(&forest_probs)
                .zip(&linear_probs)
            {
                oof[(row, 0)] = fp;
                oof[(row, 1)] = lp;
            }
        }
        Ok(oof)
    }

    /// Persist the fitted ensemble as JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(self)?;
        std::fs::write(path, json)?;
        log::info!("Model saved to {}", path.display());
        Ok(())
    }

    /// Load a persisted ensemble; `ArtifactMissing` when the file is absent
    /// or unreadable.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| PipelineError::ArtifactMissing(path.display().to_string()))?;
        serde_json::from_str(&content)
            .map_err(|_| PipelineError::ArtifactMissing(path.display().to_string()))
    }
}

impl Classifier for StackedClassifier {
    fn fit(&mut self, x: &Array2<f32>, y: &[i32]) -> Result<(), PipelineError> {
        let oof = self.out_of_fold_features(x, y)?;
        self.meta.fit(&oof, y)?;

        // Base learners are refit on the full training set for inference.
        self.forest.fit(x, y)?;
        self.linear.fit(x, y)?;
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f32>) -> Result<Vec<f32>, PipelineError> {
        let forest_probs = self.forest.predict_proba(x)?;
        let linear_probs = self.linear.predict_proba(x)?;

        let mut meta_x = Array2::<f32>::zeros((x.nrows(), 2));
        for (i, (&fp, &lp)) in forest_probs.iter().zip(&linear_probs).enumerate() {
            meta_x[(i, 0)] = fp;
            meta_x[(i, 1)] = lp;
        }
        self.meta.predict_proba(&meta_x)
    }

    fn name(&self) -> &str {
        "stacking"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ForestParams, LinearParams};

    fn small_config() -> ModelConfig {
        ModelConfig {
            forest: ForestParams {
                n_trees: 10,
                max_depth: 3,
                sample_fraction: 1.0,
            },
            linear: LinearParams::default(),
            n_folds: 4,
            seed: 42,
        }
    }

    fn separable_data() -> (Array2<f32>, Vec<i32>) {
        let mut data = Vec::new();
        let mut y = Vec::new();
        for i in 0..40 {
            let label = i % 2;
            // Positive rows sit around +2, negative rows around -2.
            let center = if label == 1 { 2.0 } else { -2.0 };
            data.push(center + 0.05 * (i % 5) as f32);
            data.push(-center);
            y.push(label);
        }
        (Array2::from_shape_vec((40, 2), data).unwrap(), y)
    }

    #[test]
    fn stacked_probabilities_are_valid_and_ordered() {
        let (x, y) = separable_data();
        let mut model = StackedClassifier::new(&small_config(), vec!["a".into(), "b".into()]);
        model.fit(&x, &y).unwrap();

        let probs = model.predict_proba(&x).unwrap();
        assert_eq!(probs.len(), x.nrows());
        assert!(probs.iter().all(|p| (0.0..=1.0).contains(p)));

        let (pos_sum, pos_n, neg_sum, neg_n) = probs.iter().zip(&y).fold(
            (0.0f64, 0u32, 0.0f64, 0u32),
            |(ps, pn, ns, nn), (&p, &label)| {
                if label == 1 {
                    (ps + p as f64, pn + 1, ns, nn)
                } else {
                    (ps, pn, ns + p as f64, nn + 1)
                }
            },
        );
        assert!(
            pos_sum / pos_n as f64 > neg_sum / neg_n as f64,
            "fraud rows should score above legitimate rows on separable data"
        );
    }

    #[test]
    fn same_seed_gives_identical_models() {
        let (x, y) = separable_data();
        let names = vec!["a".to_string(), "b".to_string()];
        let mut a = StackedClassifier::new(&small_config(), names.clone());
        let mut b = StackedClassifier::new(&small_config(), names);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict_proba(&x).unwrap(), b.predict_proba(&x).unwrap());
    }

    #[test]
    fn fit_on_single_row_is_invalid_input() {
        let x = Array2::from_shape_vec((1, 2), vec![0.5, -0.5]).unwrap();
        let y = vec![1];
        let mut model = StackedClassifier::new(&small_config(), vec!["a".into(), "b".into()]);
        assert!(matches!(
            model.fit(&x, &y).unwrap_err(),
            PipelineError::InvalidInput(_)
        ));
    }

    #[test]
    fn save_load_round_trip() {
        let (x, y) = separable_data();
        let mut model = StackedClassifier::new(&small_config(), vec!["a".into(), "b".into()]);
        model.fit(&x, &y).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        model.save(&path).unwrap();

        let loaded = StackedClassifier::load(&path).unwrap();
        assert_eq!(loaded.feature_names, model.feature_names);
        assert_eq!(
            loaded.predict_proba(&x).unwrap(),
            model.predict_proba(&x).unwrap()
        );
    }

    #[test]
    fn load_missing_file_is_artifact_missing() {
        let err = StackedClassifier::load("/nonexistent/model.json").unwrap_err();
        assert!(matches!(err, PipelineError::ArtifactMissing(_)));
    }
}
