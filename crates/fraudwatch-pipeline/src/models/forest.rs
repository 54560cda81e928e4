//! Bagged decision-tree ensemble built on the `gbdt` crate.
use std::fmt;

use gbdt::config::Config;
use gbdt::decision_tree::{Data, DataVec};
use gbdt::gradient_boost::GBDT;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::ForestParams;
use crate::error::PipelineError;
use crate::models::classifier::Classifier;

/// Bagging over single depth-limited trees: each member is a one-iteration
/// GBDT fit on a bootstrap sample, and member probabilities are averaged.
///
/// All randomness flows through per-tree seeds derived from `seed`, so fits
/// on identical data are bit-for-bit reproducible.
#[derive(Serialize, Deserialize)]
pub struct BaggedTreesClassifier {
    params: ForestParams,
    seed: u64,
    trees: Vec<GBDT>,
}

// GBDT itself is not Debug; report the ensemble shape instead.
impl fmt::Debug for BaggedTreesClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaggedTreesClassifier")
            .field("params", &self.params)
            .field("seed", &self.seed)
            .field("fitted_trees", &self.trees.len())
            .finish()
    }
}

impl BaggedTreesClassifier {
    pub fn new(params: ForestParams, seed: u64) -> Self {
        BaggedTreesClassifier {
            params,
            seed,
            trees: Vec::new(),
        }
    }

    fn tree_config(&self, feature_size: usize) -> Config {
        let mut config = Config::new();
        config.set_feature_size(feature_size);
        config.set_max_depth(self.params.max_depth);
        // One iteration at full shrinkage: a single tree per bagged member.
        config.set_iterations(1);
        config.set_shrinkage(1.0);
        config.set_debug(false);
        config.set_training_optimization_level(2);
        config.set_loss("LogLikelyhood");
        config
    }
}

impl Classifier for BaggedTreesClassifier {
    fn fit(&mut self, x: &Array2<f32>, y: &[i32]) -> Result<(), PipelineError> {
        let n = x.nrows();
        if n == 0 || y.len() != n {
            return Err(PipelineError::InvalidInput(format!(
                "feature matrix has {} rows but {} labels",
                n,
                y.len()
            )));
        }

        let sample_size = ((n as f64 * self.params.sample_fraction).ceil() as usize).max(1);
        let config = self.tree_config(x.ncols());

        self.trees = (0..self.params.n_trees)
            .into_par_iter()
            .map(|t| {
                let tree_seed = self
                    .seed
                    .wrapping_add((t as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15));
                let mut rng = StdRng::seed_from_u64(tree_seed);

                let mut sample = DataVec::with_capacity(sample_size);
                for _ in 0..sample_size {
                    let row = rng.gen_range(0..n);
                    let features = x.row(row).to_vec();
                    // LogLikelyhood loss expects +/-1 labels.
                    let label = if y[row] == 1 { 1.0 } else { -1.0 };
                    sample.push(Data::new_training_data(features, 1.0, label, None));
                }

                let mut tree = GBDT::new(&config);
                tree.fit(&mut sample);
                tree
            })
            .collect();

        log::debug!(
            "Fitted {} bagged trees on {} rows ({} per bootstrap)",
            self.trees.len(),
            n,
            sample_size
        );
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f32>) -> Result<Vec<f32>, PipelineError> {
        if self.trees.is_empty() {
            return Err(PipelineError::ModelNotLoaded);
        }

        let mut test_data = DataVec::with_capacity(x.nrows());
        for row in 0..x.nrows() {
            test_data.push(Data::new_training_data(x.row(row).to_vec(), 1.0, 0.0, None));
        }

        let mut sums = vec![0.0f32; x.nrows()];
        for tree in &self.trees {
            for (sum, p) in sums.iter_mut().zip(tree.predict(&test_data)) {
                *sum += p;
            }
        }

        let n_trees = self.trees.len() as f32;
        Ok(sums
            .into_iter()
            .map(|s| (s / n_trees).clamp(0.0, 1.0))
            .collect())
    }

    fn name(&self) -> &str {
        "bagged_trees"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable_data() -> (Array2<f32>, Vec<i32>) {
        // Second feature carries all the signal.
        let x = Array2::from_shape_vec(
            (10, 2),
            vec![
                0.1, 1.0, 0.4, -1.0, 0.6, 1.0, 0.9, -1.0, 1.2, 1.0, 1.5, -1.0, 1.8, 1.0, 2.1,
                -1.0, 2.4, 1.0, 2.7, -1.0,
            ],
        )
        .unwrap();
        let y = vec![1, 0, 1, 0, 1, 0, 1, 0, 1, 0];
        (x, y)
    }

    #[test]
    fn fit_and_predict_probabilities_in_unit_interval() {
        let (x, y) = separable_data();
        let mut model = BaggedTreesClassifier::new(
            ForestParams {
                n_trees: 10,
                max_depth: 3,
                sample_fraction: 1.0,
            },
            42,
        );
        model.fit(&x, &y).unwrap();
        let probs = model.predict_proba(&x).unwrap();
        assert_eq!(probs.len(), x.nrows());
        assert!(probs.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn same_seed_is_deterministic() {
        let (x, y) = separable_data();
        let params = ForestParams {
            n_trees: 5,
            max_depth: 3,
            sample_fraction: 0.8,
        };
        let mut a = BaggedTreesClassifier::new(params.clone(), 7);
        let mut b = BaggedTreesClassifier::new(params, 7);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict_proba(&x).unwrap(), b.predict_proba(&x).unwrap());
    }

    #[test]
    fn debug_output_reports_ensemble_shape() {
        let (x, y) = separable_data();
        let mut model = BaggedTreesClassifier::new(
            ForestParams {
                n_trees: 3,
                max_depth: 2,
                sample_fraction: 1.0,
            },
            42,
        );
        model.fit(&x, &y).unwrap();
        let rendered = format!("{:?}", model);
        assert!(rendered.contains("fitted_trees: 3"), "got {}", rendered);
    }

    #[test]
    fn predict_before_fit_is_model_not_loaded() {
        let (x, _) = separable_data();
        let model = BaggedTreesClassifier::new(ForestParams::default(), 42);
        assert_eq!(
            model.predict_proba(&x).unwrap_err(),
            PipelineError::ModelNotLoaded
        );
    }
}
