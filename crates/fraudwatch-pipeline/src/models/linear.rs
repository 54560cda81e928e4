//! Logistic regression trained with batch gradient descent.
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::config::LinearParams;
use crate::error::PipelineError;
use crate::models::classifier::Classifier;

/// Dense binary logistic regression. Zero-initialized and fully
/// deterministic, which keeps stacked training reproducible without a seed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    params: LinearParams,
    weights: Vec<f32>,
    bias: f32,
    fitted: bool,
}

impl LogisticRegression {
    pub fn new(params: LinearParams) -> Self {
        LogisticRegression {
            params,
            weights: Vec::new(),
            bias: 0.0,
            fitted: false,
        }
    }

    fn decision(&self, row: &[f32]) -> f32 {
        let z: f32 = self
            .weights
            .iter()
            .zip(row)
            .map(|(w, x)| w * x)
            .sum::<f32>()
            + self.bias;
        sigmoid(z)
    }
}

fn sigmoid(z: f32) -> f32 {
    1.0 / (1.0 + (-z).exp())
}

impl Classifier for LogisticRegression {
    fn fit(&mut self, x: &Array2<f32>, y: &[i32]) -> Result<(), PipelineError> {
        let (n, d) = x.dim();
        if n == 0 || y.len() != n {
            return Err(PipelineError::InvalidInput(format!(
                "feature matrix has {} rows but {} labels",
                n,
                y.len()
            )));
        }

        self.weights = vec![0.0; d];
        self.bias = 0.0;
        let n_f = n as f32;

        for _ in 0..self.params.epochs {
            let mut grad_w = vec![0.0f32; d];
            let mut grad_b = 0.0f32;
            for (i, row) in x.rows().into_iter().enumerate() {
                let err = self.decision(row.as_slice().expect("contiguous row")) - y[i] as f32;
                for (g, &v) in grad_w.iter_mut().zip(row) {
                    *g += err * v;
                }
                grad_b += err;
            }
            for (w, g) in self.weights.iter_mut().zip(&grad_w) {
                *w -= self.params.learning_rate * (g / n_f + self.params.l2 * *w);
            }
            self.bias -= self.params.learning_rate * grad_b / n_f;
        }

        self.fitted = true;
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f32>) -> Result<Vec<f32>, PipelineError> {
        if !self.fitted {
            return Err(PipelineError::ModelNotLoaded);
        }
        Ok(x.rows()
            .into_iter()
            .map(|row| self.decision(row.as_slice().expect("contiguous row")))
            .collect())
    }

    fn name(&self) -> &str {
        "logistic_regression"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn learns_a_separable_direction() {
        let x = Array2::from_shape_vec(
            (6, 1),
            vec![-2.0, -1.5, -1.0, 1.0, 1.5, 2.0],
        )
        .unwrap();
        let y = vec![0, 0, 0, 1, 1, 1];

        let mut model = LogisticRegression::new(LinearParams::default());
        model.fit(&x, &y).unwrap();

        let probe = Array2::from_shape_vec((2, 1), vec![2.0, -2.0]).unwrap();
        let probs = model.predict_proba(&probe).unwrap();
        assert!(probs[0] > 0.5, "positive side should score high, got {}", probs[0]);
        assert!(probs[1] < 0.5, "negative side should score low, got {}", probs[1]);
    }

    #[test]
    fn fit_is_deterministic() {
        let x = Array2::from_shape_vec((4, 2), vec![1.0, 0.0, 0.0, 1.0, 1.0, 0.1, 0.1, 1.0])
            .unwrap();
        let y = vec![1, 0, 1, 0];
        let mut a = LogisticRegression::new(LinearParams::default());
        let mut b = LogisticRegression::new(LinearParams::default());
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict_proba(&x).unwrap(), b.predict_proba(&x).unwrap());
    }

    #[test]
    fn predict_before_fit_is_model_not_loaded() {
        let x = Array2::zeros((1, 2));
        let model = LogisticRegression::new(LinearParams::default());
        assert_eq!(
            model.predict_proba(&x).unwrap_err(),
            PipelineError::ModelNotLoaded
        );
    }
}
