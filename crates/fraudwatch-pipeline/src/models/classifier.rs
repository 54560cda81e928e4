use ndarray::Array2;

use crate::error::PipelineError;

/// Contract shared by the base learners and the stacked ensemble.
///
/// `y` uses the crate convention of 0 (legitimate) / 1 (fraud). Predicting
/// from an unfitted model yields `ModelNotLoaded`.
pub trait Classifier {
    /// Fit the model on a dense feature matrix.
    fn fit(&mut self, x: &Array2<f32>, y: &[i32]) -> Result<(), PipelineError>;

    /// Positive-class probabilities in [0, 1], one per row.
    fn predict_proba(&self, x: &Array2<f32>) -> Result<Vec<f32>, PipelineError>;

    /// Human readable model name.
    fn name(&self) -> &str {
        "classifier"
    }
}
