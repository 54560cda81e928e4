//! Binary classification metrics and the persisted metrics table.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Evaluation summary for one model on a held-out split.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub roc_auc: f64,
}

/// Round to 4 decimal digits, the precision used for reported probabilities
/// and stored metrics.
pub fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

/// Evaluate thresholded predictions and ranking quality in one pass.
pub fn evaluate(y_true: &[i32], probs: &[f32], threshold: f32) -> Evaluation {
    let y_pred: Vec<i32> = probs
        .iter()
        .map(|&p| if p >= threshold { 1 } else { 0 })
        .collect();
    let (tp, fp, tn, fn_) = confusion_counts(y_true, &y_pred);

    let total = (tp + fp + tn + fn_) as f64;
    let accuracy = if total > 0.0 {
        (tp + tn) as f64 / total
    } else {
        0.0
    };
    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, tp + fn_);
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    Evaluation {
        accuracy,
        precision,
        recall,
        f1,
        roc_auc: roc_auc(y_true, probs),
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// (tp, fp, tn, fn) with 1 as the positive (fraud) class.
pub fn confusion_counts(y_true: &[i32], y_pred: &[i32]) -> (usize, usize, usize, usize) {
    let mut tp = 0;
    let mut fp = 0;
    let mut tn = 0;
    let mut fn_ = 0;
    for (&t, &p) in y_true.iter().zip(y_pred) {
        match (t, p) {
            (1, 1) => tp += 1,
            (0, 1) => fp += 1,
            (0, 0) => tn += 1,
            _ => fn_ += 1,
        }
    }
    (tp, fp, tn, fn_)
}

/// Area under the ROC curve via the rank-sum formulation, with tied scores
/// assigned their average rank. A single-class input degenerates to 0.5.
pub fn roc_auc(y_true: &[i32], probs: &[f32]) -> f64 {
    let n = y_true.len();
    let n_pos = y_true.iter().filter(|&&y| y == 1).count();
    let n_neg = n - n_pos;
    if n_pos == 0 || n_neg == 0 {
        log::warn!("ROC-AUC undefined for single-class labels; reporting 0.5");
        return 0.5;
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        probs[a]
            .partial_cmp(&probs[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    // Average ranks across ties.
    let mut ranks = vec![0.0f64; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && probs[order[j + 1]] == probs[order[i]] {
            j += 1;
        }
        let avg_rank = (i + j + 2) as f64 / 2.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg_rank;
        }
        i = j + 1;
    }

    let pos_rank_sum: f64 = y_true
        .iter()
        .zip(&ranks)
        .filter(|(&y, _)| y == 1)
        .map(|(_, &r)| r)
        .sum();
    (pos_rank_sum - (n_pos * (n_pos + 1)) as f64 / 2.0) / (n_pos * n_neg) as f64
}

/// Per-class precision/recall/F1 report for the operator console,
/// observational only.
pub fn classification_report(y_true: &[i32], y_pred: &[i32]) -> String {
    let (tp, fp, tn, fn_) = confusion_counts(y_true, y_pred);

    let rows = [
        ("0", ratio(tn, tn + fn_), ratio(tn, tn + fp), tn + fp),
        ("1", ratio(tp, tp + fp), ratio(tp, tp + fn_), tp + fn_),
    ];

    let mut out = String::from(
        "              precision    recall  f1-score   support\n\n",
    );
    for (label, precision, recall, support) in rows {
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        out.push_str(&format!(
            "{:>12}   {:>9.3} {:>9.3} {:>9.3} {:>9}\n",
            label, precision, recall, f1, support
        ));
    }
    let total = y_true.len();
    let accuracy = ratio(tp + tn, total);
    out.push_str(&format!("\n    accuracy   {:>29.3} {:>9}\n", accuracy, total));
    out
}

/// One metrics row, keyed by model name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsRow {
    pub model: String,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub roc_auc: f64,
    pub trained_at: String,
}

impl MetricsRow {
    pub fn from_evaluation(model: &str, eval: &Evaluation) -> Self {
        MetricsRow {
            model: model.to_string(),
            accuracy: round4(eval.accuracy),
            precision: round4(eval.precision),
            recall: round4(eval.recall),
            f1_score: round4(eval.f1),
            roc_auc: round4(eval.roc_auc),
            trained_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// CSV metrics table with overwrite-by-name semantics: writing a row for an
/// existing model name replaces that row and keeps the others.
#[derive(Debug, Clone)]
pub struct MetricsStore {
    path: PathBuf,
}

impl MetricsStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        MetricsStore {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn upsert(&self, row: &MetricsRow) -> Result<()> {
        let mut rows = self.read_all()?;
        rows.retain(|r| r.model != row.model);
        rows.push(row.clone());

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let mut writer = csv::Writer::from_path(&self.path)
            .with_context(|| format!("Failed to write metrics: {}", self.path.display()))?;
        for r in &rows {
            writer.serialize(r)?;
        }
        writer.flush()?;
        log::info!("Metrics saved to {}", self.path.display());
        Ok(())
    }

    pub fn read_all(&self) -> Result<Vec<MetricsRow>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&self.path)
            .with_context(|| format!("Failed to read metrics: {}", self.path.display()))?;
        let mut rows = Vec::new();
        for result in reader.deserialize() {
            rows.push(result.context("Invalid metrics row")?);
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confusion_counts_add_up() {
        let y_true = vec![1, 1, 0, 0, 1, 0];
        let y_pred = vec![1, 0, 0, 1, 1, 0];
        assert_eq!(confusion_counts(&y_true, &y_pred), (2, 1, 2, 1));
    }

    #[test]
    fn perfect_ranking_has_unit_auc() {
        let y_true = vec![0, 0, 1, 1];
        let probs = vec![0.1, 0.2, 0.8, 0.9];
        assert!((roc_auc(&y_true, &probs) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn random_constant_scores_have_half_auc() {
        let y_true = vec![0, 1, 0, 1];
        let probs = vec![0.5, 0.5, 0.5, 0.5];
        assert!((roc_auc(&y_true, &probs) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn evaluate_on_perfect_predictions() {
        let y_true = vec![1, 0, 1, 0];
        let probs = vec![0.9, 0.1, 0.8, 0.2];
        let eval = evaluate(&y_true, &probs, 0.5);
        assert_eq!(eval.accuracy, 1.0);
        assert_eq!(eval.precision, 1.0);
        assert_eq!(eval.recall, 1.0);
        assert_eq!(eval.f1, 1.0);
    }

    #[test]
    fn round4_truncates_to_four_digits() {
        assert_eq!(round4(0.123456), 0.1235);
        assert_eq!(round4(1.0), 1.0);
    }

    #[test]
    fn metrics_store_overwrites_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetricsStore::new(dir.path().join("metrics.csv"));

        let eval = Evaluation {
            accuracy: 0.9,
            precision: 0.8,
            recall: 0.7,
            f1: 0.75,
            roc_auc: 0.95,
        };
        store
            .upsert(&MetricsRow::from_evaluation("stacking", &eval))
            .unwrap();
        store
            .upsert(&MetricsRow::from_evaluation("baseline", &eval))
            .unwrap();

        let updated = Evaluation {
            accuracy: 0.95,
            ..eval
        };
        store
            .upsert(&MetricsRow::from_evaluation("stacking", &updated))
            .unwrap();

        let rows = store.read_all().unwrap();
        assert_eq!(rows.len(), 2);
        let stacking = rows.iter().find(|r| r.model == "stacking").unwrap();
        assert_eq!(stacking.accuracy, 0.95);
    }
}
