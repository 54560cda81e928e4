//! Deterministic impute/encode/scale preprocessing with persisted artifacts.
//!
//! Fit mode runs once per training pass and overwrites the persisted encoder
//! table and scaling statistics unconditionally. Apply mode loads them and
//! never refits; the only per-batch computation in apply mode is missing-value
//! imputation, which by contract operates on the current batch.
use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::frame::{ColumnValues, Frame};

/// Fill missing values in place: numeric columns take the column median,
/// text columns the most frequent value (lexically smallest on ties).
/// Columns with zero non-missing values are skipped.
pub fn impute_missing(frame: &mut Frame) {
    for column in frame.columns_mut() {
        match &mut column.values {
            ColumnValues::Numeric(values) => {
                let mut present: Vec<f64> = values.iter().filter_map(|v| *v).collect();
                if present.is_empty() {
                    log::warn!("Column '{}' has no values to impute from; skipping", column.name);
                    continue;
                }
                present.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                let median = if present.len() % 2 == 1 {
                    present[present.len() / 2]
                } else {
                    let hi = present.len() / 2;
                    (present[hi - 1] + present[hi]) / 2.0
                };
                for v in values.iter_mut() {
                    if v.is_none() {
                        *v = Some(median);
                    }
                }
            }
            ColumnValues::Categorical(values) => {
                let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
                for v in values.iter().flatten() {
                    *counts.entry(v.as_str()).or_default() += 1;
                }
                let Some(most_frequent) = counts
                    .iter()
                    .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
                    .map(|(v, _)| v.to_string())
                else {
                    log::warn!("Column '{}' has no values to impute from; skipping", column.name);
                    continue;
                };
                for v in values.iter_mut() {
                    if v.is_none() {
                        *v = Some(most_frequent.clone());
                    }
                }
            }
        }
    }
}

/// Per-text-column mapping from raw value to integer code, built once from
/// training data. Codes follow the sorted order of the distinct fit-time
/// values so repeated fits on the same data produce identical tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryEncoder {
    tables: BTreeMap<String, BTreeMap<String, i64>>,
}

impl CategoryEncoder {
    pub fn fit(frame: &Frame) -> Self {
        let mut tables = BTreeMap::new();
        for column in frame.columns() {
            if let ColumnValues::Categorical(values) = &column.values {
                let mut distinct: Vec<&String> = values.iter().flatten().collect();
                distinct.sort();
                distinct.dedup();
                let table: BTreeMap<String, i64> = distinct
                    .into_iter()
                    .enumerate()
                    .map(|(code, value)| (value.clone(), code as i64))
                    .collect();
                tables.insert(column.name.clone(), table);
            }
        }
        CategoryEncoder { tables }
    }

    /// Replace every text column with its integer codes. A value absent from
    /// the fitted table is an `UnseenCategory` error.
    pub fn apply(&self, frame: &mut Frame) -> Result<(), PipelineError> {
        for column in frame.columns_mut() {
            let ColumnValues::Categorical(values) = &column.values else {
                continue;
            };
            let table = self.tables.get(&column.name).ok_or_else(|| {
                PipelineError::ArtifactMissing(format!("encoder table for column '{}'", column.name))
            })?;
            let mut encoded = Vec::with_capacity(values.len());
            for value in values {
                match value {
                    None => encoded.push(None),
                    Some(raw) => {
                        let code = table.get(raw).ok_or_else(|| PipelineError::UnseenCategory {
                            column: column.name.clone(),
                            value: raw.clone(),
                        })?;
                        encoded.push(Some(*code as f64));
                    }
                }
            }
            column.values = ColumnValues::Numeric(encoded);
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Per-column standardization statistics fit once from the fully-encoded
/// training frame.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scaler {
    pub columns: Vec<String>,
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
}

impl Scaler {
    /// Minimum stddev to avoid division by zero when transforming.
    const MIN_STD: f64 = 1e-6;

    pub fn fit(frame: &Frame) -> Self {
        let mut columns = Vec::new();
        let mut mean = Vec::new();
        let mut std = Vec::new();
        for column in frame.columns() {
            let ColumnValues::Numeric(values) = &column.values else {
                continue;
            };
            let present: Vec<f64> = values.iter().filter_map(|v| *v).collect();
            if present.is_empty() {
                continue;
            }
            let n = present.len() as f64;
            let m = present.iter().sum::<f64>() / n;
            let var = present.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / n;
            columns.push(column.name.clone());
            mean.push(m);
            std.push(var.sqrt().max(Self::MIN_STD));
        }
        Scaler { columns, mean, std }
    }

    /// Apply `(x - mean) / std` per column using the fitted statistics. A
    /// fitted column absent from the frame is a `FeatureMismatch` error.
    pub fn apply(&self, frame: &mut Frame) -> Result<(), PipelineError> {
        for ((name, mean), std) in self.columns.iter().zip(&self.mean).zip(&self.std) {
            let column = frame
                .column_mut(name)
                .ok_or_else(|| PipelineError::FeatureMismatch(name.clone()))?;
            match &mut column.values {
                ColumnValues::Numeric(values) => {
                    for v in values.iter_mut().flatten() {
                        *v = (*v - mean) / std;
                    }
                }
                ColumnValues::Categorical(_) => {
                    return Err(PipelineError::InvalidInput(format!(
                        "column '{}' must be encoded before scaling",
                        name
                    )));
                }
            }
        }
        Ok(())
    }
}

/// The two persisted preprocessing artifacts, written by one training run and
/// read-only for the lifetime of the serving process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessArtifacts {
    pub encoder: CategoryEncoder,
    pub scaler: Scaler,
}

impl PreprocessArtifacts {
    /// Persist both artifacts, overwriting unconditionally.
    pub fn save<P: AsRef<Path>>(&self, encoders_path: P, scaler_path: P) -> Result<()> {
        write_json(encoders_path.as_ref(), &self.encoder)?;
        write_json(scaler_path.as_ref(), &self.scaler)?;
        Ok(())
    }

    /// Load persisted artifacts; fails with `ArtifactMissing` when either
    /// file is absent or unreadable.
    pub fn load<P: AsRef<Path>>(
        encoders_path: P,
        scaler_path: P,
    ) -> Result<Self, PipelineError> {
        let encoder = read_json(encoders_path.as_ref())?;
        let scaler = read_json(scaler_path.as_ref())?;
        Ok(PreprocessArtifacts { encoder, scaler })
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, PipelineError> {
    let content = std::fs::read_to_string(path)
        .map_err(|_| PipelineError::ArtifactMissing(path.display().to_string()))?;
    serde_json::from_str(&content)
        .map_err(|_| PipelineError::ArtifactMissing(path.display().to_string()))
}

/// Fit-mode pipeline: impute, fit + apply the encoder, fit + apply the
/// scaler. Returns the fitted artifacts; persisting them is the caller's
/// responsibility so tests can run without touching disk.
pub fn fit_pipeline(frame: &mut Frame) -> Result<PreprocessArtifacts, PipelineError> {
    impute_missing(frame);
    let encoder = CategoryEncoder::fit(frame);
    if encoder.is_empty() {
        log::debug!("No categorical columns to encode");
    }
    encoder.apply(frame)?;
    let scaler = Scaler::fit(frame);
    scaler.apply(frame)?;
    Ok(PreprocessArtifacts { encoder, scaler })
}

/// Apply-mode pipeline: impute and encode only when raw text columns are
/// present, then always scale with the fit-time statistics.
pub fn apply_pipeline(
    frame: &mut Frame,
    artifacts: &PreprocessArtifacts,
) -> Result<(), PipelineError> {
    if frame.has_text_columns() {
        impute_missing(frame);
        artifacts.encoder.apply(frame)?;
    }
    artifacts.scaler.apply(frame)?;
    Ok(())
}
