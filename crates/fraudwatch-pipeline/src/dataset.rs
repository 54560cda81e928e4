//! Schema-driven CSV reader for the processed transaction dataset.
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use csv::StringRecord;

use crate::frame::{Column, ColumnValues, Frame};
use crate::schema::{FieldSpec, FieldType, Schema};

/// A loaded training dataset: feature frame plus fraud labels.
#[derive(Debug)]
pub struct LabeledData {
    pub frame: Frame,
    pub labels: Vec<i32>,
}

/// Read the training dataset at `path`, parsing feature columns per `schema`
/// and splitting off `label_column`. Empty cells are treated as missing.
pub fn read_dataset_csv<P: AsRef<Path>>(
    path: P,
    schema: &Schema,
    label_column: &str,
) -> Result<LabeledData> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(&path)
        .with_context(|| format!("Failed to open dataset: {}", path.as_ref().display()))?;

    let headers = reader
        .headers()
        .context("Failed to read dataset header row")?
        .clone();

    let label_idx = find_column(&headers, label_column)
        .ok_or_else(|| anyhow!("Missing label column '{}'", label_column))?;

    let field_indices = schema
        .iter()
        .map(|field| {
            find_column(&headers, &field.name)
                .ok_or_else(|| anyhow!("Missing schema column '{}'", field.name))
        })
        .collect::<Result<Vec<usize>>>()?;

    let mut columns: Vec<Column> = schema
        .iter()
        .map(|field| Column {
            name: field.name.clone(),
            values: if field.dtype.is_numeric() {
                ColumnValues::Numeric(Vec::new())
            } else {
                ColumnValues::Categorical(Vec::new())
            },
        })
        .collect();
    let mut labels = Vec::new();

    for (row_idx, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read row {}", row_idx + 1))?;

        let label_raw = record
            .get(label_idx)
            .ok_or_else(|| anyhow!("Missing label value at row {}", row_idx + 1))?;
        let label = label_raw
            .trim()
            .parse::<f64>()
            .map(|v| v as i32)
            .with_context(|| format!("Invalid label '{}' at row {}", label_raw, row_idx + 1))?;
        labels.push(label);

        for (field, (&idx, column)) in schema
            .iter()
            .zip(field_indices.iter().zip(columns.iter_mut()))
        {
            let raw = record.get(idx).unwrap_or_default().trim();
            match &mut column.values {
                ColumnValues::Categorical(values) => {
                    values.push(if raw.is_empty() {
                        None
                    } else {
                        Some(raw.to_string())
                    });
                }
                ColumnValues::Numeric(values) => {
                    values.push(parse_numeric(raw, field, row_idx)?);
                }
            }
        }
    }

    let frame = Frame::new(columns);
    log::info!(
        "Loaded {} rows x {} feature columns from {}",
        frame.nrows(),
        frame.ncols(),
        path.as_ref().display()
    );

    Ok(LabeledData { frame, labels })
}

fn parse_numeric(raw: &str, field: &FieldSpec, row_idx: usize) -> Result<Option<f64>> {
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    let value = match field.dtype {
        FieldType::Bool => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" => 1.0,
            "false" | "0" => 0.0,
            other => {
                return Err(anyhow!(
                    "Invalid bool '{}' in column '{}' at row {}",
                    other,
                    field.name,
                    row_idx + 1
                ))
            }
        },
        _ => raw.parse::<f64>().with_context(|| {
            format!(
                "Invalid number '{}' in column '{}' at row {}",
                raw,
                field.name,
                row_idx + 1
            )
        })?,
    };
    Ok(Some(value))
}

/// Derive a feature schema from a dataset CSV by scanning up to
/// `sample_rows` rows per column. This is an offline authoring helper; the
/// result is meant to be reviewed and checked into configuration, not used at
/// service startup.
pub fn infer_schema<P: AsRef<Path>>(
    path: P,
    label_column: &str,
    sample_rows: usize,
) -> Result<Schema> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(&path)
        .with_context(|| format!("Failed to open dataset: {}", path.as_ref().display()))?;

    let headers = reader.headers().context("Failed to read header row")?.clone();
    let mut kinds: Vec<ColumnKind> = vec![ColumnKind::Unseen; headers.len()];

    for result in reader.records().take(sample_rows) {
        let record = result?;
        for (idx, kind) in kinds.iter_mut().enumerate() {
            let raw = record.get(idx).unwrap_or_default().trim();
            if raw.is_empty() || raw.eq_ignore_ascii_case("nan") {
                continue;
            }
            *kind = kind.narrow(raw);
        }
    }

    let schema = headers
        .iter()
        .zip(kinds)
        .filter(|(name, _)| *name != label_column)
        .map(|(name, kind)| FieldSpec::new(name, kind.into_field_type()))
        .collect();
    Ok(schema)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ColumnKind {
    Unseen,
    Int,
    Float,
    Bool,
    Text,
}

impl ColumnKind {
    fn narrow(self, raw: &str) -> ColumnKind {
        let observed = if matches!(raw.to_ascii_lowercase().as_str(), "true" | "false") {
            ColumnKind::Bool
        } else if raw.parse::<i64>().is_ok() {
            ColumnKind::Int
        } else if raw.parse::<f64>().is_ok() {
            ColumnKind::Float
        } else {
            ColumnKind::Text
        };
        match (self, observed) {
            (ColumnKind::Unseen, o) => o,
            (k, o) if k == o => k,
            (ColumnKind::Int, ColumnKind::Float) | (ColumnKind::Float, ColumnKind::Int) => {
                ColumnKind::Float
            }
            _ => ColumnKind::Text,
        }
    }

    fn into_field_type(self) -> FieldType {
        match self {
            ColumnKind::Int => FieldType::Int,
            ColumnKind::Float => FieldType::Float,
            ColumnKind::Bool => FieldType::Bool,
            // Columns with no observed values default to text.
            ColumnKind::Text | ColumnKind::Unseen => FieldType::Text,
        }
    }
}

fn find_column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.eq_ignore_ascii_case(name))
}
