//! Column-major table of mixed numeric/categorical transaction data.
//!
//! A `Frame` is the unit the preprocessing stages operate on: the trainer
//! builds one from the dataset CSV, the predictor builds a one-row frame from
//! an inbound record, and both are lowered to an `ndarray` matrix (in the
//! model's feature order) right before hitting a model.
use ndarray::Array2;

use crate::error::PipelineError;
use crate::schema::{FieldType, FieldValue, Record, Schema};

/// Values of one column; `None` marks a missing value.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    Numeric(Vec<Option<f64>>),
    Categorical(Vec<Option<String>>),
}

impl ColumnValues {
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Numeric(v) => v.len(),
            ColumnValues::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Count of non-missing entries.
    pub fn n_present(&self) -> usize {
        match self {
            ColumnValues::Numeric(v) => v.iter().filter(|x| x.is_some()).count(),
            ColumnValues::Categorical(v) => v.iter().filter(|x| x.is_some()).count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: ColumnValues,
}

/// A small column-major data frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    columns: Vec<Column>,
}

impl Frame {
    pub fn new(columns: Vec<Column>) -> Self {
        Frame { columns }
    }

    pub fn nrows(&self) -> usize {
        self.columns.first().map_or(0, |c| c.values.len())
    }

    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn columns_mut(&mut self) -> &mut [Column] {
        &mut self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    /// Whether any column still holds raw text values.
    pub fn has_text_columns(&self) -> bool {
        self.columns
            .iter()
            .any(|c| matches!(c.values, ColumnValues::Categorical(_)))
    }

    /// Whether any value anywhere in the frame is missing.
    pub fn has_missing(&self) -> bool {
        self.columns.iter().any(|c| c.values.n_present() < c.values.len())
    }

    /// Build a one-row frame from an inbound record, validated against the
    /// schema. Fails with `FeatureMismatch` when a schema field is absent and
    /// `InvalidInput` when a value has the wrong type.
    pub fn from_record(record: &Record, schema: &Schema) -> Result<Frame, PipelineError> {
        let mut columns = Vec::with_capacity(schema.len());
        for field in schema {
            let value = record
                .get(&field.name)
                .ok_or_else(|| PipelineError::FeatureMismatch(field.name.clone()))?;
            let values = match (field.dtype, value) {
                (_, FieldValue::Null) => {
                    if field.dtype.is_numeric() {
                        ColumnValues::Numeric(vec![None])
                    } else {
                        ColumnValues::Categorical(vec![None])
                    }
                }
                (FieldType::Int, FieldValue::Int(i)) => {
                    ColumnValues::Numeric(vec![Some(*i as f64)])
                }
                (FieldType::Float, FieldValue::Float(x)) => ColumnValues::Numeric(vec![Some(*x)]),
                (FieldType::Float, FieldValue::Int(i)) => {
                    ColumnValues::Numeric(vec![Some(*i as f64)])
                }
                (FieldType::Bool, FieldValue::Bool(b)) => {
                    ColumnValues::Numeric(vec![Some(if *b { 1.0 } else { 0.0 })])
                }
                (FieldType::Text, FieldValue::Text(s)) => {
                    ColumnValues::Categorical(vec![Some(s.clone())])
                }
                (expected, got) => {
                    return Err(PipelineError::InvalidInput(format!(
                        "field '{}' expects {:?}, got {:?}",
                        field.name, expected, got
                    )));
                }
            };
            columns.push(Column {
                name: field.name.clone(),
                values,
            });
        }
        Ok(Frame::new(columns))
    }

    /// Lower the frame to a feature matrix with columns reindexed to exactly
    /// `feature_order`. Missing values become NaN; a requested column that is
    /// absent fails with `FeatureMismatch`, and one that is still categorical
    /// (encoding was skipped) fails with `InvalidInput`.
    pub fn to_matrix(&self, feature_order: &[String]) -> Result<Array2<f32>, PipelineError> {
        let nrows = self.nrows();
        let mut data = Vec::with_capacity(nrows * feature_order.len());
        for row in 0..nrows {
            for name in feature_order {
                let column = self
                    .column(name)
                    .ok_or_else(|| PipelineError::FeatureMismatch(name.clone()))?;
                match &column.values {
                    ColumnValues::Numeric(values) => {
                        data.push(values[row].map_or(f32::NAN, |v| v as f32));
                    }
                    ColumnValues::Categorical(_) => {
                        return Err(PipelineError::InvalidInput(format!(
                            "column '{}' was not encoded before matrix conversion",
                            name
                        )));
                    }
                }
            }
        }
        // Shape is consistent by construction above.
        Ok(Array2::from_shape_vec((nrows, feature_order.len()), data)
            .expect("row-major buffer matches shape"))
    }
}
