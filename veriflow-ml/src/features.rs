//! Numeric feature extraction from frames.

use tracing::debug;
use veriflow_core::Frame;

use crate::error::MlError;
use crate::stats;

/// A numeric matrix extracted from a frame, stored column-major.
///
/// Missing cells are imputed with the column mean at construction, so the
/// model-style detectors always see a dense matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    columns: Vec<String>,
    rows: usize,
    data: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    /// Build a matrix from the named columns. Names absent from the frame
    /// are skipped; a present column with no numeric values at all is an
    /// error because there is no mean to impute with.
    pub fn from_frame(frame: &Frame, columns: &[String]) -> Result<Self, MlError> {
        let rows = frame.row_count();
        let mut kept = Vec::new();
        let mut data = Vec::new();

        for name in columns {
            let Some(cells) = frame.numeric_column(name) else {
                debug!(column = %name, "column absent from frame, skipping");
                continue;
            };
            let present: Vec<f64> = cells.iter().flatten().copied().collect();
            if rows > 0 && present.is_empty() {
                return Err(MlError::feature(format!(
                    "column {name} has no numeric values"
                )));
            }
            let fill = stats::mean(&present);
            data.push(cells.iter().map(|cell| cell.unwrap_or(fill)).collect());
            kept.push(name.clone());
        }

        Ok(Self {
            columns: kept,
            rows,
            data,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.rows
    }

    pub fn n_cols(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.data.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column(&self, col: usize) -> &[f64] {
        &self.data[col]
    }

    pub fn value(&self, row: usize, col: usize) -> f64 {
        self.data[col][row]
    }

    pub fn row(&self, row: usize) -> Vec<f64> {
        self.data.iter().map(|column| column[row]).collect()
    }

    /// Center each column to zero mean and scale to unit variance. A
    /// constant column stays at zero after centering.
    pub fn standardize(&mut self) {
        for column in &mut self.data {
            let m = stats::mean(column);
            let std = stats::population_std(column, m);
            if std < f64::EPSILON {
                for value in column.iter_mut() {
                    *value -= m;
                }
            } else {
                for value in column.iter_mut() {
                    *value = (*value - m) / std;
                }
            }
        }
    }
}
