//! Tabular payloads threaded through hooks and stage functions.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// A small in-memory table: named columns plus rows of JSON values.
///
/// Cells are `serde_json::Value` so heterogeneous fixture data moves
/// through the pipeline without a schema. Rows are padded with nulls or
/// truncated to the column count on insert.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Frame {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Append a row, padding short rows with nulls and dropping extras.
    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Null);
        self.rows.push(row);
    }

    /// Cell at `(row, column)`, if both exist.
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)
    }

    /// One column as floats; `None` cells are nulls or non-numeric values.
    /// Returns `None` when the column does not exist.
    pub fn numeric_column(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let idx = self.column_index(name)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(idx).and_then(Value::as_f64))
                .collect(),
        )
    }

    /// Names of every column whose non-null cells are all JSON numbers
    /// (and which has at least one such cell).
    pub fn numeric_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(idx, _)| {
                let mut saw_number = false;
                for row in &self.rows {
                    match row.get(*idx) {
                        Some(Value::Number(_)) => saw_number = true,
                        Some(Value::Null) | None => {}
                        Some(_) => return false,
                    }
                }
                saw_number
            })
            .map(|(_, name)| name.clone())
            .collect()
    }

    /// Parse CSV text into a frame, inferring cell types per value.
    ///
    /// Naive comma split without quoted-field support, which is all the
    /// harness fixtures need. Empty cells become nulls.
    pub fn from_csv_str(content: &str) -> Self {
        let mut lines = content.lines();
        let columns: Vec<String> = match lines.next() {
            Some(header) => header
                .split(',')
                .map(|s| s.trim().trim_matches('"').to_string())
                .collect(),
            None => return Self::empty(),
        };

        let mut frame = Self::new(columns);
        for line in lines {
            if line.trim().is_empty() {
                continue;
            }
            let row: Vec<Value> = line.split(',').map(infer_cell).collect();
            frame.push_row(row);
        }
        frame
    }

    pub fn from_csv_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_csv_str(&content))
    }

    /// Render the frame back to CSV text. Nulls serialize as empty cells.
    pub fn to_csv_string(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.columns.join(","));
        out.push('\n');
        for row in &self.rows {
            let cells: Vec<String> = row.iter().map(cell_to_csv).collect();
            out.push_str(&cells.join(","));
            out.push('\n');
        }
        out
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_csv_string())?;
        Ok(())
    }
}

/// What a load stage function reports back: where the rows went and how
/// many made it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadReceipt {
    pub destination: PathBuf,
    pub rows_written: usize,
}

impl LoadReceipt {
    pub fn new(destination: impl Into<PathBuf>, rows_written: usize) -> Self {
        Self {
            destination: destination.into(),
            rows_written,
        }
    }
}

fn infer_cell(raw: &str) -> Value {
    let s = raw.trim().trim_matches('"');
    if s.is_empty() {
        Value::Null
    } else if let Ok(i) = s.parse::<i64>() {
        Value::Number(i.into())
    } else if let Ok(f) = s.parse::<f64>() {
        serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(s.to_string()))
    } else if s == "true" || s == "false" {
        Value::Bool(s == "true")
    } else {
        Value::String(s.to_string())
    }
}

fn cell_to_csv(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
