//! Row-level rule checks: nulls, duplicate ids, numeric ranges, and
//! category membership.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;
use veriflow_core::{Frame, RuleCheck, RuleMask};

use crate::error::MlError;

/// Applies configured validation rules to a frame, producing one boolean
/// flag per row per rule family.
#[derive(Debug, Clone, Default)]
pub struct RuleValidator {
    required_columns: Vec<String>,
    id_column: String,
    allowed_ranges: HashMap<String, (f64, f64)>,
    allowed_categories: HashMap<String, Vec<String>>,
}

impl RuleValidator {
    pub fn new() -> Self {
        Self {
            id_column: "id".to_string(),
            ..Self::default()
        }
    }

    /// Columns that must not contain nulls.
    pub fn require_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_columns
            .extend(columns.into_iter().map(Into::into));
        self
    }

    /// Column used for the duplicate check. Defaults to `id`.
    pub fn id_column(mut self, name: impl Into<String>) -> Self {
        self.id_column = name.into();
        self
    }

    /// Inclusive bounds for a numeric column.
    pub fn allow_range(mut self, column: impl Into<String>, min: f64, max: f64) -> Self {
        self.allowed_ranges.insert(column.into(), (min, max));
        self
    }

    /// Permitted string values for a categorical column.
    pub fn allow_categories<I, S>(mut self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_categories
            .insert(column.into(), values.into_iter().map(Into::into).collect());
        self
    }

    /// Rows with a null in any required column. Required columns absent
    /// from the frame are skipped.
    pub fn check_nulls(&self, frame: &Frame) -> Vec<bool> {
        let mut mask = vec![false; frame.row_count()];
        for name in &self.required_columns {
            let Some(idx) = frame.column_index(name) else {
                continue;
            };
            for (row, flag) in frame.rows.iter().zip(mask.iter_mut()) {
                if matches!(row.get(idx), None | Some(Value::Null)) {
                    *flag = true;
                }
            }
        }
        mask
    }

    /// Rows whose value in `column` occurs more than once. Every member of
    /// a duplicate group is flagged, not just the repeats, and nulls count
    /// as equal to each other.
    pub fn check_duplicates(&self, frame: &Frame, column: &str) -> Result<Vec<bool>, MlError> {
        let idx = frame.column_index(column).ok_or_else(|| {
            MlError::rule(format!("column {column} not found for duplicate check"))
        })?;

        let mut counts: HashMap<String, usize> = HashMap::new();
        let keys: Vec<String> = frame
            .rows
            .iter()
            .map(|row| {
                row.get(idx)
                    .map_or_else(|| Value::Null.to_string(), Value::to_string)
            })
            .collect();
        for key in &keys {
            *counts.entry(key.clone()).or_insert(0) += 1;
        }

        Ok(keys.iter().map(|key| counts[key] > 1).collect())
    }

    /// Rows with a numeric value outside its configured bounds. Null and
    /// non-numeric cells are never range violations.
    pub fn check_ranges(&self, frame: &Frame) -> Vec<bool> {
        let mut mask = vec![false; frame.row_count()];
        for (name, (min, max)) in &self.allowed_ranges {
            let Some(cells) = frame.numeric_column(name) else {
                continue;
            };
            for (cell, flag) in cells.iter().zip(mask.iter_mut()) {
                if let Some(value) = cell {
                    if value < min || value > max {
                        *flag = true;
                    }
                }
            }
        }
        mask
    }

    /// Rows whose cell is not one of the permitted strings. Null and
    /// non-string cells fail the membership test and are flagged.
    pub fn check_categories(&self, frame: &Frame) -> Vec<bool> {
        let mut mask = vec![false; frame.row_count()];
        for (name, values) in &self.allowed_categories {
            let Some(idx) = frame.column_index(name) else {
                continue;
            };
            for (row, flag) in frame.rows.iter().zip(mask.iter_mut()) {
                let allowed =
                    matches!(row.get(idx), Some(Value::String(s)) if values.contains(s));
                if !allowed {
                    *flag = true;
                }
            }
        }
        mask
    }
}

impl RuleCheck for RuleValidator {
    fn validate(&self, frame: &Frame) -> anyhow::Result<RuleMask> {
        Ok(RuleMask {
            null_or_missing: self.check_nulls(frame),
            duplicate_id: self.check_duplicates(frame, &self.id_column)?,
            range_violation: self.check_ranges(frame),
            invalid_category: self.check_categories(frame),
        })
    }
}

/// Per-rule violation counts, keyed by rule family, plus the combined
/// `anomaly` count.
pub fn mask_summary(mask: &RuleMask) -> BTreeMap<String, usize> {
    let count = |flags: &[bool]| flags.iter().filter(|f| **f).count();
    let mut summary = BTreeMap::new();
    summary.insert("null_or_missing".to_string(), count(&mask.null_or_missing));
    summary.insert("duplicate_id".to_string(), count(&mask.duplicate_id));
    summary.insert("range_violation".to_string(), count(&mask.range_violation));
    summary.insert(
        "invalid_category".to_string(),
        count(&mask.invalid_category),
    );
    summary.insert("anomaly".to_string(), mask.flagged_count());
    summary
}
