//! Interquartile-range outlier detection.

use tracing::debug;
use veriflow_core::{Frame, OutlierDetector};

use crate::stats;

/// Flags values outside `[q1 - factor*iqr, q3 + factor*iqr]`, column by
/// column. A row is anomalous when any selected column flags it.
#[derive(Debug, Clone, PartialEq)]
pub struct IqrDetector {
    pub factor: f64,
}

impl Default for IqrDetector {
    fn default() -> Self {
        Self { factor: 1.5 }
    }
}

impl IqrDetector {
    pub fn new(factor: f64) -> Self {
        Self { factor }
    }

    /// Lower and upper fences for one column, computed over the present
    /// values. `None` when the column holds no numbers.
    fn fences(&self, present: &[f64]) -> Option<(f64, f64)> {
        if present.is_empty() {
            return None;
        }
        let sorted = stats::sorted_copy(present);
        let q1 = stats::percentile(&sorted, 25.0);
        let q3 = stats::percentile(&sorted, 75.0);
        let iqr = q3 - q1;
        Some((q1 - iqr * self.factor, q3 + iqr * self.factor))
    }
}

impl OutlierDetector for IqrDetector {
    fn detect(&self, frame: &Frame, columns: &[String]) -> anyhow::Result<Vec<bool>> {
        let mut mask = vec![false; frame.row_count()];
        for name in columns {
            let Some(cells) = frame.numeric_column(name) else {
                debug!(column = %name, "column absent from frame, skipping");
                continue;
            };
            let present: Vec<f64> = cells.iter().flatten().copied().collect();
            let Some((lower, upper)) = self.fences(&present) else {
                continue;
            };
            for (cell, flag) in cells.iter().zip(mask.iter_mut()) {
                if let Some(value) = cell {
                    if *value < lower || *value > upper {
                        *flag = true;
                    }
                }
            }
        }
        Ok(mask)
    }

    fn name(&self) -> &str {
        "iqr"
    }
}
