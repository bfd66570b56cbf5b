//! Reconstruction-error outlier detection.
//!
//! Projects standardized rows onto the dominant principal component
//! (found by power iteration), reconstructs them, and scores each row by
//! its mean squared reconstruction error. Rows the dominant component
//! cannot explain score high.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use veriflow_core::{Frame, OutlierDetector};

use crate::features::FeatureMatrix;
use crate::stats;

#[derive(Debug, Clone, PartialEq)]
pub struct ReconstructionDetector {
    /// Percentile of the nonzero errors used as the flag threshold.
    pub quantile: f64,
    pub max_iter: usize,
    pub seed: u64,
}

impl Default for ReconstructionDetector {
    fn default() -> Self {
        Self {
            quantile: 95.0,
            max_iter: 100,
            seed: 42,
        }
    }
}

impl ReconstructionDetector {
    pub fn new(quantile: f64) -> Self {
        Self {
            quantile,
            ..Self::default()
        }
    }

    /// Mean squared reconstruction error per row against the dominant
    /// principal component of the standardized matrix.
    pub fn reconstruction_errors(&self, matrix: &FeatureMatrix) -> Vec<f64> {
        let n = matrix.n_rows();
        let d = matrix.n_cols();
        let component = self.principal_component(matrix);

        (0..n)
            .map(|row| {
                let projection: f64 = (0..d)
                    .map(|col| matrix.value(row, col) * component[col])
                    .sum();
                (0..d)
                    .map(|col| {
                        let delta = matrix.value(row, col) - projection * component[col];
                        delta * delta
                    })
                    .sum::<f64>()
                    / d as f64
            })
            .collect()
    }

    fn principal_component(&self, matrix: &FeatureMatrix) -> Vec<f64> {
        let n = matrix.n_rows();
        let d = matrix.n_cols();
        let mut rng = StdRng::seed_from_u64(self.seed);

        let mut v: Vec<f64> = (0..d).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let norm = l2_norm(&v);
        if norm < f64::EPSILON {
            v = (0..d).map(|col| if col == 0 { 1.0 } else { 0.0 }).collect();
        } else {
            for value in &mut v {
                *value /= norm;
            }
        }

        for _ in 0..self.max_iter {
            // One multiply by the covariance of the standardized data.
            let projected: Vec<f64> = (0..n)
                .map(|row| (0..d).map(|col| matrix.value(row, col) * v[col]).sum())
                .collect();
            let mut w = vec![0.0; d];
            for (col, value) in w.iter_mut().enumerate() {
                *value = (0..n)
                    .map(|row| matrix.value(row, col) * projected[row])
                    .sum::<f64>()
                    / n as f64;
            }

            let norm = l2_norm(&w);
            if norm < f64::EPSILON {
                break;
            }
            for value in &mut w {
                *value /= norm;
            }
            let aligned = dot(&w, &v).abs() > 1.0 - 1e-12;
            v = w;
            if aligned {
                break;
            }
        }
        v
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn l2_norm(v: &[f64]) -> f64 {
    dot(v, v).sqrt()
}

impl OutlierDetector for ReconstructionDetector {
    fn detect(&self, frame: &Frame, columns: &[String]) -> anyhow::Result<Vec<bool>> {
        let mut matrix = FeatureMatrix::from_frame(frame, columns)?;
        if matrix.is_empty() || matrix.n_rows() < 2 {
            return Ok(vec![false; frame.row_count()]);
        }
        matrix.standardize();

        let errors = self.reconstruction_errors(&matrix);
        let max = errors.iter().copied().fold(0.0, f64::max);
        let nonzero: Vec<f64> = errors.iter().copied().filter(|e| *e > 0.0).collect();

        // With plenty of nonzero errors the threshold is a percentile of
        // them; with only a handful, half the max; with none, a value no
        // row can reach.
        let threshold = if nonzero.is_empty() {
            max + 1.0
        } else if nonzero.len() > 20 {
            let sorted = stats::sorted_copy(&nonzero);
            stats::percentile(&sorted, self.quantile.clamp(0.0, 100.0))
        } else {
            max * 0.5
        };

        Ok(errors.into_iter().map(|e| e > threshold).collect())
    }

    fn name(&self) -> &str {
        "reconstruction"
    }
}
