//! Clustering-based outlier detection.
//!
//! Runs Lloyd's algorithm on the standardized features and flags rows
//! whose distance to the nearest centroid exceeds
//! `mean + threshold_sigmas * std` of all such distances.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use veriflow_core::{Frame, OutlierDetector};

use crate::features::FeatureMatrix;
use crate::stats;

#[derive(Debug, Clone, PartialEq)]
pub struct KMeansDetector {
    /// Cluster count. `None` scales with the row count.
    pub k: Option<usize>,
    pub max_iter: usize,
    pub threshold_sigmas: f64,
    pub seed: u64,
}

impl Default for KMeansDetector {
    fn default() -> Self {
        Self {
            k: None,
            max_iter: 100,
            threshold_sigmas: 3.0,
            seed: 42,
        }
    }
}

impl KMeansDetector {
    pub fn new(k: usize) -> Self {
        Self {
            k: Some(k),
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Effective cluster count for a given row count: the configured `k`,
    /// or one cluster per thousand rows bounded to `[3, 10]`, never more
    /// than the rows available.
    pub fn cluster_count(&self, rows: usize) -> usize {
        let auto = (rows / 1000).clamp(3, 10);
        self.k.unwrap_or(auto).min(rows).max(1)
    }

    fn centroids(&self, matrix: &FeatureMatrix, k: usize) -> Vec<Vec<f64>> {
        let n = matrix.n_rows();
        let mut rng = StdRng::seed_from_u64(self.seed);
        let all_rows: Vec<usize> = (0..n).collect();
        let mut centroids: Vec<Vec<f64>> = all_rows
            .choose_multiple(&mut rng, k)
            .map(|&row| matrix.row(row))
            .collect();

        let mut assignment = vec![usize::MAX; n];
        for _ in 0..self.max_iter {
            let next: Vec<usize> = (0..n)
                .map(|row| nearest(matrix, row, &centroids).0)
                .collect();
            if next == assignment {
                break;
            }
            assignment = next;

            for (cluster, centroid) in centroids.iter_mut().enumerate() {
                let members: Vec<usize> = assignment
                    .iter()
                    .enumerate()
                    .filter(|(_, a)| **a == cluster)
                    .map(|(row, _)| row)
                    .collect();
                // An emptied cluster keeps its previous centroid.
                if members.is_empty() {
                    continue;
                }
                for (col, value) in centroid.iter_mut().enumerate() {
                    *value = members
                        .iter()
                        .map(|&row| matrix.value(row, col))
                        .sum::<f64>()
                        / members.len() as f64;
                }
            }
        }
        centroids
    }
}

/// Index of the closest centroid and the squared distance to it.
fn nearest(matrix: &FeatureMatrix, row: usize, centroids: &[Vec<f64>]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (idx, centroid) in centroids.iter().enumerate() {
        let mut dist = 0.0;
        for (col, center) in centroid.iter().enumerate() {
            let delta = matrix.value(row, col) - center;
            dist += delta * delta;
        }
        if dist < best.1 {
            best = (idx, dist);
        }
    }
    best
}

impl OutlierDetector for KMeansDetector {
    fn detect(&self, frame: &Frame, columns: &[String]) -> anyhow::Result<Vec<bool>> {
        let mut matrix = FeatureMatrix::from_frame(frame, columns)?;
        if matrix.is_empty() || matrix.n_rows() < 2 {
            return Ok(vec![false; frame.row_count()]);
        }
        matrix.standardize();

        let k = self.cluster_count(matrix.n_rows());
        let centroids = self.centroids(&matrix, k);
        let distances: Vec<f64> = (0..matrix.n_rows())
            .map(|row| nearest(&matrix, row, &centroids).1.sqrt())
            .collect();

        let m = stats::mean(&distances);
        let threshold = m + self.threshold_sigmas * stats::population_std(&distances, m);
        Ok(distances.into_iter().map(|d| d > threshold).collect())
    }

    fn name(&self) -> &str {
        "clustering"
    }
}
