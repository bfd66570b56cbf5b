//! Isolation-forest outlier detection.
//!
//! Rows that random axis-aligned splits isolate quickly score close to
//! 1.0; rows buried in dense regions score lower. The top `contamination`
//! fraction of scores is flagged.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use veriflow_core::{Frame, OutlierDetector};

use crate::features::FeatureMatrix;
use crate::stats;

const EULER_MASCHERONI: f64 = 0.577_215_664_9;

#[derive(Debug, Clone, PartialEq)]
pub struct IsolationForest {
    pub trees: usize,
    pub sample_size: usize,
    /// Expected fraction of anomalous rows, in `(0, 0.5]`.
    pub contamination: f64,
    pub seed: u64,
}

impl Default for IsolationForest {
    fn default() -> Self {
        Self {
            trees: 100,
            sample_size: 256,
            contamination: 0.05,
            seed: 42,
        }
    }
}

enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl IsolationForest {
    pub fn new(contamination: f64) -> Self {
        Self {
            contamination,
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Anomaly score per row, higher meaning easier to isolate. Scores are
    /// `2^(-avg_depth / c(sample))` per the standard formulation.
    pub fn scores(&self, matrix: &FeatureMatrix) -> Vec<f64> {
        let n = matrix.n_rows();
        let sample = self.sample_size.min(n).max(2);
        let depth_limit = (sample as f64).log2().ceil() as usize;
        let all_rows: Vec<usize> = (0..n).collect();

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut total_depth = vec![0.0; n];
        for _ in 0..self.trees {
            let rows: Vec<usize> = all_rows
                .choose_multiple(&mut rng, sample)
                .copied()
                .collect();
            let tree = grow(matrix, &rows, 0, depth_limit, &mut rng);
            for (row, depth) in total_depth.iter_mut().enumerate() {
                *depth += path_length(&tree, matrix, row, 0.0);
            }
        }

        let norm = average_path_length(sample);
        total_depth
            .iter()
            .map(|depth| 2f64.powf(-(depth / self.trees as f64) / norm))
            .collect()
    }
}

fn grow(
    matrix: &FeatureMatrix,
    rows: &[usize],
    depth: usize,
    limit: usize,
    rng: &mut StdRng,
) -> Node {
    if depth >= limit || rows.len() <= 1 {
        return Node::Leaf { size: rows.len() };
    }

    // Only features with spread among these rows can host a split.
    let splittable: Vec<(usize, f64, f64)> = (0..matrix.n_cols())
        .filter_map(|col| {
            let mut lo = f64::INFINITY;
            let mut hi = f64::NEG_INFINITY;
            for &row in rows {
                let v = matrix.value(row, col);
                lo = lo.min(v);
                hi = hi.max(v);
            }
            (hi - lo > f64::EPSILON).then_some((col, lo, hi))
        })
        .collect();
    let Some(&(feature, lo, hi)) = splittable.choose(rng) else {
        return Node::Leaf { size: rows.len() };
    };

    let threshold = rng.gen_range(lo..hi);
    let (left, right): (Vec<usize>, Vec<usize>) = rows
        .iter()
        .copied()
        .partition(|&row| matrix.value(row, feature) < threshold);
    if left.is_empty() || right.is_empty() {
        return Node::Leaf { size: rows.len() };
    }

    Node::Split {
        feature,
        threshold,
        left: Box::new(grow(matrix, &left, depth + 1, limit, rng)),
        right: Box::new(grow(matrix, &right, depth + 1, limit, rng)),
    }
}

fn path_length(node: &Node, matrix: &FeatureMatrix, row: usize, depth: f64) -> f64 {
    match node {
        Node::Leaf { size } => depth + average_path_length(*size),
        Node::Split {
            feature,
            threshold,
            left,
            right,
        } => {
            if matrix.value(row, *feature) < *threshold {
                path_length(left, matrix, row, depth + 1.0)
            } else {
                path_length(right, matrix, row, depth + 1.0)
            }
        }
    }
}

/// Expected path length of an unsuccessful binary search over `n` items,
/// the normalizer from the isolation-forest papers.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let nf = n as f64;
            2.0 * ((nf - 1.0).ln() + EULER_MASCHERONI) - 2.0 * (nf - 1.0) / nf
        }
    }
}

impl OutlierDetector for IsolationForest {
    fn detect(&self, frame: &Frame, columns: &[String]) -> anyhow::Result<Vec<bool>> {
        let mut matrix = FeatureMatrix::from_frame(frame, columns)?;
        if matrix.is_empty() || matrix.n_rows() < 2 {
            return Ok(vec![false; frame.row_count()]);
        }
        matrix.standardize();

        let scores = self.scores(&matrix);
        let sorted = stats::sorted_copy(&scores);
        let pct = ((1.0 - self.contamination) * 100.0).clamp(0.0, 100.0);
        let threshold = stats::percentile(&sorted, pct);
        Ok(scores.into_iter().map(|score| score > threshold).collect())
    }

    fn name(&self) -> &str {
        "isolation_forest"
    }
}
