//! Config-driven detector selection.

use serde::{Deserialize, Serialize};
use veriflow_core::OutlierDetector;

use crate::anomaly::IqrDetector;
use crate::cluster::KMeansDetector;
use crate::error::MlError;
use crate::forest::IsolationForest;
use crate::reconstruct::ReconstructionDetector;

/// Which detector to run and with which parameters. Deserializes from a
/// `method`-tagged table so configs read as
/// `{ method = "isolation_forest", contamination = 0.1 }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum AnomalyMethod {
    Iqr {
        #[serde(default = "default_factor")]
        factor: f64,
    },
    IsolationForest {
        #[serde(default = "default_trees")]
        trees: usize,
        #[serde(default = "default_sample_size")]
        sample_size: usize,
        #[serde(default = "default_contamination")]
        contamination: f64,
        #[serde(default = "default_seed")]
        seed: u64,
    },
    Clustering {
        #[serde(default)]
        k: Option<usize>,
        #[serde(default = "default_max_iter")]
        max_iter: usize,
        #[serde(default = "default_sigmas")]
        threshold_sigmas: f64,
        #[serde(default = "default_seed")]
        seed: u64,
    },
    Reconstruction {
        #[serde(default = "default_quantile")]
        quantile: f64,
        #[serde(default = "default_seed")]
        seed: u64,
    },
}

impl Default for AnomalyMethod {
    fn default() -> Self {
        Self::Iqr {
            factor: default_factor(),
        }
    }
}

fn default_factor() -> f64 {
    1.5
}

fn default_trees() -> usize {
    100
}

fn default_sample_size() -> usize {
    256
}

fn default_contamination() -> f64 {
    0.05
}

fn default_max_iter() -> usize {
    100
}

fn default_sigmas() -> f64 {
    3.0
}

fn default_quantile() -> f64 {
    95.0
}

fn default_seed() -> u64 {
    42
}

/// Construct the detector a method describes, rejecting parameters
/// outside their domain.
pub fn build_detector(method: &AnomalyMethod) -> Result<Box<dyn OutlierDetector>, MlError> {
    match method {
        AnomalyMethod::Iqr { factor } => {
            if !factor.is_finite() || *factor <= 0.0 {
                return Err(MlError::invalid_input(format!(
                    "iqr factor must be positive, got {factor}"
                )));
            }
            Ok(Box::new(IqrDetector::new(*factor)))
        }
        AnomalyMethod::IsolationForest {
            trees,
            sample_size,
            contamination,
            seed,
        } => {
            if *trees == 0 {
                return Err(MlError::invalid_input(
                    "isolation forest needs at least one tree",
                ));
            }
            if !contamination.is_finite() || *contamination <= 0.0 || *contamination > 0.5 {
                return Err(MlError::invalid_input(format!(
                    "contamination must be in (0, 0.5], got {contamination}"
                )));
            }
            Ok(Box::new(IsolationForest {
                trees: *trees,
                sample_size: *sample_size,
                contamination: *contamination,
                seed: *seed,
            }))
        }
        AnomalyMethod::Clustering {
            k,
            max_iter,
            threshold_sigmas,
            seed,
        } => Ok(Box::new(KMeansDetector {
            k: *k,
            max_iter: *max_iter,
            threshold_sigmas: *threshold_sigmas,
            seed: *seed,
        })),
        AnomalyMethod::Reconstruction { quantile, seed } => {
            if !(0.0..=100.0).contains(quantile) {
                return Err(MlError::invalid_input(format!(
                    "quantile must be in [0, 100], got {quantile}"
                )));
            }
            Ok(Box::new(ReconstructionDetector {
                quantile: *quantile,
                seed: *seed,
                ..ReconstructionDetector::default()
            }))
        }
    }
}
