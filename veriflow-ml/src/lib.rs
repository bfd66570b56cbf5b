//! # Veriflow ML
//!
//! This crate provides the validation collaborators plugged into the
//! veriflow harness: rule-based row checks (nulls, duplicate ids, ranges,
//! categories) and statistical outlier detectors (IQR, isolation forest,
//! clustering distance, reconstruction error). Everything implements the
//! `RuleCheck` and `OutlierDetector` traits from `veriflow-core`.

pub mod anomaly;
pub mod cluster;
pub mod detector;
pub mod error;
pub mod features;
pub mod forest;
pub mod reconstruct;
pub mod rules;

mod stats;

// Re-exports
pub use anomaly::IqrDetector;
pub use cluster::KMeansDetector;
pub use detector::{build_detector, AnomalyMethod};
pub use error::MlError;
pub use features::FeatureMatrix;
pub use forest::IsolationForest;
pub use reconstruct::ReconstructionDetector;
pub use rules::{mask_summary, RuleValidator};
