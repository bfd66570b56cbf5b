//! Per-stage validation checks and the collaborator seams.
//!
//! Extract and load checks are self-contained threshold comparisons.
//! Transform checks delegate row flagging to the `RuleCheck` and
//! `OutlierDetector` collaborators and grade the combined anomaly rate.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::alert::Alert;
use crate::context::StageContext;
use crate::error::{Result, VeriflowError};
use crate::frame::{Frame, LoadReceipt};
use crate::stage::Stage;

/// Per-row rule flags produced by a rule collaborator.
///
/// All vectors are row-aligned with the frame that was validated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleMask {
    pub null_or_missing: Vec<bool>,
    pub duplicate_id: Vec<bool>,
    pub range_violation: Vec<bool>,
    pub invalid_category: Vec<bool>,
}

impl RuleMask {
    /// All-false mask covering `rows` rows.
    pub fn with_rows(rows: usize) -> Self {
        Self {
            null_or_missing: vec![false; rows],
            duplicate_id: vec![false; rows],
            range_violation: vec![false; rows],
            invalid_category: vec![false; rows],
        }
    }

    pub fn len(&self) -> usize {
        self.null_or_missing.len()
    }

    pub fn is_empty(&self) -> bool {
        self.null_or_missing.is_empty()
    }

    /// True when every rule vector holds exactly `rows` flags.
    pub fn covers(&self, rows: usize) -> bool {
        self.null_or_missing.len() == rows
            && self.duplicate_id.len() == rows
            && self.range_violation.len() == rows
            && self.invalid_category.len() == rows
    }

    /// Row-wise OR across every rule flag.
    pub fn anomaly(&self) -> Vec<bool> {
        (0..self.len())
            .map(|i| {
                self.null_or_missing[i]
                    || self.duplicate_id[i]
                    || self.range_violation[i]
                    || self.invalid_category[i]
            })
            .collect()
    }

    /// Number of rows flagged by at least one rule.
    pub fn flagged_count(&self) -> usize {
        self.anomaly().iter().filter(|flag| **flag).count()
    }
}

/// Rule-based row validation, supplied by a collaborator crate or a test
/// double.
pub trait RuleCheck: Send + Sync {
    fn validate(&self, frame: &Frame) -> anyhow::Result<RuleMask>;

    fn name(&self) -> &str {
        "rules"
    }
}

/// Statistical outlier detection over numeric columns. Returns one flag
/// per row.
pub trait OutlierDetector: Send + Sync {
    fn detect(&self, frame: &Frame, columns: &[String]) -> anyhow::Result<Vec<bool>>;

    fn name(&self) -> &str {
        "outliers"
    }
}

/// Outcome of validating one stage.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    /// False iff the checks emitted at least one critical alert.
    pub passed: bool,
    pub metrics: BTreeMap<String, f64>,
    pub alerts: Vec<Alert>,
}

impl Verdict {
    /// The verdict for a disabled or absent check set.
    pub fn pass() -> Self {
        Self {
            passed: true,
            metrics: BTreeMap::new(),
            alerts: Vec::new(),
        }
    }

    /// Build a verdict from check output; `passed` is derived from the
    /// alerts so the two can never disagree.
    pub fn from_checks(metrics: BTreeMap<String, f64>, alerts: Vec<Alert>) -> Self {
        let passed = !alerts.iter().any(Alert::is_critical);
        Self {
            passed,
            metrics,
            alerts,
        }
    }
}

/// Runs the configured checks for each pipeline stage.
///
/// Rule and outlier collaborators are optional; without them the transform
/// check records zero anomalies.
#[derive(Default)]
pub struct StageValidator {
    rules: Option<Arc<dyn RuleCheck>>,
    outliers: Option<Arc<dyn OutlierDetector>>,
}

impl StageValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(mut self, rules: Arc<dyn RuleCheck>) -> Self {
        self.rules = Some(rules);
        self
    }

    pub fn with_outliers(mut self, outliers: Arc<dyn OutlierDetector>) -> Self {
        self.outliers = Some(outliers);
        self
    }

    pub fn has_collaborators(&self) -> bool {
        self.rules.is_some() || self.outliers.is_some()
    }

    /// Extract checks: record count, then required columns, then the
    /// minimum-record threshold. A missing column short-circuits the rest.
    pub fn validate_extract(&self, frame: &Frame, ctx: &StageContext) -> Verdict {
        let Some(cfg) = ctx.config.validation.extract.as_ref().filter(|c| c.enabled) else {
            return Verdict::pass();
        };

        let mut metrics = BTreeMap::new();
        let mut alerts = Vec::new();
        let record_count = frame.row_count();
        metrics.insert("record_count".to_string(), record_count as f64);

        let missing: Vec<String> = cfg
            .required_columns
            .iter()
            .filter(|column| !frame.has_column(column))
            .cloned()
            .collect();
        if !missing.is_empty() {
            alerts.push(Alert::critical(
                "missing_columns",
                format!("missing required columns: {}", missing.join(", ")),
            ));
            return Verdict::from_checks(metrics, alerts);
        }

        if record_count < cfg.min_records {
            alerts.push(Alert::critical(
                "min_records",
                format!(
                    "extracted {record_count} records, expected at least {}",
                    cfg.min_records
                ),
            ));
        }
        Verdict::from_checks(metrics, alerts)
    }

    /// Transform checks: run the collaborators, combine their row masks
    /// with a logical OR, and grade the anomaly rate (a percentage of
    /// rows) against the warning and critical thresholds.
    pub fn validate_transform(&self, frame: &Frame, ctx: &StageContext) -> Result<Verdict> {
        let Some(cfg) = ctx
            .config
            .validation
            .transform
            .as_ref()
            .filter(|c| c.enabled)
        else {
            return Ok(Verdict::pass());
        };

        let total = frame.row_count();
        let mut metrics = BTreeMap::new();
        let mut alerts = Vec::new();
        metrics.insert("total_records".to_string(), total as f64);

        let rule_anomalies = match &self.rules {
            Some(rules) => {
                let mask = rules.validate(frame).map_err(collaborator)?;
                if !mask.covers(total) {
                    let lengths = [
                        mask.null_or_missing.len(),
                        mask.duplicate_id.len(),
                        mask.range_violation.len(),
                        mask.invalid_category.len(),
                    ];
                    return Err(collaborator(anyhow::anyhow!(
                        "rule mask vectors cover {lengths:?} rows, frame has {total}"
                    )));
                }
                mask.anomaly()
            }
            None => vec![false; total],
        };

        let stat_anomalies = match &self.outliers {
            Some(detector) => {
                let columns = if cfg.numeric_columns.is_empty() {
                    frame.numeric_columns()
                } else {
                    cfg.numeric_columns.clone()
                };
                let mask = detector.detect(frame, &columns).map_err(collaborator)?;
                if mask.len() != total {
                    return Err(collaborator(anyhow::anyhow!(
                        "outlier mask covers {} rows, frame has {total}",
                        mask.len()
                    )));
                }
                mask
            }
            None => vec![false; total],
        };

        let by_rules = rule_anomalies.iter().filter(|flag| **flag).count();
        let by_stats = stat_anomalies.iter().filter(|flag| **flag).count();
        let combined = rule_anomalies
            .iter()
            .zip(&stat_anomalies)
            .filter(|(rule, stat)| **rule || **stat)
            .count();

        let anomaly_rate = if total == 0 {
            0.0
        } else {
            combined as f64 / total as f64 * 100.0
        };

        metrics.insert("anomalies_by_rules".to_string(), by_rules as f64);
        metrics.insert("anomalies_by_stats".to_string(), by_stats as f64);
        metrics.insert("total_anomalies".to_string(), combined as f64);
        metrics.insert("anomaly_rate".to_string(), anomaly_rate);

        if anomaly_rate > cfg.max_anomaly_rate {
            alerts.push(Alert::critical(
                "anomaly_rate",
                format!(
                    "anomaly rate {anomaly_rate:.1}% exceeds maximum {:.1}%",
                    cfg.max_anomaly_rate
                ),
            ));
        } else if anomaly_rate > cfg.warn_threshold() {
            alerts.push(Alert::warning(
                "anomaly_rate",
                format!(
                    "anomaly rate {anomaly_rate:.1}% exceeds warning threshold {:.1}%",
                    cfg.warn_threshold()
                ),
            ));
        }

        Ok(Verdict::from_checks(metrics, alerts))
    }

    /// Load checks: the declared destination must exist, and writing zero
    /// rows is worth a warning.
    pub fn validate_load(&self, receipt: &LoadReceipt, ctx: &StageContext) -> Verdict {
        let Some(_cfg) = ctx.config.validation.load.as_ref().filter(|c| c.enabled) else {
            return Verdict::pass();
        };

        let mut metrics = BTreeMap::new();
        let mut alerts = Vec::new();
        metrics.insert("rows_written".to_string(), receipt.rows_written as f64);

        if !receipt.destination.exists() {
            alerts.push(Alert::critical(
                "destination_missing",
                format!(
                    "load destination {} does not exist",
                    receipt.destination.display()
                ),
            ));
        } else if receipt.rows_written == 0 {
            alerts.push(Alert::warning(
                "empty_load",
                "load wrote zero rows to the destination",
            ));
        }
        Verdict::from_checks(metrics, alerts)
    }
}

fn collaborator(source: anyhow::Error) -> VeriflowError {
    VeriflowError::Collaborator {
        stage: Stage::Transform,
        source,
    }
}
