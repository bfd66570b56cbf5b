//! Stage results and run-level metric aggregation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::alert::{Alert, Severity};
use crate::stage::Stage;

/// Outcome of one executed stage: the validation verdict plus hook alerts
/// and timing. Keyed by stage in the orchestrator's result map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    /// False iff the stage's validation emitted a critical alert.
    pub passed: bool,
    /// Wall-clock time for hooks, the stage function, and validation.
    pub duration_secs: f64,
    pub metrics: BTreeMap<String, f64>,
    /// Hook alerts followed by validation alerts, in emission order.
    pub alerts: Vec<Alert>,
}

impl StageResult {
    pub fn critical_count(&self) -> usize {
        self.count_severity(Severity::Critical)
    }

    pub fn warning_count(&self) -> usize {
        self.count_severity(Severity::Warning)
    }

    fn count_severity(&self, severity: Severity) -> usize {
        self.alerts
            .iter()
            .filter(|alert| alert.severity == severity)
            .count()
    }
}

/// Run-level aggregate folded from the recorded stage results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    pub total_alerts: usize,
    pub critical_alerts: usize,
    pub warning_alerts: usize,
    pub total_duration_secs: f64,
    pub stages_run: usize,
    pub stages_passed: usize,
}

/// Fold the recorded stage results into run totals. Pure over its inputs;
/// `total_duration_secs` is the caller-measured run time, not a sum of
/// stage durations.
pub fn summarize(
    stage_results: &BTreeMap<Stage, StageResult>,
    total_duration_secs: f64,
) -> RunMetrics {
    let mut metrics = RunMetrics {
        total_duration_secs,
        stages_run: stage_results.len(),
        ..RunMetrics::default()
    };
    for result in stage_results.values() {
        metrics.total_alerts += result.alerts.len();
        metrics.critical_alerts += result.critical_count();
        metrics.warning_alerts += result.warning_count();
        if result.passed {
            metrics.stages_passed += 1;
        }
    }
    metrics
}
