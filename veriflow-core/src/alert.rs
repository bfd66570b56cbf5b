//! Alerts raised by validation checks and hooks.

use serde::{Deserialize, Serialize};

use crate::stage::Stage;

/// Severity of an alert, ordered least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// A single finding raised while running or validating a stage.
///
/// `kind` is a stable machine-readable tag (`"min_records"`,
/// `"anomaly_rate"`, ...); `message` is for humans. Alerts are immutable
/// once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub severity: Severity,
}

impl Alert {
    pub fn new(
        kind: impl Into<String>,
        message: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            severity,
        }
    }

    pub fn info(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(kind, message, Severity::Info)
    }

    pub fn warning(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(kind, message, Severity::Warning)
    }

    pub fn critical(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(kind, message, Severity::Critical)
    }

    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }
}

/// An alert tagged with the stage that raised it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub stage: Stage,
    pub alert: Alert,
}

/// Append-only log of every alert raised during a run, in insertion order.
///
/// Cleared at the start of each run by the orchestrator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertLog {
    entries: Vec<AlertRecord>,
}

impl AlertLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a batch of alerts under the stage that produced them.
    pub fn record(&mut self, stage: Stage, alerts: &[Alert]) {
        self.entries.extend(alerts.iter().map(|alert| AlertRecord {
            stage,
            alert: alert.clone(),
        }));
    }

    pub fn entries(&self) -> &[AlertRecord] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of logged alerts at the given severity.
    pub fn count_severity(&self, severity: Severity) -> usize {
        self.entries
            .iter()
            .filter(|record| record.alert.severity == severity)
            .count()
    }

    pub fn critical_count(&self) -> usize {
        self.count_severity(Severity::Critical)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
