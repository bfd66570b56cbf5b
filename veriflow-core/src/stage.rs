//! Stage identifiers and the run-level state machine.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, VeriflowError};

/// The six hook points of an ETL run, in dispatch order.
///
/// `PreExtract`, `PreTransform`, and `PreLoad` fire before their stage
/// function; `Extract`, `Transform`, and `Load` fire on its output. The
/// derived ordering follows the pipeline, so keyed collections iterate in
/// execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    PreExtract,
    Extract,
    PreTransform,
    Transform,
    PreLoad,
    Load,
}

impl Stage {
    /// Every hook point, in dispatch order.
    pub const ALL: [Stage; 6] = [
        Stage::PreExtract,
        Stage::Extract,
        Stage::PreTransform,
        Stage::Transform,
        Stage::PreLoad,
        Stage::Load,
    ];

    /// The three pipeline stages that produce a `StageResult`.
    pub const PIPELINE: [Stage; 3] = [Stage::Extract, Stage::Transform, Stage::Load];

    /// Canonical snake_case name, as used in configuration and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::PreExtract => "pre_extract",
            Stage::Extract => "extract",
            Stage::PreTransform => "pre_transform",
            Stage::Transform => "transform",
            Stage::PreLoad => "pre_load",
            Stage::Load => "load",
        }
    }

    /// The pre-hook point paired with a pipeline stage, if any.
    pub fn pre(&self) -> Option<Stage> {
        match self {
            Stage::Extract => Some(Stage::PreExtract),
            Stage::Transform => Some(Stage::PreTransform),
            Stage::Load => Some(Stage::PreLoad),
            _ => None,
        }
    }

    /// Whether this is one of the pre-stage hook points.
    pub fn is_pre(&self) -> bool {
        matches!(
            self,
            Stage::PreExtract | Stage::PreTransform | Stage::PreLoad
        )
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Stage {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pre_extract" => Ok(Stage::PreExtract),
            "extract" => Ok(Stage::Extract),
            "pre_transform" => Ok(Stage::PreTransform),
            "transform" => Ok(Stage::Transform),
            "pre_load" => Ok(Stage::PreLoad),
            "load" => Ok(Stage::Load),
            other => Err(ConfigError::UnknownStage {
                name: other.to_string(),
            }),
        }
    }
}

/// Lifecycle of a single orchestrated run.
///
/// `Halted` absorbs: once entered, no further transition is legal. Resets
/// back to `Init` happen by assignment at the start of a run, not through
/// `transition`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Init,
    Extracting,
    Transforming,
    Loading,
    Complete,
    Halted,
}

impl RunState {
    /// Whether moving to `next` is a legal transition.
    pub fn can_transition(self, next: RunState) -> bool {
        matches!(
            (self, next),
            (RunState::Init, RunState::Extracting)
                | (RunState::Extracting, RunState::Transforming)
                | (RunState::Transforming, RunState::Loading)
                | (RunState::Loading, RunState::Complete)
                | (RunState::Extracting, RunState::Halted)
                | (RunState::Transforming, RunState::Halted)
                | (RunState::Loading, RunState::Halted)
        )
    }

    /// Attempt the transition, producing a typed error when illegal.
    pub fn transition(self, next: RunState) -> Result<RunState, VeriflowError> {
        if self.can_transition(next) {
            Ok(next)
        } else {
            Err(VeriflowError::InvalidTransition {
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }

    /// Whether the run has finished, successfully or not.
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Complete | RunState::Halted)
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::Init => write!(f, "init"),
            RunState::Extracting => write!(f, "extracting"),
            RunState::Transforming => write!(f, "transforming"),
            RunState::Loading => write!(f, "loading"),
            RunState::Complete => write!(f, "complete"),
            RunState::Halted => write!(f, "halted"),
        }
    }
}
