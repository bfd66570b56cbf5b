//! Halt decisions for critical stage failures.

use crate::config::HarnessConfig;
use crate::metrics::StageResult;

/// Decides whether a just-recorded stage result must stop the run.
///
/// The orchestrator consults this after recording each result; a true
/// answer moves the run state machine to `Halted`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HaltController;

impl HaltController {
    pub fn new() -> Self {
        Self
    }

    /// True iff `halt_on_critical` is set and the stage failed validation.
    pub fn should_halt(&self, config: &HarnessConfig, result: &StageResult) -> bool {
        config.halt_on_critical && !result.passed
    }
}
