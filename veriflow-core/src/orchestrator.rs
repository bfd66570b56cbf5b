//! The run driver.
//!
//! `Orchestrator::run` threads a frame through the extract, transform, and
//! load stage functions, dispatching hooks at each boundary, validating
//! every stage outcome, and stopping early when the halt controller says a
//! critical failure must end the run.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::alert::{Alert, AlertLog, Severity};
use crate::config::HarnessConfig;
use crate::context::StageContext;
use crate::error::{Result, VeriflowError};
use crate::frame::{Frame, LoadReceipt};
use crate::halt::HaltController;
use crate::hooks::HookRegistry;
use crate::metrics::{RunMetrics, StageResult, summarize};
use crate::stage::{RunState, Stage};
use crate::validator::{StageValidator, Verdict};

/// Immutable record of one run, complete or halted partway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// True iff every executed stage passed validation.
    pub success: bool,
    pub total_duration_secs: f64,
    pub stage_results: BTreeMap<Stage, StageResult>,
    pub metrics: RunMetrics,
}

/// Drives one ETL run at a time. The hook registry persists across runs;
/// the alert log, result map, and state machine reset at the start of each.
pub struct Orchestrator {
    config: Arc<HarnessConfig>,
    registry: HookRegistry,
    validator: StageValidator,
    halt: HaltController,
    alert_log: AlertLog,
    results: BTreeMap<Stage, StageResult>,
    state: RunState,
}

impl Orchestrator {
    pub fn new(config: HarnessConfig) -> Self {
        Self {
            config: Arc::new(config),
            registry: HookRegistry::new(),
            validator: StageValidator::new(),
            halt: HaltController::new(),
            alert_log: AlertLog::new(),
            results: BTreeMap::new(),
            state: RunState::Init,
        }
    }

    /// Replace the default (collaborator-free) validator.
    pub fn with_validator(mut self, validator: StageValidator) -> Self {
        self.validator = validator;
        self
    }

    /// Register a hook under a stage name such as `"pre_extract"`.
    pub fn register_hook<F>(&mut self, stage: &str, name: &str, hook: F) -> Result<()>
    where
        F: Fn(Frame, &mut StageContext) -> anyhow::Result<(Frame, Vec<Alert>)>
            + Send
            + Sync
            + 'static,
    {
        self.registry.register(stage, name, hook)
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn registry(&self) -> &HookRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut HookRegistry {
        &mut self.registry
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn stage_results(&self) -> &BTreeMap<Stage, StageResult> {
        &self.results
    }

    pub fn alert_log(&self) -> &AlertLog {
        &self.alert_log
    }

    /// Run the pipeline once.
    ///
    /// A validation failure with `halt_on_critical` set surfaces as
    /// [`VeriflowError::Halted`]; a stage function or hook failure surfaces
    /// as [`VeriflowError::Collaborator`]. Stage results recorded before
    /// the stop remain readable through the accessors either way.
    pub fn run<E, T, L>(&mut self, extract_fn: E, transform_fn: T, load_fn: L) -> Result<RunReport>
    where
        E: FnOnce() -> anyhow::Result<Frame>,
        T: FnOnce(Frame) -> anyhow::Result<Frame>,
        L: FnOnce(Frame) -> anyhow::Result<LoadReceipt>,
    {
        self.reset();
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let run_started = Instant::now();
        info!(
            run_id = %run_id,
            halt_on_critical = self.config.halt_on_critical,
            "starting run"
        );

        // Extract. Pre-hooks see an empty frame; their output is not
        // threaded because the extract function takes no input.
        self.transition(RunState::Extracting)?;
        let started = Instant::now();
        let mut ctx = self.context(Stage::PreExtract);
        let (_, mut hook_alerts) =
            self.registry
                .dispatch(Stage::PreExtract, Frame::empty(), &mut ctx)?;
        let extracted = extract_fn().map_err(|source| stage_failure(Stage::Extract, source))?;
        debug!(
            rows = extracted.row_count(),
            columns = extracted.column_count(),
            "extract function returned"
        );
        ctx.stage = Stage::Extract;
        let (extracted, post_alerts) = self.registry.dispatch(Stage::Extract, extracted, &mut ctx)?;
        hook_alerts.extend(post_alerts);
        let verdict = self.validator.validate_extract(&extracted, &ctx);
        self.finish_stage(Stage::Extract, started, hook_alerts, verdict)?;

        // Transform.
        self.transition(RunState::Transforming)?;
        let started = Instant::now();
        let mut ctx = self.context(Stage::PreTransform);
        let (frame, mut hook_alerts) =
            self.registry
                .dispatch(Stage::PreTransform, extracted, &mut ctx)?;
        let transformed =
            transform_fn(frame).map_err(|source| stage_failure(Stage::Transform, source))?;
        ctx.stage = Stage::Transform;
        let (transformed, post_alerts) =
            self.registry
                .dispatch(Stage::Transform, transformed, &mut ctx)?;
        hook_alerts.extend(post_alerts);
        let verdict = self.validator.validate_transform(&transformed, &ctx)?;
        self.finish_stage(Stage::Transform, started, hook_alerts, verdict)?;

        // Load. Post-hooks observe the frame that was handed to the load
        // function; the receipt goes to the validator.
        self.transition(RunState::Loading)?;
        let started = Instant::now();
        let mut ctx = self.context(Stage::PreLoad);
        let (frame, mut hook_alerts) =
            self.registry.dispatch(Stage::PreLoad, transformed, &mut ctx)?;
        let receipt =
            load_fn(frame.clone()).map_err(|source| stage_failure(Stage::Load, source))?;
        debug!(
            destination = %receipt.destination.display(),
            rows_written = receipt.rows_written,
            "load function returned"
        );
        ctx.stage = Stage::Load;
        let (_, post_alerts) = self.registry.dispatch(Stage::Load, frame, &mut ctx)?;
        hook_alerts.extend(post_alerts);
        let verdict = self.validator.validate_load(&receipt, &ctx);
        self.finish_stage(Stage::Load, started, hook_alerts, verdict)?;

        self.transition(RunState::Complete)?;
        let total_duration_secs = run_started.elapsed().as_secs_f64();
        let success = self.results.values().all(|result| result.passed);
        let metrics = summarize(&self.results, total_duration_secs);
        info!(run_id = %run_id, success, total_duration_secs, "run complete");

        Ok(RunReport {
            run_id,
            started_at,
            success,
            total_duration_secs,
            stage_results: self.results.clone(),
            metrics,
        })
    }

    fn reset(&mut self) {
        self.alert_log.clear();
        self.results.clear();
        self.state = RunState::Init;
    }

    fn context(&self, stage: Stage) -> StageContext {
        StageContext::new(stage, Arc::clone(&self.config))
    }

    fn transition(&mut self, next: RunState) -> Result<()> {
        self.state = self.state.transition(next)?;
        debug!(state = %self.state, "run state advanced");
        Ok(())
    }

    /// Merge hook alerts with the verdict, record the stage result, and
    /// consult the halt controller.
    fn finish_stage(
        &mut self,
        stage: Stage,
        started: Instant,
        hook_alerts: Vec<Alert>,
        verdict: Verdict,
    ) -> Result<()> {
        let mut alerts = hook_alerts;
        alerts.extend(verdict.alerts);
        let result = StageResult {
            passed: verdict.passed,
            duration_secs: started.elapsed().as_secs_f64(),
            metrics: verdict.metrics,
            alerts,
        };

        for alert in &result.alerts {
            match alert.severity {
                Severity::Critical => {
                    error!(stage = %stage, kind = %alert.kind, "{}", alert.message);
                }
                Severity::Warning => {
                    warn!(stage = %stage, kind = %alert.kind, "{}", alert.message);
                }
                Severity::Info => {
                    info!(stage = %stage, kind = %alert.kind, "{}", alert.message);
                }
            }
        }
        self.alert_log.record(stage, &result.alerts);
        info!(
            stage = %stage,
            passed = result.passed,
            duration_secs = result.duration_secs,
            "stage complete"
        );
        self.results.insert(stage, result.clone());

        if self.halt.should_halt(&self.config, &result) {
            self.state = self.state.transition(RunState::Halted)?;
            error!(stage = %stage, "run halted after critical validation failure");
            return Err(VeriflowError::Halted {
                stage,
                result: Box::new(result),
            });
        }
        Ok(())
    }
}

fn stage_failure(stage: Stage, source: anyhow::Error) -> VeriflowError {
    VeriflowError::Collaborator { stage, source }
}
