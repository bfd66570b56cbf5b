//! Hook registration and in-order dispatch.
//!
//! Callers register plain functions against one of the six pipeline hook
//! points. During a run the orchestrator dispatches each point's hooks in
//! registration order, threading the data value through them and
//! collecting the alerts they raise.

use std::collections::HashMap;

use tracing::debug;

use crate::alert::Alert;
use crate::context::StageContext;
use crate::error::{Result, VeriflowError};
use crate::frame::Frame;
use crate::stage::Stage;

/// Signature every hook implements: take the stage data, return the
/// (possibly replaced) data plus any alerts to attach to the stage.
pub type HookFn =
    Box<dyn Fn(Frame, &mut StageContext) -> anyhow::Result<(Frame, Vec<Alert>)> + Send + Sync>;

/// A registered hook: a label for logs plus the callable.
pub struct RegisteredHook {
    pub name: String,
    func: HookFn,
}

/// Registry of all hooks, keyed by the closed set of stages.
///
/// Every stage key exists from construction; registration only appends.
/// The registry persists across runs of one orchestrator instance.
pub struct HookRegistry {
    hooks: HashMap<Stage, Vec<RegisteredHook>>,
}

impl HookRegistry {
    /// Create a registry with every hook point present and empty.
    pub fn new() -> Self {
        let mut hooks = HashMap::with_capacity(Stage::ALL.len());
        for stage in Stage::ALL {
            hooks.insert(stage, Vec::new());
        }
        Self { hooks }
    }

    /// Register a hook by stage name.
    ///
    /// Unknown stage names are rejected with a configuration error and
    /// register nothing.
    pub fn register<F>(&mut self, stage: &str, name: &str, hook: F) -> Result<()>
    where
        F: Fn(Frame, &mut StageContext) -> anyhow::Result<(Frame, Vec<Alert>)>
            + Send
            + Sync
            + 'static,
    {
        let stage: Stage = stage.parse().map_err(VeriflowError::Config)?;
        self.bind(stage, name, hook);
        Ok(())
    }

    /// Typed registration; infallible since the stage is already closed.
    pub fn bind<F>(&mut self, stage: Stage, name: &str, hook: F)
    where
        F: Fn(Frame, &mut StageContext) -> anyhow::Result<(Frame, Vec<Alert>)>
            + Send
            + Sync
            + 'static,
    {
        self.hooks.entry(stage).or_default().push(RegisteredHook {
            name: name.to_string(),
            func: Box::new(hook),
        });
    }

    /// Run the stage's hooks in registration order, threading the frame.
    ///
    /// Alerts from every hook are collected in order. A hook error aborts
    /// dispatch and surfaces as a collaborator failure for the stage.
    pub fn dispatch(
        &self,
        stage: Stage,
        frame: Frame,
        ctx: &mut StageContext,
    ) -> Result<(Frame, Vec<Alert>)> {
        let mut data = frame;
        let mut alerts = Vec::new();
        let Some(hooks) = self.hooks.get(&stage) else {
            return Ok((data, alerts));
        };

        for hook in hooks {
            debug!(stage = %stage, hook = %hook.name, "dispatching hook");
            let (next, mut emitted) =
                (hook.func)(data, ctx).map_err(|source| VeriflowError::Collaborator {
                    stage,
                    source,
                })?;
            data = next;
            alerts.append(&mut emitted);
        }
        Ok((data, alerts))
    }

    /// Number of hooks registered at one stage.
    pub fn count(&self, stage: Stage) -> usize {
        self.hooks.get(&stage).map(Vec::len).unwrap_or(0)
    }

    /// Total number of registered hooks.
    pub fn total(&self) -> usize {
        self.hooks.values().map(Vec::len).sum()
    }

    /// Names of the hooks registered at one stage, in dispatch order.
    pub fn names(&self, stage: Stage) -> Vec<&str> {
        self.hooks
            .get(&stage)
            .map(|hooks| hooks.iter().map(|h| h.name.as_str()).collect())
            .unwrap_or_default()
    }

    /// Number of hook points (always the full closed set).
    pub fn stage_count(&self) -> usize {
        self.hooks.len()
    }
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut counts: Vec<(Stage, usize)> = self
            .hooks
            .iter()
            .map(|(stage, hooks)| (*stage, hooks.len()))
            .collect();
        counts.sort_by_key(|(stage, _)| *stage);
        f.debug_struct("HookRegistry").field("hooks", &counts).finish()
    }
}
