//! Per-stage execution context shared by hooks and the validator.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::config::HarnessConfig;
use crate::stage::Stage;

/// Context handed to every hook and validation call within one stage pass.
///
/// The orchestrator creates a fresh context per pipeline stage, so scratch
/// entries written by a pre-hook are visible to later hooks and the
/// validator of that same stage, then dropped.
#[derive(Debug, Clone)]
pub struct StageContext {
    /// The pipeline stage currently executing.
    pub stage: Stage,
    /// The run configuration, shared read-only.
    pub config: Arc<HarnessConfig>,
    scratch: HashMap<String, Value>,
}

impl StageContext {
    pub fn new(stage: Stage, config: Arc<HarnessConfig>) -> Self {
        Self {
            stage,
            config,
            scratch: HashMap::new(),
        }
    }

    /// Stash a value for later hooks or the validator of this stage.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.scratch.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.scratch.get(key)
    }

    pub fn scratch(&self) -> &HashMap<String, Value> {
        &self.scratch
    }
}
