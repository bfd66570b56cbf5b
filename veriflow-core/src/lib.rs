//! # Veriflow Core
//!
//! Core library for the Veriflow ETL test harness.
//! Provides the run orchestrator, hook registry, stage validation,
//! alerting and metrics, configuration, and report rendering.

pub mod alert;
pub mod config;
pub mod context;
pub mod error;
pub mod frame;
pub mod halt;
pub mod hooks;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod report;
pub mod stage;
pub mod validator;

// Re-export commonly used types at the crate root.
pub use alert::{Alert, AlertLog, AlertRecord, Severity};
pub use config::{ExtractConfig, HarnessConfig, LoadConfig, TransformConfig, ValidationConfig};
pub use context::StageContext;
pub use error::{ConfigError, ReportError, Result, VeriflowError};
pub use frame::{Frame, LoadReceipt};
pub use halt::HaltController;
pub use hooks::HookRegistry;
pub use metrics::{RunMetrics, StageResult, summarize};
pub use orchestrator::{Orchestrator, RunReport};
pub use report::ReportGenerator;
pub use stage::{RunState, Stage};
pub use validator::{OutlierDetector, RuleCheck, RuleMask, StageValidator, Verdict};
