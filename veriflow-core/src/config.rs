//! Harness configuration: run policy plus per-stage validation thresholds.
//!
//! Uses `figment` for layered configuration: defaults -> config file ->
//! environment -> explicit overrides.

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// File name probed in the working directory when no explicit path is given.
pub const CONFIG_FILE: &str = "veriflow.toml";

/// Top-level harness configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Directory receiving the rolling JSON log files.
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// Stop the run at the first stage that fails validation.
    #[serde(default)]
    pub halt_on_critical: bool,
    /// Per-stage validation thresholds.
    #[serde(default)]
    pub validation: ValidationConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            halt_on_critical: false,
            validation: ValidationConfig::default(),
        }
    }
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

/// Per-stage validation settings.
///
/// A missing stage entry disables validation for that stage entirely; the
/// stage then always passes with no alerts and no metrics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extract: Option<ExtractConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<TransformConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load: Option<LoadConfig>,
}

impl ValidationConfig {
    /// Config with every stage present at its defaults.
    pub fn all_stages() -> Self {
        Self {
            extract: Some(ExtractConfig::default()),
            transform: Some(TransformConfig::default()),
            load: Some(LoadConfig::default()),
        }
    }
}

/// Extract-stage checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Minimum number of rows the extract must produce.
    #[serde(default = "default_min_records")]
    pub min_records: usize,
    /// Columns that must be present. Checked before `min_records`; a miss
    /// short-circuits the remaining extract checks.
    #[serde(default)]
    pub required_columns: Vec<String>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            min_records: default_min_records(),
            required_columns: Vec::new(),
        }
    }
}

/// Transform-stage checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Critical threshold on the anomaly rate, as a percentage of rows.
    #[serde(default = "default_max_anomaly_rate")]
    pub max_anomaly_rate: f64,
    /// Warning threshold on the anomaly rate. Half the critical threshold
    /// when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warn_anomaly_rate: Option<f64>,
    /// Columns handed to the outlier detector. All numeric columns when
    /// empty.
    #[serde(default)]
    pub numeric_columns: Vec<String>,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            max_anomaly_rate: default_max_anomaly_rate(),
            warn_anomaly_rate: None,
            numeric_columns: Vec::new(),
        }
    }
}

impl TransformConfig {
    /// Effective warning threshold.
    pub fn warn_threshold(&self) -> f64 {
        self.warn_anomaly_rate
            .unwrap_or(self.max_anomaly_rate / 2.0)
    }
}

/// Load-stage checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_min_records() -> usize {
    1
}

fn default_max_anomaly_rate() -> f64 {
    50.0
}

impl HarnessConfig {
    /// Load the layered configuration.
    ///
    /// Order: built-in defaults, then the TOML file (`path`, or
    /// `veriflow.toml` in the working directory when present), then
    /// `VERIFLOW_`-prefixed environment variables with `__` separating
    /// nesting levels (`VERIFLOW_VALIDATION__EXTRACT__MIN_RECORDS=10`),
    /// then explicit overrides.
    pub fn load(
        path: Option<&Path>,
        overrides: Option<&HarnessConfig>,
    ) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(HarnessConfig::default()));

        match path {
            Some(file) => figment = figment.merge(Toml::file(file)),
            None => {
                if Path::new(CONFIG_FILE).exists() {
                    figment = figment.merge(Toml::file(CONFIG_FILE));
                }
            }
        }

        figment = figment.merge(Env::prefixed("VERIFLOW_").split("__"));

        if let Some(overrides) = overrides {
            figment = figment.merge(Serialized::defaults(overrides));
        }

        figment.extract().map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })
    }
}
