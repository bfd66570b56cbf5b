//! Environment layer of the configuration stack.
//!
//! Kept alone in its own binary: the test mutates the process
//! environment, and sibling tests running in parallel would race it.

use std::path::PathBuf;

use veriflow_core::HarnessConfig;

#[test]
fn test_env_vars_override_file_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("veriflow.toml");
    std::fs::write(
        &path,
        r#"
halt_on_critical = false

[validation.transform]
max_anomaly_rate = 40.0
"#,
    )
    .unwrap();

    unsafe {
        std::env::set_var("VERIFLOW_HALT_ON_CRITICAL", "true");
        std::env::set_var("VERIFLOW_VALIDATION__TRANSFORM__MAX_ANOMALY_RATE", "12.5");
    }

    let config = HarnessConfig::load(Some(&path), None).unwrap();
    assert!(config.halt_on_critical);
    let transform = config.validation.transform.expect("transform section");
    assert_eq!(transform.max_anomaly_rate, 12.5);
    assert_eq!(transform.warn_threshold(), 6.25);
    assert_eq!(config.log_dir, PathBuf::from("logs"));
    assert!(config.validation.extract.is_none());
    assert!(config.validation.load.is_none());

    // Explicit overrides outrank the environment; sections the overrides
    // leave unset still merge through from the lower layers.
    let shadowed = HarnessConfig::load(Some(&path), Some(&HarnessConfig::default())).unwrap();
    assert!(!shadowed.halt_on_critical);
    let transform = shadowed.validation.transform.expect("transform section");
    assert_eq!(transform.max_anomaly_rate, 12.5);

    unsafe {
        std::env::remove_var("VERIFLOW_HALT_ON_CRITICAL");
        std::env::remove_var("VERIFLOW_VALIDATION__TRANSFORM__MAX_ANOMALY_RATE");
    }
}
