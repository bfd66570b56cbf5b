//! End-to-end runs wiring the real collaborators through the orchestrator:
//! CSV in, validated stages, CSV out.

use std::sync::Arc;

use serde_json::Value;
use veriflow_core::{
    Alert, ExtractConfig, Frame, HarnessConfig, LoadConfig, LoadReceipt, Orchestrator, Stage,
    StageContext, StageValidator, TransformConfig, ValidationConfig, VeriflowError,
};
use veriflow_ml::{build_detector, AnomalyMethod, IqrDetector, RuleValidator};

const CLEAN_CSV: &str = "\
id,transaction_amount,account_balance,account_type
1,100,5000,Retail
2,105,5100,Corporate
3,98,4900,Retail
4,102,5300,Investment
5,106,5050,Retail
6,95,5200,Corporate
7,101,4950,Retail
8,99,5150,Investment
9,104,5250,Corporate
10,97,5000,Retail
11,103,5100,Corporate
12,100,4900,Retail
";

// Rows 4, 6, and 9 are missing their balance: a 30% anomaly rate when the
// balance column is required.
const DIRTY_CSV: &str = "\
id,transaction_amount,account_balance,account_type
1,100,5000,Retail
2,101,5100,Retail
3,99,4900,Corporate
4,102,,Retail
5,98,5050,Investment
6,103,,Corporate
7,97,5150,Retail
8,104,4950,Corporate
9,96,,Investment
10,105,5200,Retail
";

fn harness_config(halt_on_critical: bool, max_anomaly_rate: f64) -> HarnessConfig {
    HarnessConfig {
        halt_on_critical,
        validation: ValidationConfig {
            extract: Some(ExtractConfig {
                required_columns: vec!["id".into(), "transaction_amount".into()],
                ..ExtractConfig::default()
            }),
            transform: Some(TransformConfig {
                max_anomaly_rate,
                numeric_columns: vec![
                    "transaction_amount".into(),
                    "account_balance".into(),
                ],
                ..TransformConfig::default()
            }),
            load: Some(LoadConfig::default()),
        },
        ..HarnessConfig::default()
    }
}

fn collaborators() -> StageValidator {
    StageValidator::new()
        .with_rules(Arc::new(
            RuleValidator::new()
                .require_columns(["id", "transaction_amount", "account_balance"])
                .allow_range("transaction_amount", 0.0, 15_000.0)
                .allow_categories("account_type", ["Retail", "Corporate", "Investment"]),
        ))
        .with_outliers(Arc::new(IqrDetector::default()))
}

#[test]
fn test_clean_batch_passes_every_stage() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("input.csv");
    std::fs::write(&source, CLEAN_CSV).unwrap();
    let dest = dir.path().join("output.csv");

    let mut orchestrator =
        Orchestrator::new(harness_config(false, 50.0)).with_validator(collaborators());
    let load_dest = dest.clone();
    let report = orchestrator
        .run(
            move || Ok(Frame::from_csv_path(&source)?),
            Ok,
            move |frame: Frame| {
                frame.write_csv(&load_dest)?;
                Ok(LoadReceipt::new(load_dest, frame.row_count()))
            },
        )
        .unwrap();

    assert!(report.success);
    assert_eq!(report.stage_results.len(), 3);
    assert!(report.stage_results.values().all(|r| r.passed));
    assert_eq!(report.metrics.total_alerts, 0);
    assert_eq!(report.metrics.stages_passed, 3);

    let transform = &report.stage_results[&Stage::Transform];
    assert_eq!(transform.metrics["total_records"], 12.0);
    assert_eq!(transform.metrics["total_anomalies"], 0.0);

    let load = &report.stage_results[&Stage::Load];
    assert_eq!(load.metrics["rows_written"], 12.0);
    assert!(dest.exists());
}

#[test]
fn test_anomalous_batch_halts_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("output.csv");

    let mut orchestrator =
        Orchestrator::new(harness_config(true, 20.0)).with_validator(collaborators());
    let err = orchestrator
        .run(
            || Ok(Frame::from_csv_str(DIRTY_CSV)),
            Ok,
            move |frame: Frame| {
                frame.write_csv(&dest)?;
                Ok(LoadReceipt::new(dest, frame.row_count()))
            },
        )
        .unwrap_err();

    match err {
        VeriflowError::Halted { stage, result } => {
            assert_eq!(stage, Stage::Transform);
            assert!(!result.passed);
            assert_eq!(result.critical_count(), 1);
            assert_eq!(result.metrics["anomalies_by_rules"], 3.0);
        }
        other => panic!("expected a halt, got: {other}"),
    }

    // The load stage never ran.
    assert!(orchestrator.stage_results().contains_key(&Stage::Extract));
    assert!(orchestrator.stage_results().contains_key(&Stage::Transform));
    assert!(!orchestrator.stage_results().contains_key(&Stage::Load));
}

#[test]
fn test_anomaly_rate_between_thresholds_warns_and_continues() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("output.csv");

    // 30% sits between the 25% warning threshold and the 50% ceiling.
    let mut orchestrator =
        Orchestrator::new(harness_config(true, 50.0)).with_validator(collaborators());
    let report = orchestrator
        .run(
            || Ok(Frame::from_csv_str(DIRTY_CSV)),
            Ok,
            move |frame: Frame| {
                frame.write_csv(&dest)?;
                Ok(LoadReceipt::new(dest, frame.row_count()))
            },
        )
        .unwrap();

    assert!(report.success);
    assert_eq!(report.metrics.critical_alerts, 0);
    assert_eq!(report.metrics.warning_alerts, 1);
    assert_eq!(report.stage_results.len(), 3);
    assert!(report.stage_results[&Stage::Transform].passed);
}

#[test]
fn test_cleansing_hook_brings_the_batch_under_threshold() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("output.csv");

    let mut orchestrator =
        Orchestrator::new(harness_config(true, 20.0)).with_validator(collaborators());
    orchestrator
        .register_hook(
            "pre_transform",
            "drop_null_balances",
            |frame: Frame, _ctx: &mut StageContext| {
                let idx = frame.column_index("account_balance");
                let mut cleaned = Frame::new(frame.columns.clone());
                for row in &frame.rows {
                    let keep = idx.is_none_or(|i| {
                        !matches!(row.get(i), None | Some(Value::Null))
                    });
                    if keep {
                        cleaned.push_row(row.clone());
                    }
                }
                let dropped = frame.row_count() - cleaned.row_count();
                let alerts = vec![Alert::info(
                    "rows_dropped",
                    format!("dropped {dropped} rows with null balances"),
                )];
                Ok((cleaned, alerts))
            },
        )
        .unwrap();

    let report = orchestrator
        .run(
            || Ok(Frame::from_csv_str(DIRTY_CSV)),
            Ok,
            move |frame: Frame| {
                frame.write_csv(&dest)?;
                Ok(LoadReceipt::new(dest, frame.row_count()))
            },
        )
        .unwrap();

    assert!(report.success);
    let transform = &report.stage_results[&Stage::Transform];
    assert!(transform.passed);
    assert_eq!(transform.metrics["total_records"], 7.0);
    assert_eq!(transform.metrics["total_anomalies"], 0.0);
    assert_eq!(transform.alerts.len(), 1);
    assert_eq!(transform.alerts[0].kind, "rows_dropped");

    // The load stage saw the cleaned frame.
    assert_eq!(report.stage_results[&Stage::Load].metrics["rows_written"], 7.0);
}

#[test]
fn test_hook_registration_rejects_unknown_stage() {
    let mut orchestrator = Orchestrator::new(harness_config(false, 50.0));
    let err = orchestrator
        .register_hook("cleanup", "noop", |frame: Frame, _ctx: &mut StageContext| {
            Ok((frame, Vec::new()))
        })
        .unwrap_err();
    assert!(matches!(err, VeriflowError::Config(_)));
}

#[test]
fn test_config_built_forest_detector_passes_clean_batch() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("output.csv");

    let method: AnomalyMethod =
        serde_json::from_str(r#"{"method": "isolation_forest", "contamination": 0.1}"#).unwrap();
    let validator =
        StageValidator::new().with_outliers(Arc::from(build_detector(&method).unwrap()));

    let mut orchestrator =
        Orchestrator::new(harness_config(false, 50.0)).with_validator(validator);
    let report = orchestrator
        .run(
            || Ok(Frame::from_csv_str(CLEAN_CSV)),
            Ok,
            move |frame: Frame| {
                frame.write_csv(&dest)?;
                Ok(LoadReceipt::new(dest, frame.row_count()))
            },
        )
        .unwrap();

    assert!(report.success);
    let transform = &report.stage_results[&Stage::Transform];
    assert!(transform.passed);
    assert!(transform.metrics.contains_key("anomalies_by_stats"));
}
