//! Integration tests for the orchestrated run lifecycle.
//!
//! Drives full extract/transform/load runs from the public API: green
//! runs, halting, threshold warnings, disabled validation, hook ordering,
//! and report output.

use std::sync::Arc;

use serde_json::json;
use veriflow_core::{
    Alert, ExtractConfig, Frame, HarnessConfig, HookRegistry, LoadReceipt, Orchestrator,
    ReportGenerator, RuleCheck, RuleMask, RunState, Stage, StageContext, StageValidator,
    ValidationConfig, VeriflowError,
};

// ── Fixtures ─────────────────────────────────────────────────────────────

/// Rules double that reports a fixed anomaly mask regardless of input.
struct MaskRules {
    flags: Vec<bool>,
}

impl MaskRules {
    fn new(flags: Vec<bool>) -> Self {
        Self { flags }
    }
}

impl RuleCheck for MaskRules {
    fn validate(&self, _frame: &Frame) -> anyhow::Result<RuleMask> {
        let mut mask = RuleMask::with_rows(self.flags.len());
        mask.null_or_missing = self.flags.clone();
        Ok(mask)
    }
}

fn sample_frame(rows: usize) -> Frame {
    let mut frame = Frame::new(vec!["id".into(), "amount".into()]);
    for i in 0..rows {
        frame.push_row(vec![json!(i as u64 + 1), json!(100.0 + i as f64)]);
    }
    frame
}

fn config(halt_on_critical: bool) -> HarnessConfig {
    HarnessConfig {
        halt_on_critical,
        validation: ValidationConfig::all_stages(),
        ..HarnessConfig::default()
    }
}

fn run_pipeline(
    orchestrator: &mut Orchestrator,
    rows: usize,
    dest: std::path::PathBuf,
) -> veriflow_core::Result<veriflow_core::RunReport> {
    orchestrator.run(
        move || Ok(sample_frame(rows)),
        Ok,
        move |frame: Frame| {
            frame.write_csv(&dest)?;
            Ok(LoadReceipt::new(dest, frame.row_count()))
        },
    )
}

// ── Scenario: all green ──────────────────────────────────────────────────

#[test]
fn test_green_run_records_three_passing_stages() {
    let dir = tempfile::tempdir().unwrap();
    let mut orchestrator = Orchestrator::new(config(false));

    let report = run_pipeline(&mut orchestrator, 5, dir.path().join("out.csv")).unwrap();

    assert!(report.success);
    assert_eq!(report.metrics.stages_run, 3);
    assert_eq!(report.metrics.stages_passed, 3);
    assert_eq!(report.metrics.total_alerts, 0);
    assert_eq!(orchestrator.state(), RunState::Complete);
    for stage in Stage::PIPELINE {
        assert!(report.stage_results[&stage].passed, "{stage} should pass");
    }
}

// ── Scenario: halt on a missing column ───────────────────────────────────

#[test]
fn test_missing_required_column_halts_at_extract() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(true);
    cfg.validation.extract = Some(ExtractConfig {
        required_columns: vec!["id".into(), "customer_ref".into()],
        ..ExtractConfig::default()
    });
    let mut orchestrator = Orchestrator::new(cfg);

    let err = run_pipeline(&mut orchestrator, 5, dir.path().join("out.csv")).unwrap_err();

    match err {
        VeriflowError::Halted { stage, result } => {
            assert_eq!(stage, Stage::Extract);
            assert!(!result.passed);
            assert_eq!(result.critical_count(), 1);
            assert_eq!(result.alerts[0].kind, "missing_columns");
        }
        other => panic!("expected a halt, got: {other}"),
    }
    assert_eq!(orchestrator.state(), RunState::Halted);
    assert_eq!(orchestrator.stage_results().len(), 1);
    assert!(orchestrator.stage_results().contains_key(&Stage::Extract));
}

// ── Scenario: warning stays below the ceiling ────────────────────────────

#[test]
fn test_anomaly_warning_does_not_fail_the_stage() {
    let dir = tempfile::tempdir().unwrap();
    // 3 of 10 rows flagged: past the 25% warning line, under the 50% max.
    let validator = StageValidator::new().with_rules(Arc::new(MaskRules::new(
        (0..10).map(|i| i < 3).collect(),
    )));
    let mut orchestrator = Orchestrator::new(config(true)).with_validator(validator);

    let report = run_pipeline(&mut orchestrator, 10, dir.path().join("out.csv")).unwrap();

    assert!(report.success);
    assert_eq!(report.metrics.warning_alerts, 1);
    assert_eq!(report.metrics.critical_alerts, 0);
    let transform = &report.stage_results[&Stage::Transform];
    assert!(transform.passed);
    assert_eq!(transform.metrics["anomaly_rate"], 30.0);
}

// ── Scenario: critical without halting ───────────────────────────────────

#[test]
fn test_critical_without_halt_runs_to_completion() {
    let dir = tempfile::tempdir().unwrap();
    // 4 of 5 rows flagged: 80% over the 50% ceiling.
    let validator = StageValidator::new().with_rules(Arc::new(MaskRules::new(
        (0..5).map(|i| i < 4).collect(),
    )));
    let mut orchestrator = Orchestrator::new(config(false)).with_validator(validator);

    let report = run_pipeline(&mut orchestrator, 5, dir.path().join("out.csv")).unwrap();

    assert!(!report.success);
    assert_eq!(report.metrics.stages_run, 3);
    assert_eq!(report.metrics.stages_passed, 2);
    assert_eq!(report.metrics.critical_alerts, 1);
    assert!(!report.stage_results[&Stage::Transform].passed);
    assert!(report.stage_results[&Stage::Load].passed);
    assert_eq!(orchestrator.state(), RunState::Complete);
}

// ── Scenario: disabled validation ────────────────────────────────────────

#[test]
fn test_absent_validation_config_always_passes() {
    let dir = tempfile::tempdir().unwrap();
    // No stage sub-configs at all, and a rules double that would flag
    // every row if it were consulted.
    let validator =
        StageValidator::new().with_rules(Arc::new(MaskRules::new(vec![true; 5])));
    let cfg = HarnessConfig {
        halt_on_critical: true,
        ..HarnessConfig::default()
    };
    let mut orchestrator = Orchestrator::new(cfg).with_validator(validator);

    let report = run_pipeline(&mut orchestrator, 5, dir.path().join("out.csv")).unwrap();

    assert!(report.success);
    assert_eq!(report.metrics.total_alerts, 0);
    for stage in Stage::PIPELINE {
        let result = &report.stage_results[&stage];
        assert!(result.passed);
        assert!(result.metrics.is_empty(), "{stage} should skip its checks");
    }
}

#[test]
fn test_disabled_stage_config_skips_checks() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(true);
    cfg.validation.extract = Some(ExtractConfig {
        enabled: false,
        min_records: 1000,
        ..ExtractConfig::default()
    });
    let mut orchestrator = Orchestrator::new(cfg);

    let report = run_pipeline(&mut orchestrator, 5, dir.path().join("out.csv")).unwrap();
    assert!(report.success);
    assert!(report.stage_results[&Stage::Extract].metrics.is_empty());
}

// ── Hook ordering and context threading ──────────────────────────────────

#[test]
fn test_hooks_thread_data_in_registration_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut orchestrator = Orchestrator::new(config(false));

    // Doubling then truncating is order-sensitive: reversed registration
    // would yield six rows instead of three.
    orchestrator
        .register_hook("pre_transform", "double_rows", |frame: Frame, _ctx| {
            let mut doubled = Frame::new(frame.columns.clone());
            for row in frame.rows.iter().chain(frame.rows.iter()) {
                doubled.push_row(row.clone());
            }
            Ok((doubled, Vec::new()))
        })
        .unwrap();
    orchestrator
        .register_hook("pre_transform", "keep_first_three", |frame: Frame, _ctx| {
            let mut truncated = Frame::new(frame.columns.clone());
            for row in frame.rows.iter().take(3) {
                truncated.push_row(row.clone());
            }
            Ok((truncated, Vec::new()))
        })
        .unwrap();

    let report = run_pipeline(&mut orchestrator, 4, dir.path().join("out.csv")).unwrap();

    assert_eq!(
        report.stage_results[&Stage::Transform].metrics["total_records"],
        3.0
    );
    assert_eq!(report.stage_results[&Stage::Load].metrics["rows_written"], 3.0);
}

#[test]
fn test_scratch_set_by_pre_hook_is_visible_post_stage() {
    let dir = tempfile::tempdir().unwrap();
    let mut orchestrator = Orchestrator::new(config(false));

    orchestrator
        .register_hook(
            "pre_transform",
            "mark_batch",
            |frame: Frame, ctx: &mut StageContext| {
                ctx.set("batch_label", json!("nightly"));
                Ok((frame, Vec::new()))
            },
        )
        .unwrap();
    orchestrator
        .register_hook(
            "transform",
            "read_mark",
            |frame: Frame, ctx: &mut StageContext| {
                let alerts = match ctx.get("batch_label") {
                    Some(label) => vec![Alert::info("batch_label", label.to_string())],
                    None => vec![Alert::warning("batch_label", "label missing")],
                };
                Ok((frame, alerts))
            },
        )
        .unwrap();

    let report = run_pipeline(&mut orchestrator, 3, dir.path().join("out.csv")).unwrap();

    let alerts = &report.stage_results[&Stage::Transform].alerts;
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].kind, "batch_label");
    assert_eq!(alerts[0].message, "\"nightly\"");
}

#[test]
fn test_hook_alerts_do_not_fail_the_stage() {
    let dir = tempfile::tempdir().unwrap();
    let mut orchestrator = Orchestrator::new(config(false));
    orchestrator
        .register_hook("extract", "observer", |frame: Frame, _ctx| {
            let alerts = vec![Alert::critical("observer", "saw something odd")];
            Ok((frame, alerts))
        })
        .unwrap();

    let report = run_pipeline(&mut orchestrator, 3, dir.path().join("out.csv")).unwrap();

    // Hook alerts are tallied but only validation verdicts decide passage.
    assert!(report.stage_results[&Stage::Extract].passed);
    assert!(report.success);
    assert_eq!(report.metrics.critical_alerts, 1);
}

// ── Registry rejection ───────────────────────────────────────────────────

#[test]
fn test_unknown_stage_name_is_rejected() {
    let mut registry = HookRegistry::new();
    let err = registry
        .register("validate", "noop", |frame, _ctx| Ok((frame, Vec::new())))
        .unwrap_err();
    assert!(err.to_string().contains("Unknown stage 'validate'"));

    let mut orchestrator = Orchestrator::new(config(false));
    assert!(orchestrator
        .register_hook("cleanup", "noop", |frame: Frame, _ctx| Ok((frame, Vec::new())))
        .is_err());
}

// ── Report rendering ─────────────────────────────────────────────────────

#[test]
fn test_reports_render_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let mut orchestrator = Orchestrator::new(config(false));
    let report = run_pipeline(&mut orchestrator, 5, dir.path().join("out.csv")).unwrap();

    let generator = ReportGenerator::new();
    let text_path = dir.path().join("report.md");
    let html_path = dir.path().join("report.html");
    generator.write_text(&report, &text_path).unwrap();
    generator.write_html(&report, &html_path).unwrap();

    let text = std::fs::read_to_string(&text_path).unwrap();
    assert!(text.contains("# ETL Validation Report"));
    assert!(text.contains("PASSED"));
    assert!(text.contains("Extract"));

    let html = std::fs::read_to_string(&html_path).unwrap();
    assert!(html.contains("<html"));
    assert!(html.contains(&report.run_id.to_string()));
}
