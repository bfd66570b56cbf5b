//! Run report rendering.
//!
//! Two renderers over the same `RunReport`: a Markdown text report and a
//! standalone HTML dashboard with embedded CSS. Both list stages in
//! pipeline order and are deterministic for a given report.

use std::path::Path;

use handlebars::Handlebars;
use serde::Serialize;
use tracing::info;

use crate::alert::{Alert, Severity};
use crate::error::{ReportError, Result};
use crate::metrics::StageResult;
use crate::orchestrator::RunReport;
use crate::stage::Stage;

#[derive(Debug, Clone, Copy, Default)]
pub struct ReportGenerator;

impl ReportGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Render the Markdown text report.
    pub fn render_text(&self, report: &RunReport) -> String {
        let mut md = String::new();

        md.push_str("# ETL Validation Report\n\n");
        md.push_str(&format!(
            "Run `{}` started {}.\n\n",
            report.run_id,
            report.started_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));

        md.push_str("## Summary\n\n");
        md.push_str("| Metric | Value |\n");
        md.push_str("|--------|-------|\n");
        md.push_str(&format!("| Outcome | {} |\n", outcome_label(report.success)));
        md.push_str(&format!("| Stages run | {} |\n", report.metrics.stages_run));
        md.push_str(&format!(
            "| Stages passed | {} |\n",
            report.metrics.stages_passed
        ));
        md.push_str(&format!(
            "| Total alerts | {} |\n",
            report.metrics.total_alerts
        ));
        md.push_str(&format!(
            "| Critical alerts | {} |\n",
            report.metrics.critical_alerts
        ));
        md.push_str(&format!(
            "| Warning alerts | {} |\n",
            report.metrics.warning_alerts
        ));
        md.push_str(&format!(
            "| Duration | {:.2}s |\n\n",
            report.metrics.total_duration_secs
        ));

        md.push_str("## Stages\n\n");
        for stage in Stage::PIPELINE {
            let Some(result) = report.stage_results.get(&stage) else {
                continue;
            };

            md.push_str(&format!(
                "### {} - {} ({:.2}s)\n\n",
                stage_label(stage),
                outcome_label(result.passed),
                result.duration_secs
            ));

            if !result.metrics.is_empty() {
                md.push_str("| Metric | Value |\n");
                md.push_str("|--------|-------|\n");
                for (name, value) in &result.metrics {
                    md.push_str(&format!("| {name} | {} |\n", format_metric(*value)));
                }
                md.push('\n');
            }

            if result.alerts.is_empty() {
                md.push_str("No alerts.\n\n");
            } else {
                md.push_str("| Severity | Type | Message |\n");
                md.push_str("|----------|------|---------|\n");
                for alert in &result.alerts {
                    let (label, _) = severity_info(alert.severity);
                    md.push_str(&format!(
                        "| {label} | {} | {} |\n",
                        alert.kind, alert.message
                    ));
                }
                md.push('\n');
            }
        }

        md
    }

    /// Render the HTML dashboard.
    pub fn render_html(&self, report: &RunReport) -> Result<String> {
        let view = DashboardView::from_report(report);
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);
        let rendered = handlebars
            .render_template(DASHBOARD_TEMPLATE, &view)
            .map_err(|e| ReportError::Render {
                message: e.to_string(),
            })?;
        Ok(rendered)
    }

    pub fn write_text(&self, report: &RunReport, path: &Path) -> Result<()> {
        let rendered = self.render_text(report);
        write_report(path, &rendered)?;
        info!(path = %path.display(), "wrote text report");
        Ok(())
    }

    pub fn write_html(&self, report: &RunReport, path: &Path) -> Result<()> {
        let rendered = self.render_html(report)?;
        write_report(path, &rendered)?;
        info!(path = %path.display(), "wrote html dashboard");
        Ok(())
    }
}

fn write_report(path: &Path, rendered: &str) -> std::result::Result<(), ReportError> {
    std::fs::write(path, rendered).map_err(|source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn outcome_label(passed: bool) -> &'static str {
    if passed { "PASSED" } else { "FAILED" }
}

fn stage_label(stage: Stage) -> &'static str {
    match stage {
        Stage::PreExtract => "Pre-Extract",
        Stage::Extract => "Extract",
        Stage::PreTransform => "Pre-Transform",
        Stage::Transform => "Transform",
        Stage::PreLoad => "Pre-Load",
        Stage::Load => "Load",
    }
}

/// Display label and CSS class for a severity level.
fn severity_info(severity: Severity) -> (&'static str, &'static str) {
    match severity {
        Severity::Critical => ("Critical", "critical"),
        Severity::Warning => ("Warning", "warning"),
        Severity::Info => ("Info", "info"),
    }
}

/// Whole numbers render without a fraction, everything else with two
/// decimals.
fn format_metric(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

// ---------------------------------------------------------------------------
// HTML view model
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct DashboardView {
    title: &'static str,
    run_id: String,
    started_at: String,
    status_label: &'static str,
    status_class: &'static str,
    stages_run: usize,
    stages_passed: usize,
    total_alerts: usize,
    critical_alerts: usize,
    warning_alerts: usize,
    duration: String,
    stages: Vec<StageView>,
}

#[derive(Serialize)]
struct StageView {
    name: &'static str,
    status_label: &'static str,
    status_class: &'static str,
    duration: String,
    has_metrics: bool,
    metrics: Vec<MetricView>,
    has_alerts: bool,
    alerts: Vec<AlertView>,
}

#[derive(Serialize)]
struct MetricView {
    name: String,
    value: String,
}

#[derive(Serialize)]
struct AlertView {
    kind: String,
    message: String,
    severity_label: &'static str,
    severity_class: &'static str,
}

impl DashboardView {
    fn from_report(report: &RunReport) -> Self {
        let stages = Stage::PIPELINE
            .into_iter()
            .filter_map(|stage| {
                report
                    .stage_results
                    .get(&stage)
                    .map(|result| stage_view(stage, result))
            })
            .collect();

        Self {
            title: "ETL Validation Report",
            run_id: report.run_id.to_string(),
            started_at: report
                .started_at
                .format("%Y-%m-%d %H:%M:%S UTC")
                .to_string(),
            status_label: outcome_label(report.success),
            status_class: status_class(report.success),
            stages_run: report.metrics.stages_run,
            stages_passed: report.metrics.stages_passed,
            total_alerts: report.metrics.total_alerts,
            critical_alerts: report.metrics.critical_alerts,
            warning_alerts: report.metrics.warning_alerts,
            duration: format!("{:.2}", report.metrics.total_duration_secs),
            stages,
        }
    }
}

fn stage_view(stage: Stage, result: &StageResult) -> StageView {
    StageView {
        name: stage_label(stage),
        status_label: outcome_label(result.passed),
        status_class: status_class(result.passed),
        duration: format!("{:.2}", result.duration_secs),
        has_metrics: !result.metrics.is_empty(),
        metrics: result
            .metrics
            .iter()
            .map(|(name, value)| MetricView {
                name: name.clone(),
                value: format_metric(*value),
            })
            .collect(),
        has_alerts: !result.alerts.is_empty(),
        alerts: result.alerts.iter().map(alert_view).collect(),
    }
}

fn alert_view(alert: &Alert) -> AlertView {
    let (severity_label, severity_class) = severity_info(alert.severity);
    AlertView {
        kind: alert.kind.clone(),
        message: alert.message.clone(),
        severity_label,
        severity_class,
    }
}

fn status_class(passed: bool) -> &'static str {
    if passed { "passed" } else { "failed" }
}

const DASHBOARD_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{{title}}</title>
<style>
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; max-width: 960px; margin: 0 auto; padding: 20px; color: #333; background: #fafafa; }
h1 { border-bottom: 2px solid #333; padding-bottom: 10px; }
h2 { color: #555; }
table { border-collapse: collapse; width: 100%; margin: 10px 0; }
th, td { border: 1px solid #ddd; padding: 8px 12px; text-align: left; }
th { background: #f5f5f5; }
.badge { padding: 2px 8px; border-radius: 4px; color: white; font-size: 0.85em; }
.badge.passed { background: #388e3c; }
.badge.failed { background: #d32f2f; }
.badge.critical { background: #d32f2f; }
.badge.warning { background: #f57c00; }
.badge.info { background: #1976d2; }
.stage { border: 1px solid #ddd; border-radius: 6px; padding: 15px; margin: 10px 0; background: white; }
.stage.passed { border-left: 4px solid #388e3c; }
.stage.failed { border-left: 4px solid #d32f2f; }
.stage h3 { margin-top: 0; }
.duration { color: #666; font-size: 0.85em; float: right; }
.alerts { list-style: none; padding: 0; }
.alerts li { padding: 6px 0; border-top: 1px solid #eee; }
.alerts code { background: #f5f5f5; padding: 2px 6px; border-radius: 3px; }
.no-alerts { color: #388e3c; }
.meta { color: #666; font-size: 0.9em; }
footer { margin-top: 40px; padding-top: 10px; border-top: 1px solid #ddd; color: #999; font-size: 0.85em; text-align: center; }
</style>
</head>
<body>
<h1>{{title}}</h1>
<p class="meta">Run {{run_id}} started {{started_at}}</p>
<div class="summary">
<h2>Summary</h2>
<table>
<thead><tr><th>Metric</th><th>Value</th></tr></thead>
<tbody>
<tr><td>Outcome</td><td><span class="badge {{status_class}}">{{status_label}}</span></td></tr>
<tr><td>Stages run</td><td>{{stages_run}}</td></tr>
<tr><td>Stages passed</td><td>{{stages_passed}}</td></tr>
<tr><td>Total alerts</td><td>{{total_alerts}}</td></tr>
<tr><td>Critical alerts</td><td>{{critical_alerts}}</td></tr>
<tr><td>Warning alerts</td><td>{{warning_alerts}}</td></tr>
<tr><td>Duration</td><td>{{duration}}s</td></tr>
</tbody>
</table>
</div>
<div class="stages">
<h2>Stages</h2>
{{#each stages}}
<div class="stage {{status_class}}">
<h3>{{name}} <span class="badge {{status_class}}">{{status_label}}</span> <span class="duration">{{duration}}s</span></h3>
{{#if has_metrics}}
<table>
<thead><tr><th>Metric</th><th>Value</th></tr></thead>
<tbody>
{{#each metrics}}
<tr><td>{{name}}</td><td>{{value}}</td></tr>
{{/each}}
</tbody>
</table>
{{/if}}
{{#if has_alerts}}
<ul class="alerts">
{{#each alerts}}
<li><span class="badge {{severity_class}}">{{severity_label}}</span> <code>{{kind}}</code> {{message}}</li>
{{/each}}
</ul>
{{else}}
<p class="no-alerts">No alerts.</p>
{{/if}}
</div>
{{/each}}
</div>
<footer><p>Generated by Veriflow</p></footer>
</body>
</html>
"#;
