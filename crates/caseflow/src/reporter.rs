//! Run reports: JSON, HTML with inline failure screenshots, and JUnit XML.

use crate::result::CaseflowResult;
use crate::runner::{FeatureReport, ScenarioReport, StepFailure, StepStatus};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::info;

/// Files written by [`Reporter::write`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub json: PathBuf,
    pub html: PathBuf,
    pub junit: PathBuf,
    /// One PNG per failed scenario that had a capture
    pub screenshots: Vec<PathBuf>,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    suite: &'a str,
    passed: usize,
    failed: usize,
    features: &'a [FeatureReport],
}

/// Collects feature reports for one run
#[derive(Debug, Clone, Default)]
pub struct Reporter {
    suite_name: String,
    features: Vec<FeatureReport>,
}

impl Reporter {
    /// Create a reporter
    #[must_use]
    pub fn new(suite_name: impl Into<String>) -> Self {
        Self {
            suite_name: suite_name.into(),
            features: Vec::new(),
        }
    }

    /// Add a feature result
    pub fn record(&mut self, report: FeatureReport) {
        self.features.push(report);
    }

    #[must_use]
    pub fn features(&self) -> &[FeatureReport] {
        &self.features
    }

    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.features.iter().filter(|f| f.passed()).count()
    }

    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.features.len() - self.passed_count()
    }

    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.features.iter().all(FeatureReport::passed)
    }

    /// Failed scenarios of each feature's final attempt
    #[must_use]
    pub fn failures(&self) -> Vec<(&str, &ScenarioReport, &StepFailure)> {
        self.features
            .iter()
            .flat_map(|f| {
                f.final_scenarios()
                    .iter()
                    .filter_map(move |s| s.failure().map(|failure| (f.name.as_str(), s, failure)))
            })
            .collect()
    }

    /// One-line summary
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{}: {}/{} features passed",
            self.suite_name,
            self.passed_count(),
            self.features.len()
        )
    }

    /// Write `report.json`, `index.html`, `junit.xml` and failure PNGs
    pub fn write(&self, dir: &Path) -> CaseflowResult<ReportPaths> {
        std::fs::create_dir_all(dir)?;

        let json = dir.join("report.json");
        std::fs::write(&json, self.render_json()?)?;

        let html = dir.join("index.html");
        std::fs::write(&html, self.render_html())?;

        let junit = dir.join("junit.xml");
        std::fs::write(&junit, self.render_junit())?;

        let mut screenshots = Vec::new();
        for (feature, scenario, failure) in self.failures() {
            if let Some(shot) = failure.screenshot.as_ref().filter(|s| s.is_valid()) {
                let path = dir.join(format!(
                    "{}--{}.png",
                    file_stem(feature),
                    file_stem(&scenario.name)
                ));
                std::fs::write(&path, &shot.data)?;
                screenshots.push(path);
            }
        }

        info!(dir = %dir.display(), summary = %self.summary(), "report written");
        Ok(ReportPaths {
            json,
            html,
            junit,
            screenshots,
        })
    }

    /// Serialize every attempt of every feature
    pub fn render_json(&self) -> CaseflowResult<String> {
        Ok(serde_json::to_string_pretty(&JsonReport {
            suite: &self.suite_name,
            passed: self.passed_count(),
            failed: self.failed_count(),
            features: &self.features,
        })?)
    }

    /// Self-contained HTML page; failure screenshots are inlined
    #[must_use]
    pub fn render_html(&self) -> String {
        let mut html = String::new();

        html.push_str(
            r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>Caseflow Report</title>
    <style>
        body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; margin: 20px; }
        .summary { background: #f5f5f5; padding: 20px; border-radius: 8px; margin-bottom: 20px; }
        .scenario { padding: 10px; margin: 5px 0; border-radius: 4px; }
        .scenario.pass { background: #e8f5e9; border-left: 4px solid #4caf50; }
        .scenario.fail { background: #ffebee; border-left: 4px solid #f44336; }
        .steps li.failed { color: #d32f2f; font-weight: bold; }
        .steps li.skipped { color: #9e9e9e; }
        .error { color: #d32f2f; font-family: monospace; white-space: pre-wrap; }
        .screenshot img { max-width: 800px; border: 1px solid #ddd; }
    </style>
</head>
<body>
"#,
        );

        let _ = write!(
            html,
            r#"<div class="summary">
    <h1>{}</h1>
    <h2>{}/{} features passed</h2>
</div>
"#,
            escape_xml(&self.suite_name),
            self.passed_count(),
            self.features.len()
        );

        for feature in &self.features {
            let _ = writeln!(
                html,
                "<h2>{} ({} attempt(s), {:.1}s)</h2>",
                escape_xml(&feature.name),
                feature.attempts.len(),
                ms_to_secs(feature.duration_ms)
            );
            for scenario in feature.final_scenarios() {
                render_scenario(&mut html, scenario);
            }
        }

        html.push_str(
            r"
<footer>
    <p>Generated by caseflow</p>
</footer>
</body>
</html>
",
        );
        html
    }

    /// JUnit XML: one test case per scenario of each feature's final attempt
    #[must_use]
    pub fn render_junit(&self) -> String {
        let mut xml = String::new();
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        let _ = writeln!(xml, r#"<testsuites name="{}">"#, escape_xml(&self.suite_name));

        for feature in &self.features {
            let scenarios = feature.final_scenarios();
            let failures = scenarios.iter().filter(|s| !s.passed()).count();
            let _ = writeln!(
                xml,
                r#"  <testsuite name="{}" tests="{}" failures="{}" time="{:.3}">"#,
                escape_xml(&feature.name),
                scenarios.len(),
                failures,
                ms_to_secs(feature.duration_ms)
            );
            for scenario in scenarios {
                let time: u64 = scenario.attempts.iter().map(|a| a.duration_ms).sum();
                let _ = writeln!(
                    xml,
                    r#"    <testcase name="{}" time="{:.3}">"#,
                    escape_xml(&scenario.name),
                    ms_to_secs(time)
                );
                if let Some(failure) = scenario.failure() {
                    let message = escape_xml(&failure.to_string());
                    let _ = writeln!(xml, r#"      <failure message="{message}">{message}</failure>"#);
                }
                xml.push_str("    </testcase>\n");
            }
            xml.push_str("  </testsuite>\n");
        }

        xml.push_str("</testsuites>\n");
        xml
    }
}

fn render_scenario(html: &mut String, scenario: &ScenarioReport) {
    let class = if scenario.passed() { "pass" } else { "fail" };
    let _ = writeln!(
        html,
        r#"<div class="scenario {class}">
    <strong>{}</strong> ({} attempt(s))"#,
        escape_xml(&scenario.name),
        scenario.attempts.len()
    );
    if let Some(case_ref) = scenario.case_ref() {
        let _ = writeln!(html, "    <p>Case: {case_ref}</p>");
    }

    if let Some(attempt) = scenario.attempts.last() {
        html.push_str("    <ol class=\"steps\">\n");
        for step in &attempt.steps {
            let status = match step.status {
                StepStatus::Passed => "passed",
                StepStatus::Failed => "failed",
                StepStatus::Skipped => "skipped",
            };
            let _ = writeln!(
                html,
                r#"        <li class="{status}">{} ({}ms)</li>"#,
                escape_xml(&step.step),
                step.duration_ms
            );
        }
        html.push_str("    </ol>\n");
    }

    if let Some(failure) = scenario.failure() {
        let _ = writeln!(
            html,
            r#"    <div class="error">{}</div>"#,
            escape_xml(&failure.to_string())
        );
        if let Some(shot) = failure.screenshot.as_ref().filter(|s| s.is_valid()) {
            let _ = writeln!(
                html,
                r#"    <div class="screenshot"><img alt="{}" src="data:image/png;base64,{}"></div>"#,
                escape_xml(&shot.label),
                BASE64.encode(&shot.data)
            );
        }
    }
    html.push_str("</div>\n");
}

#[allow(clippy::cast_precision_loss)]
fn ms_to_secs(ms: u64) -> f64 {
    ms as f64 / 1000.0
}

fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Escape XML special characters
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
