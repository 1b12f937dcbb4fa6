//! Terminal output: status lines, run progress and summaries

use caseflow::{FeatureReport, Reporter};
use console::{style, Style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Writes human-facing status lines to stderr
#[derive(Debug)]
pub struct Printer {
    term: Term,
    spinner: Option<ProgressBar>,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for Printer {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl Printer {
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            spinner: None,
            use_color,
            quiet,
        }
    }

    /// Show a spinner while a long run is in flight
    pub fn start_spinner(&mut self, message: &str) {
        if self.quiet || !self.term.is_term() {
            return;
        }
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {elapsed_precise} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(120));
        self.spinner = Some(spinner);
    }

    pub fn finish_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    fn line(&self, message: &str) {
        let _ = self.term.write_line(message);
    }

    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("✓").green().bold().to_string()
        } else {
            "PASS".to_string()
        };
        self.line(&format!("{prefix} {message}"));
    }

    /// Failures print even in quiet mode
    pub fn failure(&self, message: &str) {
        let prefix = if self.use_color {
            style("✗").red().bold().to_string()
        } else {
            "FAIL".to_string()
        };
        self.line(&format!("{prefix} {message}"));
    }

    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("ℹ").blue().bold().to_string()
        } else {
            "INFO".to_string()
        };
        self.line(&format!("{prefix} {message}"));
    }

    pub fn header(&self, title: &str) {
        if self.quiet {
            return;
        }
        let styled = if self.use_color {
            style(title).bold().underlined().to_string()
        } else {
            format!("=== {title} ===")
        };
        self.line("");
        self.line(&styled);
    }

    /// One line per feature, then each failing step
    pub fn feature(&self, report: &FeatureReport) {
        let attempts = report.attempts.len();
        if report.passed() {
            self.success(&format!(
                "{} ({attempts} attempt{})",
                report.name,
                if attempts == 1 { "" } else { "s" }
            ));
            return;
        }
        self.failure(&format!("{} ({attempts} attempts)", report.name));
        for scenario in report.final_scenarios() {
            if let Some(failure) = scenario.failure() {
                self.failure(&format!("  {}: {failure}", scenario.name));
            }
        }
    }

    /// Totals line
    pub fn summary(&self, reporter: &Reporter, duration: Duration) {
        let failed = reporter.failed_count();
        if self.quiet && failed == 0 {
            return;
        }
        let passed = reporter.passed_count();
        let secs = duration.as_secs_f64();
        self.line("");
        if self.use_color {
            let status = if failed > 0 {
                Style::new().red().bold().apply_to("FAILED")
            } else {
                Style::new().green().bold().apply_to("PASSED")
            };
            self.line(&format!(
                "{status} {} features in {secs:.2}s ({passed} passed, {failed} failed)",
                passed + failed
            ));
        } else {
            let status = if failed > 0 { "FAILED" } else { "PASSED" };
            self.line(&format!(
                "{status} {} features in {secs:.2}s ({passed} passed, {failed} failed)",
                passed + failed
            ));
        }
    }
}
