//! Steps command handler: audit the registry

use crate::commands::{OutputFormat, StepsArgs};
use crate::error::CliResult;
use caseflow::pages::standard_registry;
use caseflow::StepDescriptor;
use std::fmt::Write as _;

/// Aligned table of name, area, kind and description
#[must_use]
pub fn render_steps_text(steps: &[StepDescriptor]) -> String {
    let name_width = steps.iter().map(|s| s.name.len()).max().unwrap_or(0).max(4);
    let area_width = steps.iter().map(|s| s.area.len()).max().unwrap_or(0).max(4);
    let kind_width = steps
        .iter()
        .map(|s| s.kind.as_str().len())
        .max()
        .unwrap_or(0)
        .max(4);

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:name_width$}  {:area_width$}  {:kind_width$}  DESCRIPTION",
        "STEP", "AREA", "KIND"
    );
    for step in steps {
        let _ = writeln!(
            out,
            "{:name_width$}  {:area_width$}  {:kind_width$}  {}",
            step.name,
            step.area,
            step.kind.as_str(),
            step.description
        );
    }
    let _ = write!(out, "{} steps", steps.len());
    out
}

/// Execute the steps command
pub fn execute_steps(args: &StepsArgs) -> CliResult<()> {
    let registry = standard_registry()?;
    let steps = registry.descriptors();
    match args.format {
        OutputFormat::Text => println!("{}", render_steps_text(&steps)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&steps)?),
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_text_lists_every_step() {
        let steps = standard_registry().unwrap().descriptors();
        let text = render_steps_text(&steps);
        assert!(text.starts_with("STEP"));
        assert!(text.contains("see_end_state"));
        assert!(text.contains("pages.case_details"));
        assert!(text.ends_with(&format!("{} steps", steps.len())));
    }

    #[test]
    fn test_empty_listing() {
        assert_eq!(
            render_steps_text(&[]).lines().last(),
            Some("0 steps")
        );
    }
}
