//! Validate command handler

use super::config::load_suite_config;
use crate::commands::ValidateArgs;
use crate::error::{CliError, CliResult};
use crate::output::Printer;
use caseflow::{CaseflowConfig, CaseflowResult, Feature, FeatureDefinition, StepRegistry};
use std::path::Path;

/// Load one feature file, resolve its defaults and check it against the registry
pub fn validate_feature_file(
    path: &Path,
    registry: &StepRegistry,
    config: &CaseflowConfig,
) -> CaseflowResult<Feature> {
    let feature = FeatureDefinition::load(path)?.resolve(config);
    feature.validate(registry)?;
    Ok(feature)
}

/// Execute the validate command
pub fn execute_validate(args: &ValidateArgs, printer: &Printer) -> CliResult<()> {
    let config = load_suite_config(args.config.as_deref())?;
    let registry = caseflow::pages::standard_registry()?;

    let mut failed = 0;
    for path in &args.features {
        match validate_feature_file(path, &registry, &config) {
            Ok(feature) => printer.success(&format!(
                "{}: '{}' ({} scenarios)",
                path.display(),
                feature.name,
                feature.scenarios.len()
            )),
            Err(e) => {
                failed += 1;
                printer.failure(&format!("{}: {e}", path.display()));
            }
        }
    }

    if failed > 0 {
        return Err(CliError::InvalidFeatures {
            failed,
            total: args.features.len(),
        });
    }
    Ok(())
}
