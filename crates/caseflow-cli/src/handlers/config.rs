//! Config command handler

use crate::commands::{ConfigArgs, ConfigFormat};
use crate::error::CliResult;
use caseflow::CaseflowConfig;
use std::path::Path;

/// Load the suite configuration: the given file, or defaults, with
/// `CASEFLOW_*` environment overrides applied and validated either way
pub fn load_suite_config(path: Option<&Path>) -> CliResult<CaseflowConfig> {
    let config = match path {
        Some(path) => CaseflowConfig::load(path)?,
        None => CaseflowConfig::from_env()?,
    };
    Ok(config)
}

/// Render with every password redacted
pub fn render_config(config: &CaseflowConfig, format: ConfigFormat) -> CliResult<String> {
    let redacted = config.redacted();
    Ok(match format {
        ConfigFormat::Yaml => serde_yaml_ng::to_string(&redacted)?,
        ConfigFormat::Json => serde_json::to_string_pretty(&redacted)?,
    })
}

/// Execute the config command
pub fn execute_config(args: &ConfigArgs) -> CliResult<()> {
    let config = load_suite_config(args.config.as_deref())?;
    println!("{}", render_config(&config, args.format)?);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use caseflow::{Credentials, Role};
    use std::io::Write;

    #[test]
    fn test_render_redacts_passwords() {
        let config = CaseflowConfig::default()
            .with_user(Role::Solicitor, Credentials::new("sol@test", "hunter2"));
        for format in [ConfigFormat::Yaml, ConfigFormat::Json] {
            let rendered = render_config(&config, format).unwrap();
            assert!(rendered.contains("sol@test"));
            assert!(!rendered.contains("hunter2"));
        }
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "back_office_url: https://bo.example/").unwrap();
        writeln!(file, "retries: {{ features: 2, scenarios: 1 }}").unwrap();
        let config = load_suite_config(Some(file.path())).unwrap();
        assert_eq!(config.base_url(), "https://bo.example");
        assert_eq!(config.retries.features, 2);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(load_suite_config(Some(Path::new("/nonexistent/caseflow.yaml"))).is_err());
    }
}
