//! Scenario and feature model.
//!
//! A [`Scenario`] is an ordered list of step invocations, built once and
//! executed once per attempt. A [`Feature`] groups scenarios under a shared
//! retry budget. Both can be written with the builder API or loaded from YAML
//! via [`FeatureDefinition`], whose missing retry counts are resolved against
//! the configuration exactly once.

use crate::config::CaseflowConfig;
use crate::registry::{StepArgs, StepKind, StepName, StepRegistry};
use crate::result::{CaseflowError, CaseflowResult};
use crate::session::is_builtin_var;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Step used by [`Scenario::capture_case_ref`]
pub const CASE_REF_STEP: &str = "get_case_ref_from_url";
/// Step used by [`Scenario::expect_state`]
pub const END_STATE_STEP: &str = "see_end_state";

/// One step call inside a scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Invocation {
    /// Registered step name
    pub step: String,
    /// Arguments; strings may contain `${var}` placeholders
    #[serde(default, skip_serializing_if = "StepArgs::is_empty")]
    pub args: StepArgs,
    /// Session variable that receives the step's return value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capture: Option<String>,
}

impl Invocation {
    /// Invocation without arguments
    #[must_use]
    pub fn new(step: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            args: StepArgs::new(),
            capture: None,
        }
    }

    /// Set arguments
    #[must_use]
    pub fn with_args(mut self, args: StepArgs) -> Self {
        self.args = args;
        self
    }

    /// Store the return value under `var`
    #[must_use]
    pub fn capture(mut self, var: impl Into<String>) -> Self {
        self.capture = Some(var.into());
        self
    }
}

/// Ordered, state-asserting workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub steps: Vec<Invocation>,
    /// Extra attempts after the first failure
    pub retries: u32,
}

impl Scenario {
    /// Empty scenario with no retries
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            retries: 0,
        }
    }

    /// Set scenario retries
    #[must_use]
    pub const fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Append a step without arguments
    #[must_use]
    pub fn step(self, name: impl Into<String>) -> Self {
        self.invoke(Invocation::new(name))
    }

    /// Append a step with arguments
    #[must_use]
    pub fn step_with(self, name: impl Into<String>, args: StepArgs) -> Self {
        self.invoke(Invocation::new(name).with_args(args))
    }

    /// Append an invocation
    #[must_use]
    pub fn invoke(mut self, invocation: Invocation) -> Self {
        self.steps.push(invocation);
        self
    }

    /// Capture the case reference from the current URL
    #[must_use]
    pub fn capture_case_ref(self) -> Self {
        self.step(CASE_REF_STEP)
    }

    /// Assert the rendered case state
    #[must_use]
    pub fn expect_state(self, token: impl Into<String>) -> Self {
        self.step_with(END_STATE_STEP, StepArgs::new().with("state", token.into()))
    }

    /// Number of steps
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Check the scenario against a registry before it runs.
    ///
    /// Reports the first unknown or malformed step name, a `capture` on a
    /// step that returns nothing or into a built-in variable, or a transition not followed by a state
    /// check before the next transition or the end of the scenario.
    pub fn validate(&self, registry: &StepRegistry) -> CaseflowResult<()> {
        let fail = |index: usize, message: String| CaseflowError::InvalidScenario {
            scenario: self.name.clone(),
            index: index + 1,
            message,
        };

        if self.steps.is_empty() {
            return Err(fail(0, "scenario has no steps".to_string()));
        }

        let mut open_transition: Option<(usize, &str)> = None;
        for (index, invocation) in self.steps.iter().enumerate() {
            let _ = StepName::new(invocation.step.as_str()).map_err(|e| fail(index, e.to_string()))?;
            let kind = registry
                .kind(&invocation.step)
                .map_err(|e| fail(index, e.to_string()))?;

            if let Some(var) = &invocation.capture {
                if !kind.returns_value() {
                    return Err(fail(
                        index,
                        format!("'{}' is {kind} and returns nothing to capture", invocation.step),
                    ));
                }
                let _ = StepName::new(var.as_str())
                    .map_err(|_| fail(index, format!("capture variable '{var}' is not an identifier")))?;
                if is_builtin_var(var) {
                    return Err(fail(
                        index,
                        format!("capture variable '{var}' is built in and cannot be overwritten"),
                    ));
                }
            }

            match kind {
                StepKind::Transition => {
                    if let Some((open_index, open_step)) = open_transition {
                        return Err(fail(
                            index,
                            format!(
                                "transition '{}' follows transition '{open_step}' (step #{}) without a state check",
                                invocation.step,
                                open_index + 1
                            ),
                        ));
                    }
                    open_transition = Some((index, invocation.step.as_str()));
                }
                StepKind::StateCheck => open_transition = None,
                StepKind::Action | StepKind::ExtractCaseReference | StepKind::ExtractText => {}
            }
        }

        match open_transition {
            Some((index, step)) => Err(fail(
                index,
                format!("transition '{step}' is never followed by a state check"),
            )),
            None => Ok(()),
        }
    }
}

/// Scenarios sharing a feature-level retry budget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub name: String,
    pub scenarios: Vec<Scenario>,
    /// Extra whole-feature attempts after scenario retries are exhausted
    pub retries: u32,
}

impl Feature {
    /// Empty feature with no retries
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scenarios: Vec::new(),
            retries: 0,
        }
    }

    /// Set feature retries
    #[must_use]
    pub const fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Append a scenario
    #[must_use]
    pub fn scenario(mut self, scenario: Scenario) -> Self {
        self.scenarios.push(scenario);
        self
    }

    /// Validate every scenario
    pub fn validate(&self, registry: &StepRegistry) -> CaseflowResult<()> {
        if self.scenarios.is_empty() {
            return Err(CaseflowError::InvalidScenario {
                scenario: self.name.clone(),
                index: 0,
                message: "feature has no scenarios".to_string(),
            });
        }
        self.scenarios.iter().try_for_each(|s| s.validate(registry))
    }
}

/// Scenario as written in a feature file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
    pub steps: Vec<Invocation>,
}

/// Feature file contents.
///
/// ```yaml
/// feature: Caseworker grant of probate
/// retries: 1
/// scenarios:
///   - name: Issue grant
///     retries: 2
///     steps:
///       - step: authenticate_with_idam
///         args: { role: caseworker }
///       - step: get_case_ref_from_url
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeatureDefinition {
    pub feature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
    pub scenarios: Vec<ScenarioDefinition>,
}

impl FeatureDefinition {
    /// Parse YAML
    pub fn from_yaml_str(yaml: &str) -> CaseflowResult<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Read and parse a feature file
    pub fn load(path: &Path) -> CaseflowResult<Self> {
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            CaseflowError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Fill in missing retry counts from configuration defaults
    #[must_use]
    pub fn resolve(self, config: &CaseflowConfig) -> Feature {
        Feature {
            name: self.feature,
            retries: self.retries.unwrap_or(config.retries.features),
            scenarios: self
                .scenarios
                .into_iter()
                .map(|s| Scenario {
                    name: s.name,
                    retries: s.retries.unwrap_or(config.retries.scenarios),
                    steps: s.steps,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::Actor;
    use crate::registry::{StepContext, StepFragment, StepModule, StepOutcome};
    use async_trait::async_trait;

    struct Stub(StepKind);

    #[async_trait]
    impl StepFragment for Stub {
        fn kind(&self) -> StepKind {
            self.0
        }

        async fn run(
            &self,
            _actor: &mut dyn Actor,
            _ctx: &StepContext<'_>,
            _args: &StepArgs,
        ) -> CaseflowResult<StepOutcome> {
            Ok(StepOutcome::Done)
        }
    }

    fn registry() -> StepRegistry {
        StepRegistry::build([StepModule::new("test")
            .step("sign_in", Stub(StepKind::Action))
            .step("create_case", Stub(StepKind::Transition))
            .step("issue_grant", Stub(StepKind::Transition))
            .step(END_STATE_STEP, Stub(StepKind::StateCheck))
            .step(CASE_REF_STEP, Stub(StepKind::ExtractCaseReference))
            .step("grab_text", Stub(StepKind::ExtractText))])
        .unwrap()
    }

    fn index_of(err: CaseflowError) -> usize {
        match err {
            CaseflowError::InvalidScenario { index, .. } => index,
            other => panic!("unexpected {other}"),
        }
    }

    mod validate_tests {
        use super::*;

        #[test]
        fn test_well_formed_scenario() {
            Scenario::new("grant")
                .step("sign_in")
                .step("create_case")
                .capture_case_ref()
                .expect_state("Case created")
                .step("issue_grant")
                .expect_state("Grant issued")
                .validate(&registry())
                .unwrap();
        }

        #[test]
        fn test_unknown_step_reports_index() {
            let err = Scenario::new("s")
                .step("sign_in")
                .step("sign_on")
                .validate(&registry())
                .unwrap_err();
            assert_eq!(index_of(err), 2);
        }

        #[test]
        fn test_transition_without_check_at_end() {
            let err = Scenario::new("s")
                .step("create_case")
                .capture_case_ref()
                .validate(&registry())
                .unwrap_err();
            assert_eq!(index_of(err), 1);
        }

        #[test]
        fn test_back_to_back_transitions() {
            let err = Scenario::new("s")
                .step("create_case")
                .step("issue_grant")
                .expect_state("Grant issued")
                .validate(&registry())
                .unwrap_err();
            assert_eq!(index_of(err), 2);
        }

        #[test]
        fn test_capture_requires_value_step() {
            let err = Scenario::new("s")
                .invoke(Invocation::new("sign_in").capture("who"))
                .validate(&registry())
                .unwrap_err();
            assert!(err.to_string().contains("nothing to capture"));

            Scenario::new("s")
                .invoke(Invocation::new("grab_text").capture("deceased"))
                .validate(&registry())
                .unwrap();
        }

        #[test]
        fn test_capture_into_builtin_rejected() {
            for var in crate::session::BUILTIN_VARS {
                let err = Scenario::new("s")
                    .step(CASE_REF_STEP)
                    .invoke(Invocation::new("grab_text").capture(var))
                    .validate(&registry())
                    .unwrap_err();
                assert_eq!(index_of(err), 2);
            }
        }

        #[test]
        fn test_empty_scenario_rejected() {
            assert!(Scenario::new("s").validate(&registry()).is_err());
            assert!(Feature::new("f").validate(&registry()).is_err());
        }
    }

    mod definition_tests {
        use super::*;

        const YAML: &str = r#"
feature: Grant of probate
scenarios:
  - name: Create and issue
    retries: 3
    steps:
      - step: sign_in
        args: { role: caseworker }
      - step: create_case
      - step: get_case_ref_from_url
      - step: see_end_state
        args: { state: "Case created" }
  - name: Second
    steps:
      - step: grab_text
        args: { selector: "h1" }
        capture: heading
"#;

        #[test]
        fn test_resolve_fills_defaults_once() {
            let config = CaseflowConfig::default().with_retries(2, 1);
            let feature = FeatureDefinition::from_yaml_str(YAML)
                .unwrap()
                .resolve(&config);
            assert_eq!(feature.name, "Grant of probate");
            assert_eq!(feature.retries, 2);
            assert_eq!(feature.scenarios[0].retries, 3);
            assert_eq!(feature.scenarios[1].retries, 1);
            assert_eq!(feature.scenarios[1].steps[0].capture.as_deref(), Some("heading"));
            feature.validate(&registry()).unwrap();
        }

        #[test]
        fn test_unknown_field_rejected() {
            let yaml = "feature: x\nscenarios:\n  - name: s\n    steps:\n      - step: a\n        argz: {}\n";
            assert!(FeatureDefinition::from_yaml_str(yaml).is_err());
        }

        #[test]
        fn test_load_from_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("grant.yaml");
            std::fs::write(&path, YAML).unwrap();
            let def = FeatureDefinition::load(&path).unwrap();
            assert_eq!(def.scenarios.len(), 2);
            assert!(FeatureDefinition::load(&dir.path().join("missing.yaml")).is_err());
        }
    }
}
