//! End-to-end runner tests against the mock actor.
//!
//! These drive whole scenarios through the public API: registry lookup,
//! validation, ordered execution, retries and the standard page fragments.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use async_trait::async_trait;
use caseflow::prelude::*;
use caseflow::{CaseReference, Credentials, FeatureDefinition, StepStatus, VAR_CASE_REF};
use regex::Regex;
use std::path::PathBuf;
use std::sync::Arc;

// ============================================================================
// Test fragments
// ============================================================================

struct CreateCase;

#[async_trait]
impl StepFragment for CreateCase {
    fn kind(&self) -> StepKind {
        StepKind::Action
    }

    async fn run(
        &self,
        actor: &mut dyn Actor,
        ctx: &StepContext<'_>,
        _args: &StepArgs,
    ) -> CaseflowResult<StepOutcome> {
        actor
            .navigate(&format!("{}/create/case", ctx.config.base_url()))
            .await?;
        actor.click("#create-case").await?;
        Ok(StepOutcome::Done)
    }
}

/// Creates a case and returns its reference from the landing URL
struct StartCase;

#[async_trait]
impl StepFragment for StartCase {
    fn kind(&self) -> StepKind {
        StepKind::ExtractCaseReference
    }

    async fn run(
        &self,
        actor: &mut dyn Actor,
        ctx: &StepContext<'_>,
        _args: &StepArgs,
    ) -> CaseflowResult<StepOutcome> {
        actor
            .navigate(&format!("{}/create/case", ctx.config.base_url()))
            .await?;
        actor
            .wait_for_navigation("#create-case", ctx.config.timeouts.navigation())
            .await?;
        let url = actor.current_url().await?;
        CaseReference::from_url(&url).map(StepOutcome::CaseReference)
    }
}

struct FillDeceasedDetails;

#[async_trait]
impl StepFragment for FillDeceasedDetails {
    async fn run(
        &self,
        actor: &mut dyn Actor,
        _ctx: &StepContext<'_>,
        args: &StepArgs,
    ) -> CaseflowResult<StepOutcome> {
        actor.fill_field("#deceasedName", args.str("name")?).await?;
        Ok(StepOutcome::Done)
    }
}

struct Submit;

#[async_trait]
impl StepFragment for Submit {
    fn kind(&self) -> StepKind {
        StepKind::Transition
    }

    async fn run(
        &self,
        actor: &mut dyn Actor,
        ctx: &StepContext<'_>,
        _args: &StepArgs,
    ) -> CaseflowResult<StepOutcome> {
        actor
            .wait_for_navigation("#submit", ctx.config.timeouts.navigation())
            .await?;
        Ok(StepOutcome::Done)
    }
}

/// Searches for the reference passed in `reference`
struct SearchCase;

#[async_trait]
impl StepFragment for SearchCase {
    async fn run(
        &self,
        actor: &mut dyn Actor,
        _ctx: &StepContext<'_>,
        args: &StepArgs,
    ) -> CaseflowResult<StepOutcome> {
        actor.fill_field("#search", args.str("reference")?).await?;
        actor.click("#confirm").await?;
        Ok(StepOutcome::Done)
    }
}

fn suite_registry() -> Arc<StepRegistry> {
    let test_steps = StepModule::new("test")
        .step("create_case", CreateCase)
        .step("start_case", StartCase)
        .step("fill_deceased_details", FillDeceasedDetails)
        .step("submit", Submit)
        .step("search_case", SearchCase);
    Arc::new(StepRegistry::build(standard_modules().into_iter().chain([test_steps])).unwrap())
}

fn config() -> Arc<CaseflowConfig> {
    Arc::new(
        CaseflowConfig::default()
            .with_back_office_url("https://bo.test/")
            .with_user(Role::Caseworker, Credentials::new("cw@test", "secret")),
    )
}

fn runner(factory: &Arc<MockActorFactory>) -> ScenarioRunner {
    let actors: Arc<dyn ActorFactory> = Arc::clone(factory) as Arc<dyn ActorFactory>;
    ScenarioRunner::new(suite_registry(), config(), actors)
}

const CASE_URL: &str = "https://bo.test/cases/case-details/1672831027562390";
const ALNUM_CASE_URL: &str = "https://bo.test/cases/case-details/AB12CD34EF56GH78";

// ============================================================================
// Registry
// ============================================================================

mod registry_tests {
    use super::*;

    #[test]
    fn test_lookup_returns_registered_fragment() {
        let registry = suite_registry();
        let fragment = registry.get("submit").unwrap();
        assert_eq!(fragment.kind(), StepKind::Transition);
        assert_eq!(registry.area("submit"), Some("test"));
        assert!(registry.contains("authenticate_with_idam"));
    }

    #[test]
    fn test_duplicate_name_fails_at_build() {
        let clash = StepModule::new("clash").step("sign_out", Submit);
        let err = StepRegistry::build(standard_modules().into_iter().chain([clash])).unwrap_err();
        match err {
            CaseflowError::DuplicateStep { name, .. } => assert_eq!(name, "sign_out"),
            other => panic!("unexpected {other}"),
        }
    }

    #[test]
    fn test_unknown_name_is_an_error() {
        assert!(matches!(
            suite_registry().get("fill_in_details"),
            Err(CaseflowError::UnknownStep { .. })
        ));
    }
}

// ============================================================================
// Scenario execution
// ============================================================================

mod execution_tests {
    use super::*;

    fn create_application() -> Scenario {
        Scenario::new("Create application")
            .step("create_case")
            .step_with(
                "fill_deceased_details",
                StepArgs::new().with("name", "Jane Doe"),
            )
            .step("submit")
            .expect_state("Application created")
            .capture_case_ref()
    }

    #[tokio::test]
    async fn test_create_application_end_to_end() {
        let factory = Arc::new(MockActorFactory::new(|_| {
            MockActor::new()
                .navigates("#submit", CASE_URL)
                .with_text(caseflow::pages::common::END_STATE_CELL, "Application created")
        }));
        let report = runner(&factory).run(&create_application()).await.unwrap();

        assert!(report.passed());
        let case_ref = report.case_ref().unwrap();
        let pattern =
            Regex::new(r"^[A-Za-z0-9]{4}-[A-Za-z0-9]{4}-[A-Za-z0-9]{4}-[A-Za-z0-9]{4}$").unwrap();
        assert!(pattern.is_match(case_ref.as_str()));
        assert!(factory
            .journal()
            .contains(&"fill_field:#deceasedName=Jane Doe".to_string()));
    }

    /// Case creation returns the reference as its first step
    fn start_application() -> Scenario {
        Scenario::new("Start application")
            .step("start_case")
            .step_with(
                "fill_deceased_details",
                StepArgs::new().with("name", "Jane Doe"),
            )
            .step("submit")
            .expect_state("Application created")
    }

    fn start_application_actors(rendered_state: &'static str) -> Arc<MockActorFactory> {
        Arc::new(MockActorFactory::new(move |_| {
            MockActor::new()
                .navigates("#create-case", ALNUM_CASE_URL)
                .with_text(caseflow::pages::common::END_STATE_CELL, rendered_state)
        }))
    }

    #[tokio::test]
    async fn test_create_case_returns_reference_first() {
        let factory = start_application_actors("Application created");
        let report = runner(&factory).run(&start_application()).await.unwrap();

        assert!(report.passed());
        let case_ref = report.case_ref().unwrap();
        let pattern =
            Regex::new(r"^[A-Za-z0-9]{4}-[A-Za-z0-9]{4}-[A-Za-z0-9]{4}-[A-Za-z0-9]{4}$").unwrap();
        assert!(pattern.is_match(case_ref.as_str()));
        assert_eq!(case_ref.as_str(), "AB12-CD34-EF56-GH78");
        assert!(factory
            .journal()
            .contains(&"fill_field:#deceasedName=Jane Doe".to_string()));
    }

    #[tokio::test]
    async fn test_create_case_run_fails_on_state_casing() {
        let factory = start_application_actors("Application Created");
        let report = runner(&factory).run_scenario(&start_application()).await;

        assert!(!report.passed());
        let failure = report.failure().unwrap();
        assert_eq!(failure.index, 4);
        assert_eq!(failure.step, "see_end_state");
        assert_eq!(
            failure.case_ref.as_ref().map(CaseReference::as_str),
            Some("AB12-CD34-EF56-GH78")
        );
    }

    #[tokio::test]
    async fn test_end_state_casing_fails_the_scenario() {
        let factory = Arc::new(MockActorFactory::new(|_| {
            MockActor::new()
                .navigates("#submit", CASE_URL)
                .with_text(caseflow::pages::common::END_STATE_CELL, "Application Created")
        }));
        let report = runner(&factory)
            .run_scenario(&create_application())
            .await;

        let failure = report.failure().unwrap();
        assert_eq!(failure.index, 4);
        assert_eq!(failure.step, "see_end_state");
        assert!(!failure.timed_out);
    }

    #[tokio::test]
    async fn test_failure_stops_later_steps() {
        let factory = Arc::new(MockActorFactory::new(|_| {
            MockActor::new().fail_on("fill_field:#deceasedName", 1)
        }));
        let report = runner(&factory)
            .run_scenario(&create_application())
            .await;

        let attempt = &report.attempts[0];
        let statuses: Vec<_> = attempt.steps.iter().map(|s| s.status).collect();
        assert_eq!(
            statuses,
            vec![
                StepStatus::Passed,
                StepStatus::Failed,
                StepStatus::Skipped,
                StepStatus::Skipped,
                StepStatus::Skipped,
            ]
        );
        let journal = factory.journal();
        assert_eq!(journal.iter().filter(|e| *e == "click:#create-case").count(), 1);
        assert!(!journal.iter().any(|e| e.starts_with("wait_for_navigation")));
    }

    #[tokio::test]
    async fn test_retries_never_leak_case_reference() {
        let urls = [
            "https://bo.test/cases/case-details/1111222233334444",
            "https://bo.test/cases/case-details/5555666677778888",
        ];
        let factory = Arc::new(MockActorFactory::new(move |session| {
            let actor = MockActor::new().at(urls[session as usize % 2]);
            if session == 0 {
                actor.fail_on("click:#confirm", 1)
            } else {
                actor
            }
        }));
        let scenario = Scenario::new("search")
            .capture_case_ref()
            .step_with(
                "search_case",
                StepArgs::new().with("reference", format!("${{{VAR_CASE_REF}}}")),
            )
            .retries(1);

        let report = runner(&factory).run(&scenario).await.unwrap();

        assert_eq!(report.attempts.len(), 2);
        assert_eq!(
            report.attempts[0].case_ref,
            Some(CaseReference::parse("1111222233334444").unwrap())
        );
        assert_eq!(
            report.case_ref(),
            Some(&CaseReference::parse("5555666677778888").unwrap())
        );
        let searches: Vec<_> = factory
            .journal()
            .into_iter()
            .filter(|e| e.starts_with("fill_field:#search"))
            .collect();
        assert_eq!(
            searches,
            vec![
                "fill_field:#search=1111-2222-3333-4444",
                "fill_field:#search=5555-6666-7777-8888",
            ]
        );
    }

    #[tokio::test]
    async fn test_invalid_scenario_never_opens_a_session() {
        let factory = Arc::new(MockActorFactory::new(|_| MockActor::new()));
        let scenario = Scenario::new("no check").step("create_case").step("submit");
        let err = runner(&factory).run(&scenario).await.unwrap_err();
        assert!(matches!(err, CaseflowError::InvalidScenario { index: 2, .. }));
        assert_eq!(factory.sessions_opened(), 0);
    }
}

// ============================================================================
// Feature files
// ============================================================================

mod feature_file_tests {
    use super::*;

    fn feature_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../demos/features")
    }

    #[test]
    fn test_demo_features_validate() {
        let registry = standard_registry().unwrap();
        let config = CaseflowConfig::default();
        let mut seen = 0;
        for entry in std::fs::read_dir(feature_dir()).unwrap() {
            let path = entry.unwrap().path();
            if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }
            let feature = FeatureDefinition::load(&path).unwrap().resolve(&config);
            feature
                .validate(&registry)
                .unwrap_or_else(|e| panic!("{}: {e}", path.display()));
            seen += 1;
        }
        assert!(seen >= 3);
    }

    #[test]
    fn test_grant_demo_fills_case_pages_before_submitting() {
        let config = CaseflowConfig::default();
        let feature = FeatureDefinition::load(&feature_dir().join("grant_of_probate.yaml"))
            .unwrap()
            .resolve(&config);
        let steps: Vec<&str> = feature.scenarios[0]
            .steps
            .iter()
            .map(|s| s.step.as_str())
            .collect();
        let submit = steps.iter().position(|s| *s == "check_my_answers").unwrap();
        let pages = steps[..submit]
            .iter()
            .filter(|s| **s == "fill_case_page")
            .count();
        assert!(pages >= 1);
    }

    #[tokio::test]
    async fn test_feature_from_yaml_runs() {
        let yaml = r#"
feature: Mock caseworker flow
retries: 1
scenarios:
  - name: Create and check
    steps:
      - step: create_case
      - step: fill_deceased_details
        args: { name: "Jane Doe" }
      - step: submit
      - step: see_end_state
        args: { state: "Application created" }
      - step: get_case_ref_from_url
        capture: reference
      - step: log_info
        args: { message: "created ${reference}" }
"#;
        let feature = FeatureDefinition::from_yaml_str(yaml)
            .unwrap()
            .resolve(&config());
        let factory = Arc::new(MockActorFactory::new(|_| {
            MockActor::new()
                .navigates("#submit", CASE_URL)
                .with_text(caseflow::pages::common::END_STATE_CELL, "Application created")
        }));
        let report = FeatureRunner::new(runner(&factory))
            .run_feature(&feature)
            .await
            .unwrap();
        assert!(report.passed());
        assert_eq!(report.attempts.len(), 1);
    }
}
