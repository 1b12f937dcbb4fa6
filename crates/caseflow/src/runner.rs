//! Scenario and feature runner with retries.
//!
//! Steps run strictly in order on one actor per attempt. The first failing
//! step ends the attempt: the actor's failure hook captures the page, later
//! steps never run, and the attempt reports the failing step's position, name
//! and the case reference captured so far.
//!
//! Retries always restart from the first step with a fresh actor and a fresh
//! [`Session`]. A scenario that exhausts its own retries fails the feature
//! attempt; the feature then re-runs every scenario from the top until its
//! budget is spent as well.

use crate::actor::{ActorFactory, Screenshot};
use crate::case::CaseReference;
use crate::config::CaseflowConfig;
use crate::registry::StepRegistry;
use crate::result::{CaseflowError, CaseflowResult};
use crate::scenario::{Feature, Scenario};
use crate::session::Session;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// What happens when a scenario exhausts its retries
///
/// Andon Cord: stop the feature attempt at the first exhausted scenario
/// CollectAll: run the remaining scenarios anyway and report every failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
    /// Stop on first failure
    #[default]
    AndonCord,
    /// Collect all failures
    CollectAll,
}

/// Step result status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Passed,
    Failed,
    /// Not run because an earlier step failed
    Skipped,
}

/// The failing step of an attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepFailure {
    /// One-based position in the scenario; 0 when the session never opened
    pub index: usize,
    /// Step name
    pub step: String,
    /// Case reference captured before the failure
    pub case_ref: Option<CaseReference>,
    /// Rendered error
    pub error: String,
    /// True when an awaited condition never happened
    pub timed_out: bool,
    /// Page capture taken before the failure propagated
    #[serde(skip)]
    pub screenshot: Option<Screenshot>,
}

impl StepFailure {
    fn new(index: usize, step: &str, case_ref: Option<CaseReference>, err: &CaseflowError) -> Self {
        Self {
            index,
            step: step.to_string(),
            case_ref,
            error: err.to_string(),
            timed_out: err.is_timeout(),
            screenshot: None,
        }
    }
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step #{} '{}'", self.index, self.step)?;
        if let Some(case_ref) = &self.case_ref {
            write!(f, " (case {case_ref})")?;
        }
        write!(f, ": {}", self.error)
    }
}

/// One step of one attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub index: usize,
    pub step: String,
    pub status: StepStatus,
    pub duration_ms: u64,
}

/// One run of a scenario from its first step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptReport {
    /// One-based attempt number
    pub attempt: u32,
    pub steps: Vec<StepRecord>,
    pub case_ref: Option<CaseReference>,
    pub failure: Option<StepFailure>,
    pub duration_ms: u64,
}

impl AttemptReport {
    #[must_use]
    pub const fn passed(&self) -> bool {
        self.failure.is_none()
    }
}

/// Every attempt of one scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub name: String,
    pub attempts: Vec<AttemptReport>,
}

impl ScenarioReport {
    /// Whether the final attempt passed
    #[must_use]
    pub fn passed(&self) -> bool {
        self.attempts.last().is_some_and(AttemptReport::passed)
    }

    /// Failure of the final attempt
    #[must_use]
    pub fn failure(&self) -> Option<&StepFailure> {
        self.attempts.last().and_then(|a| a.failure.as_ref())
    }

    /// Case reference of the final attempt
    #[must_use]
    pub fn case_ref(&self) -> Option<&CaseReference> {
        self.attempts.last().and_then(|a| a.case_ref.as_ref())
    }

    /// `Err(ScenarioExhausted)` unless the final attempt passed
    pub fn into_result(self) -> CaseflowResult<Self> {
        match self.failure() {
            None => Ok(self),
            Some(failure) => Err(CaseflowError::ScenarioExhausted {
                scenario: self.name.clone(),
                attempts: u32::try_from(self.attempts.len()).unwrap_or(u32::MAX),
                failure: Box::new(failure.clone()),
            }),
        }
    }
}

/// One run of a feature from its first scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureAttempt {
    pub attempt: u32,
    pub scenarios: Vec<ScenarioReport>,
    pub passed: bool,
}

/// Every attempt of one feature
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureReport {
    pub name: String,
    pub attempts: Vec<FeatureAttempt>,
    pub duration_ms: u64,
}

impl FeatureReport {
    /// Whether the final attempt passed
    #[must_use]
    pub fn passed(&self) -> bool {
        self.attempts.last().is_some_and(|a| a.passed)
    }

    /// Scenario reports of the final attempt
    #[must_use]
    pub fn final_scenarios(&self) -> &[ScenarioReport] {
        self.attempts
            .last()
            .map(|a| a.scenarios.as_slice())
            .unwrap_or_default()
    }

    /// `Err(FeatureExhausted)` unless the final attempt passed
    pub fn into_result(self) -> CaseflowResult<Self> {
        if self.passed() {
            return Ok(self);
        }
        let failed = self.final_scenarios().iter().find(|s| !s.passed());
        let (scenario, failure) = match failed.and_then(|s| s.failure().map(|f| (s, f))) {
            Some((s, f)) => (s.name.clone(), f.clone()),
            None => (
                String::new(),
                StepFailure::new(0, "", None, &CaseflowError::assertion("feature did not run")),
            ),
        };
        Err(CaseflowError::FeatureExhausted {
            feature: self.name.clone(),
            attempts: u32::try_from(self.attempts.len()).unwrap_or(u32::MAX),
            scenario,
            failure: Box::new(failure),
        })
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Runs scenarios with scenario-level retries
#[derive(Clone)]
pub struct ScenarioRunner {
    registry: Arc<StepRegistry>,
    config: Arc<CaseflowConfig>,
    actors: Arc<dyn ActorFactory>,
    step_timeout: Duration,
}

impl fmt::Debug for ScenarioRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScenarioRunner")
            .field("steps", &self.registry.len())
            .field("step_timeout", &self.step_timeout)
            .finish_non_exhaustive()
    }
}

impl ScenarioRunner {
    /// Create a runner; the step timeout defaults to the configured one
    #[must_use]
    pub fn new(
        registry: Arc<StepRegistry>,
        config: Arc<CaseflowConfig>,
        actors: Arc<dyn ActorFactory>,
    ) -> Self {
        let step_timeout = config.timeouts.step();
        Self {
            registry,
            config,
            actors,
            step_timeout,
        }
    }

    /// Override the per-step ceiling
    #[must_use]
    pub const fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = timeout;
        self
    }

    #[must_use]
    pub fn registry(&self) -> &StepRegistry {
        &self.registry
    }

    /// Run the scenario once, stopping at the first failing step
    pub async fn run_once(&self, scenario: &Scenario, attempt: u32) -> AttemptReport {
        let started = Instant::now();
        info!(scenario = %scenario.name, attempt, "scenario attempt started");

        let mut actor = match self.actors.open().await {
            Ok(actor) => actor,
            Err(err) => {
                warn!(scenario = %scenario.name, attempt, error = %err, "could not open session");
                return AttemptReport {
                    attempt,
                    steps: Vec::new(),
                    case_ref: None,
                    failure: Some(StepFailure::new(0, "open_session", None, &err)),
                    duration_ms: elapsed_ms(started),
                };
            }
        };

        let mut steps = Vec::with_capacity(scenario.steps.len());
        let mut failure = None;
        let case_ref = {
            let mut session =
                Session::new(&self.registry, &self.config, &scenario.name, actor.as_mut());

            for (i, invocation) in scenario.steps.iter().enumerate() {
                let index = i + 1;
                let step_started = Instant::now();
                debug!(scenario = %scenario.name, index, step = %invocation.step, "step started");

                let result =
                    match tokio::time::timeout(self.step_timeout, session.execute(invocation)).await
                    {
                        Ok(result) => result.map(|_| ()),
                        Err(_) => Err(CaseflowError::timeout(
                            format!("step '{}'", invocation.step),
                            self.step_timeout,
                        )),
                    };

                let status = if result.is_ok() {
                    StepStatus::Passed
                } else {
                    StepStatus::Failed
                };
                steps.push(StepRecord {
                    index,
                    step: invocation.step.clone(),
                    status,
                    duration_ms: elapsed_ms(step_started),
                });

                if let Err(err) = result {
                    warn!(
                        scenario = %scenario.name,
                        attempt,
                        index,
                        step = %invocation.step,
                        error = %err,
                        "step failed"
                    );
                    let label = format!("{}-attempt{attempt}-step{index}", scenario.name);
                    let mut step_failure =
                        StepFailure::new(index, &invocation.step, session.case_ref().cloned(), &err);
                    step_failure.screenshot = session.actor().capture_failure(&label).await;
                    failure = Some(step_failure);
                    break;
                }
            }

            steps.extend(
                scenario
                    .steps
                    .iter()
                    .enumerate()
                    .skip(steps.len())
                    .map(|(i, invocation)| StepRecord {
                        index: i + 1,
                        step: invocation.step.clone(),
                        status: StepStatus::Skipped,
                        duration_ms: 0,
                    }),
            );
            session.case_ref().cloned()
        };

        if let Err(err) = actor.close().await {
            warn!(scenario = %scenario.name, error = %err, "closing session failed");
        }

        let report = AttemptReport {
            attempt,
            steps,
            case_ref,
            failure,
            duration_ms: elapsed_ms(started),
        };
        if report.passed() {
            info!(scenario = %scenario.name, attempt, duration_ms = report.duration_ms, "scenario attempt passed");
        }
        report
    }

    /// Run with the scenario's retry budget
    pub async fn run_scenario(&self, scenario: &Scenario) -> ScenarioReport {
        let total = scenario.retries.saturating_add(1);
        let mut attempts = Vec::new();
        for attempt in 1..=total {
            let report = self.run_once(scenario, attempt).await;
            let passed = report.passed();
            attempts.push(report);
            if passed {
                break;
            }
            if attempt < total {
                warn!(scenario = %scenario.name, attempt, remaining = total - attempt, "retrying scenario");
            } else {
                error!(scenario = %scenario.name, attempts = total, "scenario retries exhausted");
            }
        }
        ScenarioReport {
            name: scenario.name.clone(),
            attempts,
        }
    }

    /// Run with retries; `Err(ScenarioExhausted)` if every attempt failed
    pub async fn run(&self, scenario: &Scenario) -> CaseflowResult<ScenarioReport> {
        scenario.validate(&self.registry)?;
        self.run_scenario(scenario).await.into_result()
    }
}

/// Runs features with feature-level retries, several features at a time
#[derive(Debug, Clone)]
pub struct FeatureRunner {
    scenarios: ScenarioRunner,
    mode: FailureMode,
    workers: usize,
}

impl FeatureRunner {
    /// One feature at a time, Andon-cord failure mode
    #[must_use]
    pub const fn new(scenarios: ScenarioRunner) -> Self {
        Self {
            scenarios,
            mode: FailureMode::AndonCord,
            workers: 1,
        }
    }

    /// Set failure mode
    #[must_use]
    pub const fn with_failure_mode(mut self, mode: FailureMode) -> Self {
        self.mode = mode;
        self
    }

    /// Number of features run concurrently, each on its own actors
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    async fn execute(&self, feature: &Feature) -> FeatureReport {
        let started = Instant::now();
        let total = feature.retries.saturating_add(1);
        let mut attempts = Vec::new();
        info!(feature = %feature.name, scenarios = feature.scenarios.len(), "feature started");

        for attempt in 1..=total {
            let mut reports = Vec::with_capacity(feature.scenarios.len());
            for scenario in &feature.scenarios {
                let report = self.scenarios.run_scenario(scenario).await;
                let failed = !report.passed();
                reports.push(report);
                if failed && self.mode == FailureMode::AndonCord {
                    break;
                }
            }
            let passed =
                reports.len() == feature.scenarios.len() && reports.iter().all(ScenarioReport::passed);
            attempts.push(FeatureAttempt {
                attempt,
                scenarios: reports,
                passed,
            });
            if passed {
                info!(feature = %feature.name, attempt, "feature passed");
                break;
            }
            if attempt < total {
                warn!(feature = %feature.name, attempt, remaining = total - attempt, "retrying feature from the top");
            } else {
                error!(feature = %feature.name, attempts = total, "feature retries exhausted");
            }
        }

        FeatureReport {
            name: feature.name.clone(),
            attempts,
            duration_ms: elapsed_ms(started),
        }
    }

    /// Validate and run one feature
    pub async fn run_feature(&self, feature: &Feature) -> CaseflowResult<FeatureReport> {
        feature.validate(self.scenarios.registry())?;
        Ok(self.execute(feature).await)
    }

    /// Validate every feature, then run them `workers` at a time.
    ///
    /// Reports come back in input order.
    pub async fn run_all(&self, features: &[Feature]) -> CaseflowResult<Vec<FeatureReport>> {
        for feature in features {
            feature.validate(self.scenarios.registry())?;
        }
        Ok(stream::iter(features)
            .map(|feature| self.execute(feature))
            .buffered(self.workers)
            .collect::<Vec<_>>()
            .await)
    }
}
