//! Caseflow: step registry and scenario runner for back-office e2e suites
//!
//! A suite is a set of features, each a set of scenarios, each an ordered
//! list of named step invocations. Steps are page fragments registered in a
//! [`StepRegistry`] under unique names; a [`ScenarioRunner`] resolves the
//! names, drives an [`Actor`] through them and retries failed scenarios.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    CASEFLOW Architecture                        │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Feature    │    │ Scenario   │    │ Actor      │            │
//! │   │ (YAML /    │───►│ Runner +   │───►│ (chromium  │            │
//! │   │  builder)  │    │ Registry   │    │  or mock)  │            │
//! │   └────────────┘    └────────────┘    └────────────┘            │
//! │         │                 │                                     │
//! │         ▼                 ▼                                     │
//! │   ┌────────────┐    ┌────────────┐                              │
//! │   │ Validation │    │ Reporter   │                              │
//! │   │ (names,    │    │ JSON/HTML/ │                              │
//! │   │  states)   │    │ JUnit      │                              │
//! │   └────────────┘    └────────────┘                              │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use caseflow::{pages, Scenario, StepArgs};
//!
//! let registry = pages::standard_registry().unwrap();
//! let scenario = Scenario::new("Grant of probate - create case")
//!     .step_with("authenticate_with_idam", StepArgs::new().with("role", "caseworker"))
//!     .step("select_new_case")
//!     .step_with(
//!         "select_case_type_options",
//!         StepArgs::new()
//!             .with("case_type", "Grant of representation")
//!             .with("event", "Apply for probate"),
//!     )
//!     .step("enter_event_summary")
//!     .expect_state("Case created")
//!     .capture_case_ref();
//! assert!(scenario.validate(&registry).is_ok());
//! ```

// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]
#![cfg_attr(test, allow(clippy::large_stack_frames))]

mod actor;
#[allow(clippy::missing_errors_doc)]
mod browser;
mod case;
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
mod config;
#[allow(clippy::missing_errors_doc)]
pub mod pages;
mod registry;
mod reporter;
mod result;
mod runner;
mod scenario;
mod session;

pub use actor::{Actor, ActorFactory, Journal, MockActor, MockActorFactory, Screenshot};
#[cfg(feature = "browser")]
pub use browser::{ChromiumActor, ChromiumActorFactory};
pub use browser::{BrowserConfig, POLL_INTERVAL};
pub use case::{CaseReference, EndState};
pub use config::{
    CaseflowConfig, Credentials, Delays, Flags, Retries, Role, Timeouts, Users,
};
pub use registry::{
    RegistryBuilder, StepArgs, StepContext, StepDescriptor, StepFragment, StepKind, StepModule,
    StepName, StepOutcome, StepRegistry,
};
pub use reporter::{ReportPaths, Reporter};
pub use result::{CaseflowError, CaseflowResult};
pub use runner::{
    AttemptReport, FailureMode, FeatureAttempt, FeatureReport, FeatureRunner, ScenarioReport,
    ScenarioRunner, StepFailure, StepRecord, StepStatus,
};
pub use scenario::{
    Feature, FeatureDefinition, Invocation, Scenario, ScenarioDefinition, CASE_REF_STEP,
    END_STATE_STEP,
};
pub use session::{
    is_builtin_var, Session, BUILTIN_VARS, VAR_CASE_REF, VAR_CASE_REF_COMPACT, VAR_TODAY, VAR_UNIQUE,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::actor::{Actor, ActorFactory, MockActor, MockActorFactory};
    pub use super::config::{CaseflowConfig, Role};
    pub use super::pages::{standard_modules, standard_registry};
    pub use super::registry::{
        StepArgs, StepContext, StepFragment, StepKind, StepModule, StepOutcome, StepRegistry,
    };
    pub use super::reporter::Reporter;
    pub use super::result::{CaseflowError, CaseflowResult};
    pub use super::runner::{FailureMode, FeatureRunner, ScenarioRunner};
    pub use super::scenario::{Feature, FeatureDefinition, Invocation, Scenario};
}
