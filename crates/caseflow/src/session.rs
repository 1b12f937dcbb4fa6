//! Per-attempt execution context.
//!
//! A [`Session`] lives for exactly one scenario attempt. It borrows the actor
//! opened for that attempt, owns the case reference once captured, and holds
//! the substitution variables. A retry builds a new session, so nothing
//! captured by a failed attempt is visible to the next one.

use crate::actor::Actor;
use crate::case::CaseReference;
use crate::config::CaseflowConfig;
use crate::registry::{StepArgs, StepContext, StepKind, StepOutcome, StepRegistry};
use crate::result::{CaseflowError, CaseflowResult};
use crate::scenario::Invocation;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Variable holding the hyphenated case reference
pub const VAR_CASE_REF: &str = "case_ref";
/// Variable holding the case reference without hyphens
pub const VAR_CASE_REF_COMPACT: &str = "case_ref_compact";
/// Variable holding today's date as shown by the UI
pub const VAR_TODAY: &str = "today";
/// Variable unique to the attempt
pub const VAR_UNIQUE: &str = "unique";

/// Variables the session maintains itself; captures may not reuse them
pub const BUILTIN_VARS: [&str; 4] = [VAR_CASE_REF, VAR_CASE_REF_COMPACT, VAR_TODAY, VAR_UNIQUE];

/// Sessions opened by this process, keeps `unique` distinct within a millisecond
static SESSION_SEQ: AtomicU64 = AtomicU64::new(0);

/// Whether `name` is maintained by the session rather than by captures
#[must_use]
pub fn is_builtin_var(name: &str) -> bool {
    BUILTIN_VARS.contains(&name)
}

fn unique_token(millis: i64) -> String {
    let seq = SESSION_SEQ.fetch_add(1, Ordering::Relaxed) % 10_000;
    format!("{millis}{seq:04}")
}

/// Execution state of one scenario attempt
pub struct Session<'a> {
    registry: &'a StepRegistry,
    config: &'a CaseflowConfig,
    scenario: &'a str,
    actor: &'a mut dyn Actor,
    case_ref: Option<CaseReference>,
    vars: BTreeMap<String, String>,
}

impl fmt::Debug for Session<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("scenario", &self.scenario)
            .field("case_ref", &self.case_ref)
            .field("vars", &self.vars)
            .finish_non_exhaustive()
    }
}

impl<'a> Session<'a> {
    /// Start a session with the built-in variables set
    pub fn new(
        registry: &'a StepRegistry,
        config: &'a CaseflowConfig,
        scenario: &'a str,
        actor: &'a mut dyn Actor,
    ) -> Self {
        let now = chrono::Local::now();
        let vars = BTreeMap::from([
            (VAR_TODAY.to_string(), now.format("%-d %b %Y").to_string()),
            (VAR_UNIQUE.to_string(), unique_token(now.timestamp_millis())),
        ]);
        Self {
            registry,
            config,
            scenario,
            actor,
            case_ref: None,
            vars,
        }
    }

    /// Case reference captured in this attempt
    #[must_use]
    pub const fn case_ref(&self) -> Option<&CaseReference> {
        self.case_ref.as_ref()
    }

    /// Substitution variables
    #[must_use]
    pub const fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }

    /// Set a substitution variable; built-in names are refused
    pub fn set_var(&mut self, name: impl Into<String>, value: impl Into<String>) -> CaseflowResult<()> {
        let name = name.into();
        if is_builtin_var(&name) {
            return Err(CaseflowError::InvalidArgument {
                key: name,
                message: "built-in variable cannot be overwritten".to_string(),
            });
        }
        let _ = self.vars.insert(name, value.into());
        Ok(())
    }

    /// The borrowed actor, e.g. for failure capture
    pub fn actor(&mut self) -> &mut dyn Actor {
        &mut *self.actor
    }

    async fn call(&mut self, name: &str, args: &StepArgs) -> CaseflowResult<StepOutcome> {
        let ctx = StepContext::new(
            self.config,
            self.scenario,
            self.case_ref.as_ref(),
            self.registry,
        );
        self.registry.invoke(&mut *self.actor, &ctx, name, args).await
    }

    fn expect_kind(&self, name: &str, expected: &[StepKind], label: &str) -> CaseflowResult<()> {
        let kind = self.registry.kind(name)?;
        if expected.contains(&kind) {
            Ok(())
        } else {
            Err(CaseflowError::StepKindMismatch {
                name: name.to_string(),
                expected: label.to_string(),
                actual: kind.to_string(),
            })
        }
    }

    /// Run a step that returns nothing
    pub async fn perform(&mut self, name: &str, args: &StepArgs) -> CaseflowResult<()> {
        self.expect_kind(
            name,
            &[StepKind::Action, StepKind::Transition, StepKind::StateCheck],
            "a step returning nothing",
        )?;
        let _ = self.call(name, args).await?;
        Ok(())
    }

    /// Run a step that returns the case reference and keep it for the attempt
    pub async fn extract_case_reference(
        &mut self,
        name: &str,
        args: &StepArgs,
    ) -> CaseflowResult<CaseReference> {
        self.expect_kind(
            name,
            &[StepKind::ExtractCaseReference],
            StepKind::ExtractCaseReference.as_str(),
        )?;
        match self.call(name, args).await? {
            StepOutcome::CaseReference(case_ref) => {
                self.store_case_ref(case_ref.clone())?;
                Ok(case_ref)
            }
            other => Err(CaseflowError::assertion(format!(
                "'{name}' returned {other:?} instead of a case reference"
            ))),
        }
    }

    /// Run a step that returns page text
    pub async fn extract_text(&mut self, name: &str, args: &StepArgs) -> CaseflowResult<String> {
        self.expect_kind(name, &[StepKind::ExtractText], StepKind::ExtractText.as_str())?;
        match self.call(name, args).await? {
            StepOutcome::Text(text) => Ok(text),
            other => Err(CaseflowError::assertion(format!(
                "'{name}' returned {other:?} instead of text"
            ))),
        }
    }

    /// Run one scenario invocation: substitute placeholders, dispatch on the
    /// step's declared kind, store captured values.
    pub async fn execute(&mut self, invocation: &Invocation) -> CaseflowResult<StepOutcome> {
        let args = invocation.args.substitute(&self.vars)?;
        let name = invocation.step.as_str();
        let outcome = match self.registry.kind(name)? {
            StepKind::ExtractCaseReference => {
                StepOutcome::CaseReference(self.extract_case_reference(name, &args).await?)
            }
            StepKind::ExtractText => StepOutcome::Text(self.extract_text(name, &args).await?),
            StepKind::Action | StepKind::Transition | StepKind::StateCheck => {
                self.perform(name, &args).await?;
                StepOutcome::Done
            }
        };

        if let Some(var) = &invocation.capture {
            match &outcome {
                StepOutcome::CaseReference(case_ref) => self.set_var(var, case_ref.as_str())?,
                StepOutcome::Text(text) => self.set_var(var, text.clone())?,
                StepOutcome::Done => {
                    return Err(CaseflowError::InvalidArgument {
                        key: var.clone(),
                        message: format!("'{name}' returns nothing to capture"),
                    })
                }
            }
        }
        Ok(outcome)
    }

    fn store_case_ref(&mut self, case_ref: CaseReference) -> CaseflowResult<()> {
        if let Some(existing) = &self.case_ref {
            if existing != &case_ref {
                return Err(CaseflowError::assertion(format!(
                    "case reference changed from {existing} to {case_ref} within one attempt"
                )));
            }
        }
        let _ = self
            .vars
            .insert(VAR_CASE_REF.to_string(), case_ref.as_str().to_string());
        let _ = self
            .vars
            .insert(VAR_CASE_REF_COMPACT.to_string(), case_ref.compact());
        self.case_ref = Some(case_ref);
        Ok(())
    }
}
