//! Step registry: one flat, audited mapping from step name to fragment.
//!
//! Fragments are declared in nested [`StepModule`]s grouped by feature area
//! and merged once by [`StepRegistry::build`]. A name registered twice fails
//! the build and names both areas, so collisions never surface mid-run.
//! After the build the registry is immutable and shared behind an `Arc`.

use crate::actor::Actor;
use crate::case::CaseReference;
use crate::config::CaseflowConfig;
use crate::result::{CaseflowError, CaseflowResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Validated step name.
///
/// ASCII identifier: a letter first, then letters, digits or underscores.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StepName(String);

impl StepName {
    /// Validate a name
    pub fn new(name: impl Into<String>) -> CaseflowResult<Self> {
        let name = name.into();
        let reason = match name.chars().next() {
            None => Some("name is empty"),
            Some(first) if !first.is_ascii_alphabetic() => Some("must start with a letter"),
            Some(_) if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') => {
                Some("only letters, digits and '_' are allowed")
            }
            Some(_) => None,
        };
        match reason {
            Some(reason) => Err(CaseflowError::InvalidStepName {
                name,
                reason: reason.to_string(),
            }),
            None => Ok(Self(name)),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for StepName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for StepName {
    type Error = CaseflowError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<StepName> for String {
    fn from(value: StepName) -> Self {
        value.0
    }
}

/// What a step does to the case, and what it returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Drives the UI without changing case state
    #[default]
    Action,
    /// Moves the case to a new lifecycle state
    Transition,
    /// Asserts the rendered case state
    StateCheck,
    /// Returns the case reference
    ExtractCaseReference,
    /// Returns a piece of page text
    ExtractText,
}

impl StepKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Action => "action",
            Self::Transition => "transition",
            Self::StateCheck => "state_check",
            Self::ExtractCaseReference => "extract_case_reference",
            Self::ExtractText => "extract_text",
        }
    }

    /// True for kinds that return a value
    #[must_use]
    pub const fn returns_value(self) -> bool {
        matches!(self, Self::ExtractCaseReference | Self::ExtractText)
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value produced by a step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Nothing returned
    Done,
    /// Case reference captured from the page
    CaseReference(CaseReference),
    /// Text read from the page
    Text(String),
}

impl StepOutcome {
    /// Whether this outcome is what a step of `kind` must return
    #[must_use]
    pub const fn matches(&self, kind: StepKind) -> bool {
        match self {
            Self::Done => !kind.returns_value(),
            Self::CaseReference(_) => matches!(kind, StepKind::ExtractCaseReference),
            Self::Text(_) => matches!(kind, StepKind::ExtractText),
        }
    }

    const fn label(&self) -> &'static str {
        match self {
            Self::Done => "nothing",
            Self::CaseReference(_) => "a case reference",
            Self::Text(_) => "text",
        }
    }
}

/// Named step arguments.
///
/// Values are JSON so that YAML feature files and Rust builders share one
/// representation. Strings may carry `${var}` placeholders, replaced per
/// attempt by [`StepArgs::substitute`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepArgs(BTreeMap<String, Value>);

impl StepArgs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an argument
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let _ = self.0.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Required string argument
    pub fn str(&self, key: &str) -> CaseflowResult<&str> {
        match self.0.get(key) {
            None | Some(Value::Null) => Err(CaseflowError::MissingArgument {
                key: key.to_string(),
            }),
            Some(Value::String(s)) => Ok(s),
            Some(other) => Err(invalid(key, format!("expected a string, got {other}"))),
        }
    }

    /// Optional string argument
    pub fn opt_str(&self, key: &str) -> CaseflowResult<Option<&str>> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(_) => self.str(key).map(Some),
        }
    }

    /// Boolean argument with a default. Accepts `"true"`/`"false"` strings.
    pub fn bool_or(&self, key: &str, default: bool) -> CaseflowResult<bool> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(default),
            Some(Value::Bool(b)) => Ok(*b),
            Some(Value::String(s)) => s
                .parse()
                .map_err(|_| invalid(key, format!("expected a boolean, got '{s}'"))),
            Some(other) => Err(invalid(key, format!("expected a boolean, got {other}"))),
        }
    }

    /// Integer argument with a default. Accepts numeric strings.
    pub fn u64_or(&self, key: &str, default: u64) -> CaseflowResult<u64> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(default),
            Some(Value::Number(n)) => n
                .as_u64()
                .ok_or_else(|| invalid(key, format!("expected a non-negative integer, got {n}"))),
            Some(Value::String(s)) => s
                .parse()
                .map_err(|_| invalid(key, format!("expected an integer, got '{s}'"))),
            Some(other) => Err(invalid(key, format!("expected an integer, got {other}"))),
        }
    }

    /// Duration given in seconds, with a default
    pub fn duration_or(&self, key: &str, default: Duration) -> CaseflowResult<Duration> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(default),
            Some(_) => self.u64_or(key, 0).map(Duration::from_secs),
        }
    }

    /// String-to-string map argument, e.g. expected field values
    pub fn map(&self, key: &str) -> CaseflowResult<BTreeMap<String, String>> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(BTreeMap::new()),
            Some(Value::Object(entries)) => entries
                .iter()
                .map(|(k, v)| match v {
                    Value::String(s) => Ok((k.clone(), s.clone())),
                    Value::Number(_) | Value::Bool(_) => Ok((k.clone(), v.to_string())),
                    _ => Err(invalid(key, format!("entry '{k}' must be a scalar"))),
                })
                .collect(),
            Some(other) => Err(invalid(key, format!("expected a map, got {other}"))),
        }
    }

    /// List-of-strings argument
    pub fn list(&self, key: &str) -> CaseflowResult<Vec<String>> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| match v {
                    Value::String(s) => Ok(s.clone()),
                    other => Err(invalid(key, format!("list entries must be strings, got {other}"))),
                })
                .collect(),
            Some(other) => Err(invalid(key, format!("expected a list, got {other}"))),
        }
    }

    /// Copy with every `${name}` placeholder in string values replaced.
    ///
    /// Unknown placeholders are an error rather than left in place, so a
    /// typo never reaches the UI as literal text.
    pub fn substitute(&self, vars: &BTreeMap<String, String>) -> CaseflowResult<Self> {
        self.0
            .iter()
            .map(|(k, v)| Ok((k.clone(), substitute_value(k, v, vars)?)))
            .collect::<CaseflowResult<BTreeMap<_, _>>>()
            .map(Self)
    }
}

fn invalid(key: &str, message: String) -> CaseflowError {
    CaseflowError::InvalidArgument {
        key: key.to_string(),
        message,
    }
}

fn substitute_value(
    key: &str,
    value: &Value,
    vars: &BTreeMap<String, String>,
) -> CaseflowResult<Value> {
    Ok(match value {
        Value::String(s) => Value::String(substitute_str(key, s, vars)?),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|v| substitute_value(key, v, vars))
                .collect::<CaseflowResult<_>>()?,
        ),
        Value::Object(entries) => Value::Object(
            entries
                .iter()
                .map(|(k, v)| Ok((k.clone(), substitute_value(key, v, vars)?)))
                .collect::<CaseflowResult<_>>()?,
        ),
        other => other.clone(),
    })
}

fn substitute_str(key: &str, input: &str, vars: &BTreeMap<String, String>) -> CaseflowResult<String> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find('}')
            .ok_or_else(|| invalid(key, format!("unterminated placeholder in '{input}'")))?;
        let name = &after[..end];
        let value = vars
            .get(name)
            .ok_or_else(|| invalid(key, format!("unknown placeholder '${{{name}}}'")))?;
        out.push_str(value);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Read-only context handed to every fragment call
#[derive(Clone, Copy)]
pub struct StepContext<'a> {
    /// Suite configuration
    pub config: &'a CaseflowConfig,
    /// Name of the running scenario
    pub scenario: &'a str,
    case_ref: Option<&'a CaseReference>,
    registry: &'a StepRegistry,
}

impl fmt::Debug for StepContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepContext")
            .field("scenario", &self.scenario)
            .field("case_ref", &self.case_ref)
            .finish_non_exhaustive()
    }
}

impl<'a> StepContext<'a> {
    /// Create a context
    #[must_use]
    pub const fn new(
        config: &'a CaseflowConfig,
        scenario: &'a str,
        case_ref: Option<&'a CaseReference>,
        registry: &'a StepRegistry,
    ) -> Self {
        Self {
            config,
            scenario,
            case_ref,
            registry,
        }
    }

    /// Case reference captured earlier in this attempt
    pub fn case_ref(&self) -> CaseflowResult<&'a CaseReference> {
        self.case_ref.ok_or(CaseflowError::MissingCaseReference)
    }

    /// Run another registered step with the same actor and context
    pub async fn invoke(
        &self,
        actor: &mut dyn Actor,
        name: &str,
        args: &StepArgs,
    ) -> CaseflowResult<StepOutcome> {
        self.registry.invoke(actor, self, name, args).await
    }
}

/// A named workflow fragment.
///
/// Fragments borrow the actor for one call only and hold no state between
/// calls. The declared [`StepKind`] says whether [`StepFragment::run`]
/// returns a value; the runner rejects outcomes that contradict it.
#[async_trait]
pub trait StepFragment: Send + Sync {
    /// Declared kind
    fn kind(&self) -> StepKind {
        StepKind::Action
    }

    /// One-line description for step listings
    fn description(&self) -> &str {
        ""
    }

    /// Execute the fragment
    async fn run(
        &self,
        actor: &mut dyn Actor,
        ctx: &StepContext<'_>,
        args: &StepArgs,
    ) -> CaseflowResult<StepOutcome>;
}

/// Fragments of one feature area, with nested sub-areas
pub struct StepModule {
    area: String,
    steps: Vec<(String, Arc<dyn StepFragment>)>,
    children: Vec<StepModule>,
}

impl fmt::Debug for StepModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepModule")
            .field("area", &self.area)
            .field(
                "steps",
                &self.steps.iter().map(|(name, _)| name).collect::<Vec<_>>(),
            )
            .field("children", &self.children)
            .finish()
    }
}

impl StepModule {
    /// Create an empty module
    #[must_use]
    pub fn new(area: impl Into<String>) -> Self {
        Self {
            area: area.into(),
            steps: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Add a fragment
    #[must_use]
    pub fn step(mut self, name: impl Into<String>, fragment: impl StepFragment + 'static) -> Self {
        self.steps.push((name.into(), Arc::new(fragment)));
        self
    }

    /// Add an already shared fragment
    #[must_use]
    pub fn shared(mut self, name: impl Into<String>, fragment: Arc<dyn StepFragment>) -> Self {
        self.steps.push((name.into(), fragment));
        self
    }

    /// Nest a sub-area
    #[must_use]
    pub fn module(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    #[must_use]
    pub fn area(&self) -> &str {
        &self.area
    }
}

struct Entry {
    area: String,
    fragment: Arc<dyn StepFragment>,
}

/// Summary of one registered step, for listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDescriptor {
    pub name: String,
    pub area: String,
    pub kind: StepKind,
    pub description: String,
}

/// Incremental registry construction
#[derive(Default)]
pub struct RegistryBuilder {
    steps: BTreeMap<StepName, Entry>,
}

impl fmt::Debug for RegistryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryBuilder")
            .field("steps", &self.steps.len())
            .finish()
    }
}

impl RegistryBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one fragment; fails if the name is taken or malformed
    pub fn register(
        &mut self,
        area: &str,
        name: &str,
        fragment: Arc<dyn StepFragment>,
    ) -> CaseflowResult<&mut Self> {
        let name = StepName::new(name)?;
        if let Some(existing) = self.steps.get(name.as_str()) {
            return Err(CaseflowError::DuplicateStep {
                name: name.0,
                first: existing.area.clone(),
                second: area.to_string(),
            });
        }
        let _ = self.steps.insert(
            name,
            Entry {
                area: area.to_string(),
                fragment,
            },
        );
        Ok(self)
    }

    /// Register a module and all of its sub-areas
    pub fn module(&mut self, module: StepModule) -> CaseflowResult<&mut Self> {
        self.module_under(None, module)?;
        Ok(self)
    }

    fn module_under(&mut self, parent: Option<&str>, module: StepModule) -> CaseflowResult<()> {
        let area = match parent {
            Some(parent) => format!("{parent}.{}", module.area),
            None => module.area,
        };
        for (name, fragment) in module.steps {
            let _ = self.register(&area, &name, fragment)?;
        }
        for child in module.children {
            self.module_under(Some(&area), child)?;
        }
        Ok(())
    }

    /// Freeze into an immutable registry
    #[must_use]
    pub fn build(self) -> StepRegistry {
        StepRegistry {
            steps: self.steps.into_iter().map(|(k, v)| (k.0, v)).collect(),
        }
    }
}

/// Immutable step registry
pub struct StepRegistry {
    steps: HashMap<String, Entry>,
}

impl fmt::Debug for StepRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepRegistry")
            .field("steps", &self.names())
            .finish()
    }
}

impl StepRegistry {
    /// Merge feature-area modules into one flat registry
    pub fn build(modules: impl IntoIterator<Item = StepModule>) -> CaseflowResult<Self> {
        let mut builder = RegistryBuilder::new();
        for module in modules {
            let _ = builder.module(module)?;
        }
        Ok(builder.build())
    }

    /// The fragment registered under `name`
    pub fn get(&self, name: &str) -> CaseflowResult<&Arc<dyn StepFragment>> {
        self.steps
            .get(name)
            .map(|e| &e.fragment)
            .ok_or_else(|| CaseflowError::UnknownStep {
                name: name.to_string(),
            })
    }

    /// Declared kind of `name`
    pub fn kind(&self, name: &str) -> CaseflowResult<StepKind> {
        self.get(name).map(|f| f.kind())
    }

    /// Area `name` was registered in
    #[must_use]
    pub fn area(&self, name: &str) -> Option<&str> {
        self.steps.get(name).map(|e| e.area.as_str())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.steps.contains_key(name)
    }

    /// Sorted step names
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.steps.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Every step, sorted by area then name
    #[must_use]
    pub fn descriptors(&self) -> Vec<StepDescriptor> {
        let mut out: Vec<StepDescriptor> = self
            .steps
            .iter()
            .map(|(name, e)| StepDescriptor {
                name: name.clone(),
                area: e.area.clone(),
                kind: e.fragment.kind(),
                description: e.fragment.description().to_string(),
            })
            .collect();
        out.sort_by(|a, b| a.area.cmp(&b.area).then_with(|| a.name.cmp(&b.name)));
        out
    }

    /// Invoke `name` and check the outcome against its declared kind
    pub async fn invoke(
        &self,
        actor: &mut dyn Actor,
        ctx: &StepContext<'_>,
        name: &str,
        args: &StepArgs,
    ) -> CaseflowResult<StepOutcome> {
        let fragment = self.get(name)?;
        let kind = fragment.kind();
        let outcome = fragment.run(actor, ctx, args).await?;
        if outcome.matches(kind) {
            Ok(outcome)
        } else {
            Err(CaseflowError::StepKindMismatch {
                name: name.to_string(),
                expected: kind.to_string(),
                actual: format!("returned {}", outcome.label()),
            })
        }
    }
}
