//! Result and error types for caseflow.
//!
//! Errors fall into the layers they come from:
//!
//! - **Registration**: duplicate or malformed step names, surfaced while the
//!   registry is built and before any scenario runs.
//! - **Precondition / timeout**: an awaited UI condition never occurred.
//! - **Assertion**: the application rendered something other than expected.
//! - **Exhaustion**: a scenario or feature ran out of retries.

use crate::runner::StepFailure;
use thiserror::Error;

/// Result type for caseflow operations
pub type CaseflowResult<T> = Result<T, CaseflowError>;

/// Errors that can occur in caseflow
#[derive(Debug, Error)]
pub enum CaseflowError {
    /// Two fragments registered under the same name
    #[error("Step '{name}' registered twice (first in '{first}', again in '{second}')")]
    DuplicateStep {
        /// Colliding step name
        name: String,
        /// Area of the first registration
        first: String,
        /// Area of the second registration
        second: String,
    },

    /// Step name is empty or not an identifier
    #[error("Invalid step name '{name}': {reason}")]
    InvalidStepName {
        /// Offending name
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// No fragment registered under this name
    #[error("Unknown step '{name}'")]
    UnknownStep {
        /// Requested step name
        name: String,
    },

    /// Caller asked a step for a result kind it does not produce
    #[error("Step '{name}' is {actual}, but was used as {expected}")]
    StepKindMismatch {
        /// Step name
        name: String,
        /// Kind the caller expected
        expected: String,
        /// Kind the step declares
        actual: String,
    },

    /// Scenario definition is malformed
    #[error("Invalid scenario '{scenario}' at step #{index}: {message}")]
    InvalidScenario {
        /// Scenario name
        scenario: String,
        /// One-based step position
        index: usize,
        /// Error message
        message: String,
    },

    /// Required step argument missing
    #[error("Missing argument '{key}'")]
    MissingArgument {
        /// Argument key
        key: String,
    },

    /// Step argument present but of the wrong shape
    #[error("Invalid argument '{key}': {message}")]
    InvalidArgument {
        /// Argument key
        key: String,
        /// Error message
        message: String,
    },

    /// A step needed the case reference before one was captured
    #[error("No case reference captured yet")]
    MissingCaseReference,

    /// Text could not be read as a case reference
    #[error("Invalid case reference '{value}'")]
    InvalidCaseReference {
        /// Offending text
        value: String,
    },

    /// Awaited UI condition did not occur in time
    #[error("Timed out after {ms}ms waiting for {condition}")]
    Timeout {
        /// What was awaited
        condition: String,
        /// Timeout in milliseconds
        ms: u64,
    },

    /// Element lookup failed
    #[error("Element not found: {selector}")]
    ElementNotFound {
        /// Selector used
        selector: String,
    },

    /// Element expected to be absent was found
    #[error("Element unexpectedly present: {selector}")]
    ElementPresent {
        /// Selector used
        selector: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    NavigationError {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Rendered case state differs from the expected end state
    #[error("Expected case state '{expected}', found '{actual}'")]
    StateMismatch {
        /// Expected end-state token
        expected: String,
        /// Rendered state
        actual: String,
    },

    /// Assertion failed
    #[error("Assertion failed: {message}")]
    AssertionFailed {
        /// Error message
        message: String,
    },

    /// Browser launch or session error
    #[error("Browser error: {message}")]
    BrowserError {
        /// Error message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Scenario-level retries exhausted
    #[error("Scenario '{scenario}' failed after {attempts} attempt(s): {failure}")]
    ScenarioExhausted {
        /// Scenario name
        scenario: String,
        /// Attempts made
        attempts: u32,
        /// Failure of the last attempt
        failure: Box<StepFailure>,
    },

    /// Feature-level retries exhausted
    #[error("Feature '{feature}' failed after {attempts} attempt(s) in scenario '{scenario}': {failure}")]
    FeatureExhausted {
        /// Feature name
        feature: String,
        /// Attempts made
        attempts: u32,
        /// Failing scenario of the last attempt
        scenario: String,
        /// Failure of the last attempt
        failure: Box<StepFailure>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl CaseflowError {
    /// Create an assertion error
    #[must_use]
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::AssertionFailed {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a browser error
    #[must_use]
    pub fn browser(message: impl Into<String>) -> Self {
        Self::BrowserError {
            message: message.into(),
        }
    }

    /// Create a timeout error
    #[must_use]
    pub fn timeout(condition: impl Into<String>, timeout: std::time::Duration) -> Self {
        Self::Timeout {
            condition: condition.into(),
            ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// True for errors raised while building the registry
    #[must_use]
    pub const fn is_registration(&self) -> bool {
        matches!(
            self,
            Self::DuplicateStep { .. } | Self::InvalidStepName { .. }
        )
    }

    /// True when an awaited condition never happened
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// True when the application behaved unexpectedly
    #[must_use]
    pub const fn is_assertion(&self) -> bool {
        matches!(
            self,
            Self::AssertionFailed { .. }
                | Self::StateMismatch { .. }
                | Self::ElementPresent { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_duplicate_step_message_names_both_areas() {
        let err = CaseflowError::DuplicateStep {
            name: "sign_in".into(),
            first: "idam".into(),
            second: "share_case".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("sign_in"));
        assert!(msg.contains("idam"));
        assert!(msg.contains("share_case"));
        assert!(err.is_registration());
    }

    #[test]
    fn test_timeout_helper() {
        let err = CaseflowError::timeout("text 'Sign in'", Duration::from_secs(2));
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "Timed out after 2000ms waiting for text 'Sign in'");
    }

    #[test]
    fn test_state_mismatch_is_assertion() {
        let err = CaseflowError::StateMismatch {
            expected: "Case created".into(),
            actual: "Case Created".into(),
        };
        assert!(err.is_assertion());
        assert!(!err.is_timeout());
    }
}
