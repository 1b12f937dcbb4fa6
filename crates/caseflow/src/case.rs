//! Case correlation types: the case reference captured after creation and
//! the end-state token asserted after every lifecycle transition.

use crate::result::{CaseflowError, CaseflowResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

const GROUP_LEN: usize = 4;
const GROUPS: usize = 4;

fn hyphenated_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9]{4}-[A-Za-z0-9]{4}-[A-Za-z0-9]{4}-[A-Za-z0-9]{4}$")
            .expect("case reference pattern is valid")
    })
}

/// Opaque case identifier, always stored as `XXXX-XXXX-XXXX-XXXX`.
///
/// Captured once per scenario attempt and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CaseReference(String);

impl CaseReference {
    /// Parse either the hyphenated form or sixteen contiguous alphanumerics.
    pub fn parse(value: &str) -> CaseflowResult<Self> {
        let trimmed = value.trim();
        if hyphenated_pattern().is_match(trimmed) {
            return Ok(Self(trimmed.to_string()));
        }

        let compact_len = GROUP_LEN * GROUPS;
        if trimmed.len() == compact_len && trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
            let groups: Vec<&str> = (0..GROUPS)
                .map(|i| &trimmed[i * GROUP_LEN..(i + 1) * GROUP_LEN])
                .collect();
            return Ok(Self(groups.join("-")));
        }

        Err(CaseflowError::InvalidCaseReference {
            value: value.to_string(),
        })
    }

    /// Extract the reference from the last path segment of a case URL.
    ///
    /// Query strings, fragments and trailing slashes are ignored, so
    /// `.../case-details/1234567812345678#History` yields `1234-5678-1234-5678`.
    pub fn from_url(url: &str) -> CaseflowResult<Self> {
        let without_fragment = url.split('#').next().unwrap_or_default();
        let path = without_fragment.split('?').next().unwrap_or_default();
        let segment = path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default();

        Self::parse(segment).map_err(|_| CaseflowError::InvalidCaseReference {
            value: url.to_string(),
        })
    }

    /// Hyphenated form
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Form without hyphens, as used in case URLs and element ids
    #[must_use]
    pub fn compact(&self) -> String {
        self.0.replace('-', "")
    }
}

impl fmt::Display for CaseReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CaseReference {
    type Error = CaseflowError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CaseReference> for String {
    fn from(value: CaseReference) -> Self {
        value.0
    }
}

/// Expected case lifecycle label, e.g. "Case created" or "Grant issued".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EndState(String);

impl EndState {
    /// Create a new end-state token
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// Label text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compare against the rendered state region.
    ///
    /// Case-sensitive whole-string match; only surrounding whitespace of the
    /// rendered text is ignored.
    pub fn verify(&self, rendered: &str) -> CaseflowResult<()> {
        if rendered.trim() == self.0 {
            Ok(())
        } else {
            Err(CaseflowError::StateMismatch {
                expected: self.0.clone(),
                actual: rendered.trim().to_string(),
            })
        }
    }
}

impl fmt::Display for EndState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EndState {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    mod case_reference_tests {
        use super::*;

        #[test]
        fn test_parse_hyphenated() {
            let r = CaseReference::parse("1234-5678-9012-3456").unwrap();
            assert_eq!(r.as_str(), "1234-5678-9012-3456");
            assert_eq!(r.compact(), "1234567890123456");
        }

        #[test]
        fn test_parse_compact_groups_by_four() {
            let r = CaseReference::parse("1672831027562390").unwrap();
            assert_eq!(r.as_str(), "1672-8310-2756-2390");
        }

        #[test]
        fn test_parse_rejects_wrong_length() {
            assert!(CaseReference::parse("123456789").is_err());
            assert!(CaseReference::parse("1234-5678-9012").is_err());
            assert!(CaseReference::parse("").is_err());
        }

        #[test]
        fn test_parse_rejects_punctuation() {
            assert!(CaseReference::parse("1234-5678-9012-34_6").is_err());
        }

        #[test]
        fn test_from_url() {
            let url = "https://manage-case.test/cases/case-details/1672831027562390";
            let r = CaseReference::from_url(url).unwrap();
            assert_eq!(r.as_str(), "1672-8310-2756-2390");
        }

        #[test]
        fn test_from_url_ignores_fragment_query_and_slash() {
            let url = "http://localhost:3451/v2/case/1672831027562390/?tab=History#Event";
            let r = CaseReference::from_url(url).unwrap();
            assert_eq!(r.compact(), "1672831027562390");
        }

        #[test]
        fn test_from_url_without_reference() {
            let err = CaseReference::from_url("http://localhost/cases").unwrap_err();
            assert!(matches!(err, CaseflowError::InvalidCaseReference { .. }));
        }

        #[test]
        fn test_serde_round_trip_validates() {
            let json = serde_json::to_string(&CaseReference::parse("1234123412341234").unwrap())
                .unwrap();
            assert_eq!(json, "\"1234-1234-1234-1234\"");
            let bad: Result<CaseReference, _> = serde_json::from_str("\"nope\"");
            assert!(bad.is_err());
        }
    }

    mod end_state_tests {
        use super::*;

        #[test]
        fn test_exact_match_passes() {
            EndState::new("Case created").verify("Case created").unwrap();
        }

        #[test]
        fn test_case_difference_fails() {
            let err = EndState::new("Case created").verify("Case Created").unwrap_err();
            assert!(matches!(err, CaseflowError::StateMismatch { .. }));
        }

        #[test]
        fn test_substring_fails() {
            assert!(EndState::new("Case created")
                .verify("Case created (awaiting payment)")
                .is_err());
            assert!(EndState::new("Grant issued").verify("issued").is_err());
        }

        #[test]
        fn test_surrounding_whitespace_ignored() {
            EndState::new("Grant issued").verify("\n  Grant issued \n").unwrap();
        }
    }

    proptest! {
        #[test]
        fn prop_compact_input_always_hyphenates(s in "[A-Za-z0-9]{16}") {
            let r = CaseReference::parse(&s).unwrap();
            prop_assert!(hyphenated_pattern().is_match(r.as_str()));
            prop_assert_eq!(r.compact(), s);
        }

        #[test]
        fn prop_url_round_trip(s in "[0-9]{16}") {
            let url = format!("https://xui.test/cases/case-details/{s}");
            let r = CaseReference::from_url(&url).unwrap();
            prop_assert_eq!(r.compact(), s);
        }
    }
}
