//! Suite configuration: environment URLs, credentials per role, timeouts,
//! delays, retry defaults and feature flags.
//!
//! Loaded once (YAML file, then `CASEFLOW_*` environment overrides), validated,
//! and shared read-only between concurrently running scenarios.

use crate::result::{CaseflowError, CaseflowResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// User roles the suite signs in as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Back-office caseworker
    #[default]
    Caseworker,
    /// Caseworker with elevated permissions
    SuperUser,
    /// Professional (solicitor) user
    Solicitor,
    /// First share-a-case organisation user
    SacPrimary,
    /// Second share-a-case organisation user
    SacSecondary,
}

impl Role {
    /// All roles, in configuration order
    pub const ALL: [Self; 5] = [
        Self::Caseworker,
        Self::SuperUser,
        Self::Solicitor,
        Self::SacPrimary,
        Self::SacSecondary,
    ];

    /// Key used in configuration files and step arguments
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Caseworker => "caseworker",
            Self::SuperUser => "super_user",
            Self::Solicitor => "solicitor",
            Self::SacPrimary => "sac_primary",
            Self::SacSecondary => "sac_secondary",
        }
    }
}

impl FromStr for Role {
    type Err = CaseflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.key() == s)
            .ok_or_else(|| CaseflowError::config(format!("unknown role '{s}'")))
    }
}

/// Username/password pair
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Login email
    pub username: String,
    /// Password
    pub password: String,
}

impl Credentials {
    /// Create credentials
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Copy with the password masked, for display
    #[must_use]
    pub fn redacted(&self) -> Self {
        Self {
            username: self.username.clone(),
            password: if self.password.is_empty() {
                String::new()
            } else {
                "********".to_string()
            },
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Credentials for every role
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Users {
    pub caseworker: Credentials,
    pub super_user: Credentials,
    pub solicitor: Credentials,
    pub sac_primary: Credentials,
    pub sac_secondary: Credentials,
}

impl Users {
    /// Credentials for a role
    #[must_use]
    pub const fn get(&self, role: Role) -> &Credentials {
        match role {
            Role::Caseworker => &self.caseworker,
            Role::SuperUser => &self.super_user,
            Role::Solicitor => &self.solicitor,
            Role::SacPrimary => &self.sac_primary,
            Role::SacSecondary => &self.sac_secondary,
        }
    }

    fn get_mut(&mut self, role: Role) -> &mut Credentials {
        match role {
            Role::Caseworker => &mut self.caseworker,
            Role::SuperUser => &mut self.super_user,
            Role::Solicitor => &mut self.solicitor,
            Role::SacPrimary => &mut self.sac_primary,
            Role::SacSecondary => &mut self.sac_secondary,
        }
    }
}

/// Wait timeouts, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Waiting for text to appear
    pub wait_for_text_secs: u64,
    /// Waiting for a navigation to complete
    pub navigation_secs: u64,
    /// Waiting for the IdAM sign-in page
    pub sign_in_page_secs: u64,
    /// Hard ceiling on a single step
    pub step_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            wait_for_text_secs: 60,
            navigation_secs: 60,
            sign_in_page_secs: 600,
            step_secs: 900,
        }
    }
}

impl Timeouts {
    #[must_use]
    pub const fn wait_for_text(&self) -> Duration {
        Duration::from_secs(self.wait_for_text_secs)
    }

    #[must_use]
    pub const fn navigation(&self) -> Duration {
        Duration::from_secs(self.navigation_secs)
    }

    #[must_use]
    pub const fn sign_in_page(&self) -> Duration {
        Duration::from_secs(self.sign_in_page_secs)
    }

    #[must_use]
    pub const fn step(&self) -> Duration {
        Duration::from_secs(self.step_secs)
    }
}

/// Fixed pauses the UI needs between actions, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Delays {
    pub sign_in_secs: u64,
    pub manual_medium_secs: u64,
    pub caseworker_go_button_secs: u64,
    pub create_case_secs: u64,
}

impl Default for Delays {
    fn default() -> Self {
        Self {
            sign_in_secs: 3,
            manual_medium_secs: 2,
            caseworker_go_button_secs: 1,
            create_case_secs: 3,
        }
    }
}

/// Default retry budgets applied when a definition omits them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Retries {
    /// Whole-feature retries
    pub features: u32,
    /// Per-scenario retries
    pub scenarios: u32,
}

/// Feature flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Flags {
    /// Target the ExUI front end instead of the legacy CCD UI
    pub xui: bool,
    /// Run the browser with a visible window
    pub show_browser: bool,
}

/// Complete suite configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaseflowConfig {
    /// Environment name, for reports
    pub environment: String,
    /// Back-office UI base URL
    pub back_office_url: String,
    pub users: Users,
    pub timeouts: Timeouts,
    pub delays: Delays,
    pub retries: Retries,
    pub flags: Flags,
    /// Where reports and screenshots go
    pub output_dir: PathBuf,
    /// File attached by document upload steps
    pub document_fixture: PathBuf,
}

impl Default for CaseflowConfig {
    fn default() -> Self {
        Self {
            environment: "local".to_string(),
            back_office_url: "http://localhost:3451".to_string(),
            users: Users::default(),
            timeouts: Timeouts::default(),
            delays: Delays::default(),
            retries: Retries::default(),
            flags: Flags::default(),
            output_dir: PathBuf::from("target/caseflow"),
            document_fixture: PathBuf::from("demos/fixtures/test-document.pdf"),
        }
    }
}

impl CaseflowConfig {
    /// Create new config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse YAML
    pub fn from_yaml_str(yaml: &str) -> CaseflowResult<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Load a YAML file, apply process environment overrides, validate
    pub fn load(path: &Path) -> CaseflowResult<Self> {
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            CaseflowError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        let config = Self::from_yaml_str(&yaml)?.with_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus process environment overrides, validated
    pub fn from_env() -> CaseflowResult<Self> {
        let config = Self::default().with_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `CASEFLOW_*` overrides read through `lookup`.
    ///
    /// Recognised keys: `CASEFLOW_ENVIRONMENT`, `CASEFLOW_BACK_OFFICE_URL`,
    /// `CASEFLOW_OUTPUT_DIR`, `CASEFLOW_XUI`, `CASEFLOW_SHOW_BROWSER`,
    /// `CASEFLOW_RETRY_FEATURES`, `CASEFLOW_RETRY_SCENARIOS`, and
    /// `CASEFLOW_<ROLE>_USERNAME` / `CASEFLOW_<ROLE>_PASSWORD` for each role.
    pub fn with_env_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> CaseflowResult<Self> {
        if let Some(v) = lookup("CASEFLOW_ENVIRONMENT") {
            self.environment = v;
        }
        if let Some(v) = lookup("CASEFLOW_BACK_OFFICE_URL") {
            self.back_office_url = v;
        }
        if let Some(v) = lookup("CASEFLOW_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("CASEFLOW_XUI") {
            self.flags.xui = parse_env("CASEFLOW_XUI", &v)?;
        }
        if let Some(v) = lookup("CASEFLOW_SHOW_BROWSER") {
            self.flags.show_browser = parse_env("CASEFLOW_SHOW_BROWSER", &v)?;
        }
        if let Some(v) = lookup("CASEFLOW_RETRY_FEATURES") {
            self.retries.features = parse_env("CASEFLOW_RETRY_FEATURES", &v)?;
        }
        if let Some(v) = lookup("CASEFLOW_RETRY_SCENARIOS") {
            self.retries.scenarios = parse_env("CASEFLOW_RETRY_SCENARIOS", &v)?;
        }
        for role in Role::ALL {
            let prefix = format!("CASEFLOW_{}", role.key().to_uppercase());
            let creds = self.users.get_mut(role);
            if let Some(v) = lookup(&format!("{prefix}_USERNAME")) {
                creds.username = v;
            }
            if let Some(v) = lookup(&format!("{prefix}_PASSWORD")) {
                creds.password = v;
            }
        }
        Ok(self)
    }

    /// Check the settings every run depends on
    pub fn validate(&self) -> CaseflowResult<()> {
        if !(self.back_office_url.starts_with("http://")
            || self.back_office_url.starts_with("https://"))
        {
            return Err(CaseflowError::config(format!(
                "back_office_url must be an http(s) URL, got '{}'",
                self.back_office_url
            )));
        }
        if self.timeouts.step_secs == 0 {
            return Err(CaseflowError::config("timeouts.step_secs must be positive"));
        }
        Ok(())
    }

    /// Base URL without trailing slash
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.back_office_url.trim_end_matches('/')
    }

    /// Copy safe to print
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        for role in Role::ALL {
            let creds = copy.users.get_mut(role);
            *creds = creds.redacted();
        }
        copy
    }

    /// Set back-office URL
    #[must_use]
    pub fn with_back_office_url(mut self, url: impl Into<String>) -> Self {
        self.back_office_url = url.into();
        self
    }

    /// Set credentials for a role
    #[must_use]
    pub fn with_user(mut self, role: Role, credentials: Credentials) -> Self {
        *self.users.get_mut(role) = credentials;
        self
    }

    /// Set default retry budgets
    #[must_use]
    pub const fn with_retries(mut self, features: u32, scenarios: u32) -> Self {
        self.retries = Retries {
            features,
            scenarios,
        };
        self
    }

    /// Set output directory
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> CaseflowResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| CaseflowError::config(format!("{key}: cannot parse '{value}'")))
}
