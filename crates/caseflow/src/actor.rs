//! Actor - Abstract Browser Automation Trait
//!
//! Fragments never talk to a browser directly. They borrow an [`Actor`] for
//! the duration of one call and use its primitive operations only:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  Actor (Abstract Trait)                                          │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────────────┐          ┌──────────────────────┐      │
//! │  │ ChromiumActor        │          │ MockActor            │      │
//! │  │ (feature "browser")  │          │ (unit tests)         │      │
//! │  │ CDP via chromiumoxide│          │ in-memory journal    │      │
//! │  └──────────────────────┘          └──────────────────────┘      │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every primitive that waits carries its own timeout; a timeout surfaces as
//! [`CaseflowError::Timeout`] and fails the current step.

use crate::result::{CaseflowError, CaseflowResult};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Screenshot data with metadata
#[derive(Debug, Clone)]
pub struct Screenshot {
    /// Raw PNG data
    pub data: Vec<u8>,
    /// Label given by the capturing code
    pub label: String,
    /// Timestamp when screenshot was taken
    pub timestamp: std::time::SystemTime,
}

impl Screenshot {
    /// Create a new screenshot
    #[must_use]
    pub fn new(data: Vec<u8>, label: impl Into<String>) -> Self {
        Self {
            data,
            label: label.into(),
            timestamp: std::time::SystemTime::now(),
        }
    }

    /// Get the size in bytes
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    /// Check if screenshot has data
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.data.is_empty()
    }
}

/// Primitive browser operations consumed by step fragments.
///
/// Selectors are CSS unless they start with `//`, in which case they are
/// XPath expressions.
#[async_trait]
pub trait Actor: Send {
    /// Navigate to URL and wait for the document to load
    async fn navigate(&mut self, url: &str) -> CaseflowResult<()>;

    /// Wait until `text` is visible anywhere on the page
    async fn wait_for_text(&mut self, text: &str, timeout: Duration) -> CaseflowResult<()>;

    /// Replace the value of an input
    async fn fill_field(&mut self, selector: &str, value: &str) -> CaseflowResult<()>;

    /// Click element
    async fn click(&mut self, selector: &str) -> CaseflowResult<()>;

    /// Choose an option of a `<select>` by its visible label or value
    async fn select_option(&mut self, selector: &str, option: &str) -> CaseflowResult<()>;

    /// Click `trigger` and wait for the resulting navigation to complete
    async fn wait_for_navigation(&mut self, trigger: &str, timeout: Duration)
        -> CaseflowResult<()>;

    /// Fail if an element matching `selector` is on the page
    async fn assert_absent(&mut self, selector: &str) -> CaseflowResult<()>;

    /// Wait until an element matching `selector` is visible
    async fn assert_visible(&mut self, selector: &str, timeout: Duration) -> CaseflowResult<()>;

    /// Text content of the first element matching `selector`
    async fn read_text(&mut self, selector: &str) -> CaseflowResult<String>;

    /// Get current URL
    async fn current_url(&mut self) -> CaseflowResult<String>;

    /// Attach a local file to a file input
    async fn upload_file(&mut self, selector: &str, path: &Path) -> CaseflowResult<()>;

    /// Fixed delay
    async fn pause(&mut self, duration: Duration) -> CaseflowResult<()> {
        tokio::time::sleep(duration).await;
        Ok(())
    }

    /// Failure-capture hook, called by the runner before a step failure
    /// propagates. Capture errors are swallowed: the step failure wins.
    async fn capture_failure(&mut self, label: &str) -> Option<Screenshot> {
        let _ = label;
        None
    }

    /// Release the browser session
    async fn close(&mut self) -> CaseflowResult<()> {
        Ok(())
    }
}

/// Opens one actor (browser session) per scenario attempt.
#[async_trait]
pub trait ActorFactory: Send + Sync {
    /// Open a fresh session
    async fn open(&self) -> CaseflowResult<Box<dyn Actor>>;
}

/// Shared record of actor calls, readable after the actor is gone.
pub type Journal = Arc<Mutex<Vec<String>>>;

/// Mock actor for unit testing
///
/// Everything is visible and every navigation succeeds unless configured
/// otherwise, so fragment tests only describe what differs from a happy page.
#[derive(Default)]
pub struct MockActor {
    /// Current URL
    pub current_url: String,
    /// Call history for verification
    pub call_history: Vec<String>,
    /// Values typed into fields, by selector
    pub fields: HashMap<String, String>,
    /// Options chosen, by selector
    pub selections: HashMap<String, String>,
    texts: HashMap<String, String>,
    hidden: HashSet<String>,
    present: HashSet<String>,
    navigations: HashMap<String, String>,
    failures: Vec<(String, u32)>,
    screenshot_data: Option<Vec<u8>>,
    journal: Option<Journal>,
}

impl fmt::Debug for MockActor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockActor")
            .field("current_url", &self.current_url)
            .field("calls", &self.call_history.len())
            .field("failures", &self.failures)
            .finish()
    }
}

impl MockActor {
    /// Create new mock actor
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start on a URL
    #[must_use]
    pub fn at(mut self, url: impl Into<String>) -> Self {
        self.current_url = url.into();
        self
    }

    /// Render `text` inside the element matched by `selector`
    #[must_use]
    pub fn with_text(mut self, selector: impl Into<String>, text: impl Into<String>) -> Self {
        let _ = self.texts.insert(selector.into(), text.into());
        self
    }

    /// Make a text or selector never become visible
    #[must_use]
    pub fn hide(mut self, text_or_selector: impl Into<String>) -> Self {
        let _ = self.hidden.insert(text_or_selector.into());
        self
    }

    /// Put an element on the page so `assert_absent` fails for it
    #[must_use]
    pub fn with_element(mut self, selector: impl Into<String>) -> Self {
        let _ = self.present.insert(selector.into());
        self
    }

    /// Clicking `trigger` navigates to `url`
    #[must_use]
    pub fn navigates(mut self, trigger: impl Into<String>, url: impl Into<String>) -> Self {
        let _ = self.navigations.insert(trigger.into(), url.into());
        self
    }

    /// The next `times` calls whose journal entry starts with `prefix` fail
    #[must_use]
    pub fn fail_on(mut self, prefix: impl Into<String>, times: u32) -> Self {
        self.failures.push((prefix.into(), times));
        self
    }

    /// Capture these bytes from the failure hook
    #[must_use]
    pub fn with_screenshot(mut self, data: Vec<u8>) -> Self {
        self.screenshot_data = Some(data);
        self
    }

    /// Mirror every call into a shared journal
    #[must_use]
    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Get call history
    #[must_use]
    pub fn history(&self) -> &[String] {
        &self.call_history
    }

    /// Check if method was called
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.call_history.iter().any(|c| c.starts_with(method))
    }

    fn record(&mut self, entry: String) -> CaseflowResult<()> {
        if let Some(journal) = &self.journal {
            if let Ok(mut journal) = journal.lock() {
                journal.push(entry.clone());
            }
        }

        let injected = self
            .failures
            .iter_mut()
            .find(|(prefix, remaining)| *remaining > 0 && entry.starts_with(prefix.as_str()));
        let result = match injected {
            Some((_, remaining)) => {
                *remaining -= 1;
                Err(CaseflowError::assertion(format!("injected failure at {entry}")))
            }
            None => Ok(()),
        };

        self.call_history.push(entry);
        result
    }
}

#[async_trait]
impl Actor for MockActor {
    async fn navigate(&mut self, url: &str) -> CaseflowResult<()> {
        self.record(format!("navigate:{url}"))?;
        self.current_url = url.to_string();
        Ok(())
    }

    async fn wait_for_text(&mut self, text: &str, timeout: Duration) -> CaseflowResult<()> {
        self.record(format!("wait_for_text:{text}"))?;
        if self.hidden.contains(text) {
            return Err(CaseflowError::timeout(format!("text '{text}'"), timeout));
        }
        Ok(())
    }

    async fn fill_field(&mut self, selector: &str, value: &str) -> CaseflowResult<()> {
        self.record(format!("fill_field:{selector}={value}"))?;
        let _ = self.fields.insert(selector.to_string(), value.to_string());
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> CaseflowResult<()> {
        self.record(format!("click:{selector}"))?;
        if self.hidden.contains(selector) {
            return Err(CaseflowError::ElementNotFound {
                selector: selector.to_string(),
            });
        }
        Ok(())
    }

    async fn select_option(&mut self, selector: &str, option: &str) -> CaseflowResult<()> {
        self.record(format!("select_option:{selector}={option}"))?;
        let _ = self
            .selections
            .insert(selector.to_string(), option.to_string());
        Ok(())
    }

    async fn wait_for_navigation(
        &mut self,
        trigger: &str,
        timeout: Duration,
    ) -> CaseflowResult<()> {
        self.record(format!("wait_for_navigation:{trigger}"))?;
        if self.hidden.contains(trigger) {
            return Err(CaseflowError::timeout(
                format!("navigation after '{trigger}'"),
                timeout,
            ));
        }
        if let Some(url) = self.navigations.get(trigger) {
            self.current_url.clone_from(url);
        }
        Ok(())
    }

    async fn assert_absent(&mut self, selector: &str) -> CaseflowResult<()> {
        self.record(format!("assert_absent:{selector}"))?;
        if self.present.contains(selector) {
            return Err(CaseflowError::ElementPresent {
                selector: selector.to_string(),
            });
        }
        Ok(())
    }

    async fn assert_visible(&mut self, selector: &str, timeout: Duration) -> CaseflowResult<()> {
        self.record(format!("assert_visible:{selector}"))?;
        if self.hidden.contains(selector) {
            return Err(CaseflowError::timeout(format!("element '{selector}'"), timeout));
        }
        Ok(())
    }

    async fn read_text(&mut self, selector: &str) -> CaseflowResult<String> {
        self.record(format!("read_text:{selector}"))?;
        self.texts
            .get(selector)
            .cloned()
            .ok_or_else(|| CaseflowError::ElementNotFound {
                selector: selector.to_string(),
            })
    }

    async fn current_url(&mut self) -> CaseflowResult<String> {
        self.record("current_url".to_string())?;
        Ok(self.current_url.clone())
    }

    async fn upload_file(&mut self, selector: &str, path: &Path) -> CaseflowResult<()> {
        self.record(format!("upload_file:{selector}={}", path.display()))
    }

    async fn pause(&mut self, duration: Duration) -> CaseflowResult<()> {
        self.record(format!("pause:{}ms", duration.as_millis()))
    }

    async fn capture_failure(&mut self, label: &str) -> Option<Screenshot> {
        let _ = self.record(format!("capture_failure:{label}"));
        self.screenshot_data
            .clone()
            .map(|data| Screenshot::new(data, label))
    }

    async fn close(&mut self) -> CaseflowResult<()> {
        self.record("close".to_string())
    }
}

type MockBuilder = dyn Fn(u32) -> MockActor + Send + Sync;

/// Factory that opens a fresh [`MockActor`] per session.
///
/// The builder receives the zero-based session number, so tests can make the
/// first attempts fail and later ones pass.
pub struct MockActorFactory {
    build: Box<MockBuilder>,
    opened: AtomicU32,
    journal: Journal,
}

impl fmt::Debug for MockActorFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockActorFactory")
            .field("opened", &self.opened.load(Ordering::SeqCst))
            .finish()
    }
}

impl MockActorFactory {
    /// Create a factory from a per-session builder
    pub fn new(build: impl Fn(u32) -> MockActor + Send + Sync + 'static) -> Self {
        Self {
            build: Box::new(build),
            opened: AtomicU32::new(0),
            journal: Arc::default(),
        }
    }

    /// Number of sessions opened so far
    #[must_use]
    pub fn sessions_opened(&self) -> u32 {
        self.opened.load(Ordering::SeqCst)
    }

    /// Calls made by every session, in order
    #[must_use]
    pub fn journal(&self) -> Vec<String> {
        self.journal.lock().map(|j| j.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ActorFactory for MockActorFactory {
    async fn open(&self) -> CaseflowResult<Box<dyn Actor>> {
        let session = self.opened.fetch_add(1, Ordering::SeqCst);
        let actor = (self.build)(session).with_journal(Arc::clone(&self.journal));
        Ok(Box::new(actor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: Duration = Duration::from_millis(10);

    mod screenshot_tests {
        use super::*;

        #[test]
        fn test_screenshot_creation() {
            let data = vec![0x89, 0x50, 0x4E, 0x47];
            let screenshot = Screenshot::new(data.clone(), "failed");
            assert_eq!(screenshot.data, data);
            assert_eq!(screenshot.label, "failed");
            assert_eq!(screenshot.size_bytes(), 4);
            assert!(screenshot.is_valid());
        }

        #[test]
        fn test_empty_screenshot_invalid() {
            assert!(!Screenshot::new(vec![], "x").is_valid());
        }
    }

    mod mock_actor_tests {
        use super::*;

        #[tokio::test]
        async fn test_navigate_and_history() {
            let mut actor = MockActor::new();
            actor.navigate("https://bo.test/").await.unwrap();
            assert_eq!(actor.current_url, "https://bo.test/");
            assert!(actor.was_called("navigate"));
            assert!(!actor.was_called("click"));
        }

        #[tokio::test]
        async fn test_hidden_text_times_out() {
            let mut actor = MockActor::new().hide("Sign in");
            let err = actor.wait_for_text("Sign in", T).await.unwrap_err();
            assert!(err.is_timeout());
            actor.wait_for_text("Password", T).await.unwrap();
        }

        #[tokio::test]
        async fn test_navigation_changes_url() {
            let mut actor = MockActor::new().navigates("#submit", "https://bo.test/cases/1");
            actor.wait_for_navigation("#submit", T).await.unwrap();
            assert_eq!(actor.current_url().await.unwrap(), "https://bo.test/cases/1");
        }

        #[tokio::test]
        async fn test_present_element_fails_absent_check() {
            let mut actor = MockActor::new().with_element("#username");
            assert!(actor.assert_absent("#username").await.is_err());
            actor.assert_absent("#password").await.unwrap();
        }

        #[tokio::test]
        async fn test_injected_failure_consumed() {
            let mut actor = MockActor::new().fail_on("click:#go", 1);
            assert!(actor.click("#go").await.is_err());
            actor.click("#go").await.unwrap();
            assert_eq!(actor.history().len(), 2);
        }

        #[tokio::test]
        async fn test_fields_and_selections_recorded() {
            let mut actor = MockActor::new();
            actor.fill_field("#username", "cw@test").await.unwrap();
            actor
                .select_option("#next-step", "Issue grant")
                .await
                .unwrap();
            assert_eq!(actor.fields["#username"], "cw@test");
            assert_eq!(actor.selections["#next-step"], "Issue grant");
        }

        #[tokio::test]
        async fn test_read_text() {
            let mut actor = MockActor::new().with_text(".state", "Case created");
            assert_eq!(actor.read_text(".state").await.unwrap(), "Case created");
            assert!(actor.read_text(".missing").await.is_err());
        }

        #[tokio::test]
        async fn test_capture_failure() {
            let mut actor = MockActor::new();
            assert!(actor.capture_failure("none").await.is_none());
            let mut actor = MockActor::new().with_screenshot(vec![1, 2, 3]);
            let shot = actor.capture_failure("step").await.unwrap();
            assert_eq!(shot.data, vec![1, 2, 3]);
        }
    }

    mod factory_tests {
        use super::*;

        #[tokio::test]
        async fn test_factory_opens_fresh_sessions_with_shared_journal() {
            let factory = MockActorFactory::new(|n| MockActor::new().at(format!("about:{n}")));
            let mut first = factory.open().await.unwrap();
            first.click("#a").await.unwrap();
            let mut second = factory.open().await.unwrap();
            assert_eq!(second.current_url().await.unwrap(), "about:1");
            assert_eq!(factory.sessions_opened(), 2);
            assert_eq!(factory.journal(), vec!["click:#a", "current_url"]);
        }
    }
}
