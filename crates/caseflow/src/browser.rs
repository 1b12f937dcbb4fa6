//! Chromium actor over the Chrome DevTools Protocol.
//!
//! With the `browser` feature, [`ChromiumActor`] implements every [`Actor`]
//! primitive through chromiumoxide. Waits poll the page until the condition
//! holds or the primitive's timeout elapses. Selectors starting with `//` or
//! `(//` are XPath; anything else is CSS.
//!
//! [`Actor`]: crate::actor::Actor

use crate::config::CaseflowConfig;
use std::time::Duration;

/// Interval between polls of a waiting primitive
pub const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Browser launch options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserConfig {
    /// Run in headless mode
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 960,
            chromium_path: None,
            sandbox: true,
        }
    }
}

impl BrowserConfig {
    /// Launch options implied by the suite configuration
    #[must_use]
    pub fn from_config(config: &CaseflowConfig) -> Self {
        Self {
            headless: !config.flags.show_browser,
            ..Self::default()
        }
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }
}

fn is_xpath(selector: &str) -> bool {
    selector.starts_with("//") || selector.starts_with("(//")
}

/// JS expression resolving `selector` to the first matching node or null
fn resolve_js(selector: &str) -> String {
    let literal = serde_json::Value::String(selector.to_string()).to_string();
    if is_xpath(selector) {
        format!(
            "document.evaluate({literal}, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue"
        )
    } else {
        format!("document.querySelector({literal})")
    }
}

fn visible_js(selector: &str) -> String {
    format!(
        "(() => {{ const el = {}; if (!el) return false; const r = el.getBoundingClientRect(); \
         const s = window.getComputedStyle(el); \
         return r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none'; }})()",
        resolve_js(selector)
    )
}

fn text_present_js(text: &str) -> String {
    let literal = serde_json::Value::String(text.to_string()).to_string();
    format!("(document.body ? document.body.innerText : '').includes({literal})")
}

fn fill_js(selector: &str, value: &str) -> String {
    let literal = serde_json::Value::String(value.to_string()).to_string();
    format!(
        "(() => {{ const el = {}; if (!el) return false; el.focus(); el.value = {literal}; \
         el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
         el.dispatchEvent(new Event('change', {{ bubbles: true }})); el.blur(); return true; }})()",
        resolve_js(selector)
    )
}

fn click_js(selector: &str) -> String {
    format!(
        "(() => {{ const el = {}; if (!el) return false; el.scrollIntoView({{ block: 'center' }}); el.click(); return true; }})()",
        resolve_js(selector)
    )
}

fn select_js(selector: &str, option: &str) -> String {
    let literal = serde_json::Value::String(option.to_string()).to_string();
    format!(
        "(() => {{ const el = {}; if (!el) return 'missing'; \
         const opt = Array.from(el.options).find(o => o.text.trim() === {literal} || o.value === {literal}); \
         if (!opt) return 'no-option'; el.value = opt.value; \
         el.dispatchEvent(new Event('change', {{ bubbles: true }})); return 'ok'; }})()",
        resolve_js(selector)
    )
}

fn read_text_js(selector: &str) -> String {
    format!(
        "(() => {{ const el = {}; return el ? el.innerText : null; }})()",
        resolve_js(selector)
    )
}

const NAV_MARKER_SET: &str = "window.__caseflowNav = location.href; true";
const NAV_DONE: &str = "(window.__caseflowNav === undefined || window.__caseflowNav !== location.href) && document.readyState === 'complete'";

#[cfg(feature = "browser")]
mod cdp {
    use super::*;
    use crate::actor::{Actor, ActorFactory, Screenshot};
    use crate::result::{CaseflowError, CaseflowResult};
    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
    use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
    use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
    use chromiumoxide::page::{Page as CdpPage, ScreenshotParams};
    use futures::StreamExt;
    use serde::de::DeserializeOwned;
    use std::path::Path;
    use tokio::time::Instant;
    use tracing::debug;

    /// Actor driving one Chromium instance
    #[derive(Debug)]
    pub struct ChromiumActor {
        browser: CdpBrowser,
        page: CdpPage,
        handle: tokio::task::JoinHandle<()>,
    }

    impl ChromiumActor {
        /// Launch a browser and open a blank page
        pub async fn launch(config: &BrowserConfig) -> CaseflowResult<Self> {
            let mut builder = CdpConfig::builder().window_size(config.viewport_width, config.viewport_height);

            if !config.headless {
                builder = builder.with_head();
            }

            if !config.sandbox {
                builder = builder.no_sandbox();
            }

            if let Some(ref path) = config.chromium_path {
                builder = builder.chrome_executable(path);
            }

            let cdp_config = builder.build().map_err(CaseflowError::browser)?;

            let (browser, mut handler) = CdpBrowser::launch(cdp_config)
                .await
                .map_err(|e| CaseflowError::browser(e.to_string()))?;

            let handle = tokio::spawn(async move {
                while let Some(h) = handler.next().await {
                    if h.is_err() {
                        break;
                    }
                }
            });

            let page = browser
                .new_page("about:blank")
                .await
                .map_err(|e| CaseflowError::browser(e.to_string()))?;

            debug!(headless = config.headless, "browser launched");
            Ok(Self {
                browser,
                page,
                handle,
            })
        }

        async fn eval<T: DeserializeOwned>(&self, expr: String) -> CaseflowResult<T> {
            self.page
                .evaluate(expr)
                .await
                .map_err(|e| CaseflowError::browser(e.to_string()))?
                .into_value()
                .map_err(|e| CaseflowError::browser(e.to_string()))
        }

        /// Evaluate `expr` until it yields `true` or `timeout` elapses
        async fn poll(&self, expr: &str, condition: String, timeout: Duration) -> CaseflowResult<()> {
            let deadline = Instant::now() + timeout;
            loop {
                if self.eval::<bool>(expr.to_string()).await.unwrap_or(false) {
                    return Ok(());
                }
                if Instant::now() >= deadline {
                    return Err(CaseflowError::timeout(condition, timeout));
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        }

        async fn node_id(
            &self,
            selector: &str,
        ) -> CaseflowResult<chromiumoxide::cdp::browser_protocol::dom::NodeId> {
            let found = if is_xpath(selector) {
                self.page.find_xpath(selector).await
            } else {
                self.page.find_element(selector).await
            };
            found
                .map(|el| el.node_id)
                .map_err(|_| CaseflowError::ElementNotFound {
                    selector: selector.to_string(),
                })
        }
    }

    #[async_trait]
    impl Actor for ChromiumActor {
        async fn navigate(&mut self, url: &str) -> CaseflowResult<()> {
            let _ = self
                .page
                .goto(url)
                .await
                .map_err(|e| CaseflowError::NavigationError {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;
            Ok(())
        }

        async fn wait_for_text(&mut self, text: &str, timeout: Duration) -> CaseflowResult<()> {
            self.poll(&text_present_js(text), format!("text '{text}'"), timeout)
                .await
        }

        async fn fill_field(&mut self, selector: &str, value: &str) -> CaseflowResult<()> {
            if self.eval::<bool>(fill_js(selector, value)).await? {
                Ok(())
            } else {
                Err(CaseflowError::ElementNotFound {
                    selector: selector.to_string(),
                })
            }
        }

        async fn click(&mut self, selector: &str) -> CaseflowResult<()> {
            if self.eval::<bool>(click_js(selector)).await? {
                Ok(())
            } else {
                Err(CaseflowError::ElementNotFound {
                    selector: selector.to_string(),
                })
            }
        }

        async fn select_option(&mut self, selector: &str, option: &str) -> CaseflowResult<()> {
            match self.eval::<String>(select_js(selector, option)).await?.as_str() {
                "ok" => Ok(()),
                "missing" => Err(CaseflowError::ElementNotFound {
                    selector: selector.to_string(),
                }),
                _ => Err(CaseflowError::assertion(format!(
                    "option '{option}' not available in {selector}"
                ))),
            }
        }

        async fn wait_for_navigation(
            &mut self,
            trigger: &str,
            timeout: Duration,
        ) -> CaseflowResult<()> {
            let _ = self.eval::<bool>(NAV_MARKER_SET.to_string()).await?;
            self.click(trigger).await?;
            self.poll(NAV_DONE, format!("navigation after '{trigger}'"), timeout)
                .await
        }

        async fn assert_absent(&mut self, selector: &str) -> CaseflowResult<()> {
            if self.eval::<bool>(visible_js(selector)).await? {
                Err(CaseflowError::ElementPresent {
                    selector: selector.to_string(),
                })
            } else {
                Ok(())
            }
        }

        async fn assert_visible(&mut self, selector: &str, timeout: Duration) -> CaseflowResult<()> {
            self.poll(&visible_js(selector), format!("element '{selector}'"), timeout)
                .await
        }

        async fn read_text(&mut self, selector: &str) -> CaseflowResult<String> {
            self.eval::<Option<String>>(read_text_js(selector))
                .await?
                .ok_or_else(|| CaseflowError::ElementNotFound {
                    selector: selector.to_string(),
                })
        }

        async fn current_url(&mut self) -> CaseflowResult<String> {
            self.page
                .url()
                .await
                .map_err(|e| CaseflowError::browser(e.to_string()))?
                .ok_or_else(|| CaseflowError::browser("page has no URL"))
        }

        async fn upload_file(&mut self, selector: &str, path: &Path) -> CaseflowResult<()> {
            let absolute = std::fs::canonicalize(path)?;
            let node_id = self.node_id(selector).await?;
            let params = SetFileInputFilesParams::builder()
                .file(absolute.display().to_string())
                .node_id(node_id)
                .build()
                .map_err(CaseflowError::browser)?;
            let _ = self
                .page
                .execute(params)
                .await
                .map_err(|e| CaseflowError::browser(e.to_string()))?;
            Ok(())
        }

        async fn capture_failure(&mut self, label: &str) -> Option<Screenshot> {
            let params = ScreenshotParams::builder()
                .format(CaptureScreenshotFormat::Png)
                .full_page(true)
                .build();
            match self.page.screenshot(params).await {
                Ok(data) => Some(Screenshot::new(data, label)),
                Err(e) => {
                    debug!(error = %e, "failure capture unavailable");
                    None
                }
            }
        }

        async fn close(&mut self) -> CaseflowResult<()> {
            let result = self
                .browser
                .close()
                .await
                .map(|_| ())
                .map_err(|e| CaseflowError::browser(e.to_string()));
            let _ = self.browser.wait().await;
            self.handle.abort();
            result
        }
    }

    /// Launches a fresh browser per scenario attempt
    #[derive(Debug, Clone, Default)]
    pub struct ChromiumActorFactory {
        config: BrowserConfig,
    }

    impl ChromiumActorFactory {
        #[must_use]
        pub const fn new(config: BrowserConfig) -> Self {
            Self { config }
        }
    }

    #[async_trait]
    impl ActorFactory for ChromiumActorFactory {
        async fn open(&self) -> CaseflowResult<Box<dyn Actor>> {
            Ok(Box::new(ChromiumActor::launch(&self.config).await?))
        }
    }
}

#[cfg(feature = "browser")]
pub use cdp::{ChromiumActor, ChromiumActorFactory};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_follows_show_browser_flag() {
        let mut config = CaseflowConfig::default();
        assert!(BrowserConfig::from_config(&config).headless);
        config.flags.show_browser = true;
        assert!(!BrowserConfig::from_config(&config).headless);
    }

    #[test]
    fn test_builder() {
        let config = BrowserConfig::default()
            .with_headless(false)
            .with_chromium_path("/usr/bin/chromium")
            .with_no_sandbox();
        assert!(!config.headless);
        assert!(!config.sandbox);
        assert_eq!(config.chromium_path.as_deref(), Some("/usr/bin/chromium"));
    }

    #[test]
    fn test_selector_resolution() {
        assert_eq!(
            resolve_js("#username"),
            r##"document.querySelector("#username")"##
        );
        let xpath = resolve_js("//a[contains(., \"Sign out\")]");
        assert!(xpath.starts_with("document.evaluate(\"//a[contains(., \\\"Sign out\\\")]\""));
        assert!(is_xpath("(//button)[2]"));
    }

    #[test]
    fn test_values_are_json_quoted() {
        let js = fill_js("#surname", "O'Brien \"Jr\"");
        assert!(js.contains(r#"el.value = "O'Brien \"Jr\"""#));
        assert!(text_present_js("Case created").ends_with(r#".includes("Case created")"#));
    }
}
