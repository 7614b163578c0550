//! Browser automation for the court's search page.
//!
//! [`BrowserSession`] is the narrow surface the fetcher needs; [`ChromeLauncher`]
//! provides it by driving a visible Chromium over the DevTools protocol. Each
//! launch gets its own profile directory so concurrent lookups never share state.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::CourtConfig;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("browser protocol error: {0}")]
    Protocol(#[from] CdpError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn goto(&self, url: &str) -> Result<(), BrowserError>;

    async fn has_element(&self, selector: &str) -> Result<bool, BrowserError>;

    /// Picks the `<option>` with `value` in the `<select>` matched by `selector`.
    async fn select_option(&self, selector: &str, value: &str) -> Result<(), BrowserError>;

    async fn type_text(&self, selector: &str, text: &str) -> Result<(), BrowserError>;

    /// Serialized DOM of the current page.
    async fn content(&self) -> Result<String, BrowserError>;

    async fn current_url(&self) -> Result<Option<String>, BrowserError>;

    /// Terminates the browser. Calling it more than once is a no-op.
    async fn close(&mut self) -> Result<(), BrowserError>;
}

#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError>;
}

/// Polls for `selector` until it appears or `timeout` elapses.
pub async fn wait_for_element(
    session: &dyn BrowserSession,
    selector: &str,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<bool, BrowserError> {
    let deadline = Instant::now() + timeout;

    loop {
        if session.has_element(selector).await? {
            return Ok(true);
        }

        let now = Instant::now();
        if now >= deadline {
            return Ok(false);
        }

        tokio::time::sleep(poll_interval.min(deadline - now)).await;
    }
}

pub struct ChromeLauncher {
    settings: CourtConfig,
}

impl ChromeLauncher {
    #[must_use]
    pub const fn new(settings: CourtConfig) -> Self {
        Self { settings }
    }

    fn browser_config(&self, profile_dir: &std::path::Path) -> Result<BrowserConfig, BrowserError> {
        let mut builder = BrowserConfig::builder()
            .user_data_dir(profile_dir)
            .window_size(self.settings.window_width, self.settings.window_height)
            .args([
                "--no-first-run",
                "--disable-default-apps",
                "--disable-dev-shm-usage",
            ]);

        if !self.settings.headless {
            builder = builder.with_head();
        }

        if let Some(path) = &self.settings.chrome_executable {
            builder = builder.chrome_executable(path);
        }

        builder.build().map_err(BrowserError::Launch)
    }
}

#[async_trait]
impl BrowserLauncher for ChromeLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        let profile_dir = tempfile::Builder::new()
            .prefix("courtcase-browser-")
            .tempdir()?;

        let config = self.browser_config(profile_dir.path())?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                // Newer Chrome builds emit messages the protocol bindings do not
                // know; those are harmless.
                if let Err(e) = event {
                    debug!(error = %e, "CDP handler error");
                }
            }
        });

        let session = ChromeSession::open(browser, handler_task, profile_dir).await;
        Ok(Box::new(session?))
    }
}

pub struct ChromeSession {
    browser: Option<Browser>,
    page: Option<Page>,
    handler_task: JoinHandle<()>,
    _profile_dir: tempfile::TempDir,
}

impl ChromeSession {
    async fn open(
        mut browser: Browser,
        handler_task: JoinHandle<()>,
        profile_dir: tempfile::TempDir,
    ) -> Result<Self, BrowserError> {
        match browser.new_page("about:blank").await {
            Ok(page) => Ok(Self {
                browser: Some(browser),
                page: Some(page),
                handler_task,
                _profile_dir: profile_dir,
            }),
            Err(e) => {
                if let Err(close_err) = browser.close().await {
                    debug!(error = %close_err, "Browser close error (ignored)");
                }
                handler_task.abort();
                Err(e.into())
            }
        }
    }

    fn page(&self) -> Result<&Page, BrowserError> {
        self.page
            .as_ref()
            .ok_or_else(|| BrowserError::Launch("browser session already closed".to_string()))
    }

    async fn evaluate_bool(&self, script: String) -> Result<bool, BrowserError> {
        let result = self.page()?.evaluate(script).await?;
        Ok(result.into_value::<bool>().unwrap_or(false))
    }
}

fn js_string(value: &str) -> String {
    serde_json::Value::from(value).to_string()
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        self.page()?.goto(url).await?;
        Ok(())
    }

    async fn has_element(&self, selector: &str) -> Result<bool, BrowserError> {
        self.evaluate_bool(format!(
            "document.querySelector({}) !== null",
            js_string(selector)
        ))
        .await
    }

    async fn select_option(&self, selector: &str, value: &str) -> Result<(), BrowserError> {
        let script = format!(
            r"(() => {{
                const el = document.querySelector({sel});
                if (!el) return false;
                el.value = {val};
                el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                return el.value === {val};
            }})()",
            sel = js_string(selector),
            val = js_string(value),
        );

        if self.evaluate_bool(script).await? {
            Ok(())
        } else {
            Err(BrowserError::ElementNotFound(format!(
                "{selector} option {value}"
            )))
        }
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<(), BrowserError> {
        let element = self
            .page()?
            .find_element(selector)
            .await
            .map_err(|_| BrowserError::ElementNotFound(selector.to_string()))?;
        element.click().await?;
        element.type_str(text).await?;
        Ok(())
    }

    async fn content(&self) -> Result<String, BrowserError> {
        Ok(self.page()?.content().await?)
    }

    async fn current_url(&self) -> Result<Option<String>, BrowserError> {
        Ok(self.page()?.url().await?)
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        self.page = None;

        let Some(mut browser) = self.browser.take() else {
            return Ok(());
        };

        let closed = browser.close().await;
        if let Err(e) = browser.wait().await {
            warn!(error = %e, "Browser process did not exit cleanly");
        }
        self.handler_task.abort();

        closed.map(|_| ()).map_err(Into::into)
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        // Reached without close() when the request future is dropped mid-fetch.
        // Dropping the Browser kills its child process.
        if self.browser.take().is_some() {
            debug!("Browser session dropped without close");
        }
        self.handler_task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct AppearsAfter {
        polls: AtomicUsize,
        after: usize,
    }

    #[async_trait]
    impl BrowserSession for AppearsAfter {
        async fn goto(&self, _url: &str) -> Result<(), BrowserError> {
            Ok(())
        }
        async fn has_element(&self, _selector: &str) -> Result<bool, BrowserError> {
            Ok(self.polls.fetch_add(1, Ordering::SeqCst) + 1 >= self.after)
        }
        async fn select_option(&self, _s: &str, _v: &str) -> Result<(), BrowserError> {
            Ok(())
        }
        async fn type_text(&self, _s: &str, _t: &str) -> Result<(), BrowserError> {
            Ok(())
        }
        async fn content(&self) -> Result<String, BrowserError> {
            Ok(String::new())
        }
        async fn current_url(&self) -> Result<Option<String>, BrowserError> {
            Ok(None)
        }
        async fn close(&mut self) -> Result<(), BrowserError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn wait_for_element_polls_until_present() {
        let session = AppearsAfter {
            polls: AtomicUsize::new(0),
            after: 3,
        };
        let found = wait_for_element(
            &session,
            "#showList",
            Duration::from_secs(5),
            Duration::from_millis(1),
        )
        .await
        .unwrap();

        assert!(found);
        assert_eq!(session.polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn wait_for_element_gives_up_after_timeout() {
        let session = AppearsAfter {
            polls: AtomicUsize::new(0),
            after: usize::MAX,
        };
        let found = wait_for_element(
            &session,
            "#showList",
            Duration::from_millis(30),
            Duration::from_millis(5),
        )
        .await
        .unwrap();

        assert!(!found);
    }

    #[test]
    fn js_string_escapes_quotes() {
        assert_eq!(js_string("a'b\"c"), r#""a'b\"c""#);
    }
}
