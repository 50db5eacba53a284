//! Chromium-backed rendering sessions.
//!
//! Production implementation of the [`SessionProvider`]/[`RenderSession`]
//! interfaces over `chromiumoxide` (CDP). Selector strings are interpreted
//! as XPath and resolved inside the page via `document.evaluate`, which
//! keeps the whole query surface on one code path — including text
//! predicates that CSS cannot express.

use crate::browser::{ClickOutcome, RenderSession, SessionProvider, WaitOutcome};
use crate::error::ScrapeError;
use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

fn session_err(e: impl std::fmt::Display) -> ScrapeError {
    ScrapeError::Session(e.to_string())
}

/// Launches one headless browser and hands out one page per unit of work.
pub struct ChromiumProvider {
    browser: Browser,
    handler_task: JoinHandle<()>,
}

impl ChromiumProvider {
    /// Launch the browser. `headful` shows a window for debugging.
    pub async fn launch(headful: bool) -> Result<Self, ScrapeError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .request_timeout(Duration::from_secs(30))
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage");
        if headful {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(ScrapeError::Session)?;

        let (browser, mut handler) = Browser::launch(config).await.map_err(session_err)?;

        // The handler stream must be drained for the CDP connection to make
        // progress.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        info!(headful, "Chromium launched");
        Ok(Self {
            browser,
            handler_task,
        })
    }

    /// Close the browser and stop the event pump.
    pub async fn shutdown(mut self) -> Result<(), ScrapeError> {
        self.browser.close().await.map_err(session_err)?;
        let _ = self.browser.wait().await;
        self.handler_task.abort();
        info!("Chromium shut down");
        Ok(())
    }
}

#[async_trait]
impl SessionProvider for ChromiumProvider {
    async fn open(&self, url: &str) -> Result<Box<dyn RenderSession>, ScrapeError> {
        let page = self.browser.new_page(url).await.map_err(session_err)?;
        let _ = page.wait_for_navigation().await;
        debug!(%url, "Opened rendering session");
        Ok(Box::new(ChromiumSession { page }))
    }
}

/// One live page. Owned exclusively by the discovery or extraction unit
/// that opened it; released through [`RenderSession::close`].
pub struct ChromiumSession {
    page: Page,
}

impl ChromiumSession {
    async fn eval<T: serde::de::DeserializeOwned>(&self, script: String) -> Result<T, ScrapeError> {
        self.page
            .evaluate(script)
            .await
            .map_err(session_err)?
            .into_value::<T>()
            .map_err(session_err)
    }

    async fn match_count(&self, selector: &str) -> Result<usize, ScrapeError> {
        let script = format!(
            "document.evaluate({sel}, document, null, \
             XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null).snapshotLength",
            sel = js_string(selector)
        );
        self.eval(script).await
    }
}

#[async_trait]
impl RenderSession for ChromiumSession {
    async fn query_text_all(&self, selector: &str) -> Result<Vec<String>, ScrapeError> {
        let script = format!(
            "(() => {{\
               const out = [];\
               const snap = document.evaluate({sel}, document, null, \
                 XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);\
               for (let i = 0; i < snap.snapshotLength; i++) {{\
                 out.push(snap.snapshotItem(i).textContent || '');\
               }}\
               return out;\
             }})()",
            sel = js_string(selector)
        );
        self.eval(script).await
    }

    async fn query_attr(
        &self,
        selector: &str,
        attr: &str,
    ) -> Result<Option<String>, ScrapeError> {
        let script = format!(
            "(() => {{\
               const node = document.evaluate({sel}, document, null, \
                 XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue;\
               return node ? node.getAttribute({attr}) : null;\
             }})()",
            sel = js_string(selector),
            attr = js_string(attr)
        );
        self.eval(script).await
    }

    async fn click(&self, selector: &str) -> Result<ClickOutcome, ScrapeError> {
        let script = format!(
            "(() => {{\
               const node = document.evaluate({sel}, document, null, \
                 XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue;\
               if (!node) return false;\
               node.click();\
               return true;\
             }})()",
            sel = js_string(selector)
        );
        let clicked: bool = self.eval(script).await?;
        Ok(if clicked {
            ClickOutcome::Clicked
        } else {
            ClickOutcome::ElementAbsent
        })
    }

    async fn wait_for(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<WaitOutcome, ScrapeError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.match_count(selector).await? > 0 {
                return Ok(WaitOutcome::Appeared);
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(WaitOutcome::TimedOut);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn close(&self) -> Result<(), ScrapeError> {
        self.page.clone().close().await.map_err(session_err)
    }
}

/// Quote a string as a JS literal, escaping per JSON rules.
fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_js_string_escapes_quotes() {
        assert_eq!(js_string("//a[h2]"), r#""//a[h2]""#);
        assert_eq!(
            js_string("//button[text()='Show more']"),
            r#""//button[text()='Show more']""#
        );
        assert_eq!(js_string(r#"say "hi""#), r#""say \"hi\"""#);
    }
}
