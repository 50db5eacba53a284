//! Consumed transport and rendering interfaces.
//!
//! The engines never talk to a browser or an HTTP stack directly; they are
//! written against the traits in this module. [`Transport`] fetches the
//! static (non-rendered) document, [`RenderSession`] queries a live
//! rendered page, and [`SessionProvider`] hands out sessions. Selector
//! strings passed to a [`RenderSession`] are opaque to the engines; the
//! production implementation interprets them as XPath.
//!
//! [`with_session`] is the structured-acquisition scope: the session is
//! released on every exit path, including when the work inside fails.

use crate::error::ScrapeError;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Outcome of a click attempt on an optional element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    Clicked,
    ElementAbsent,
}

/// Outcome of a bounded wait for a selector to appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Appeared,
    TimedOut,
}

/// Fetches the static document for a URL.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, ScrapeError>;
}

/// One live rendered page, owned exclusively by the unit of work using it.
#[async_trait]
pub trait RenderSession: Send + Sync {
    /// Text content of every element matching the selector, in order.
    async fn query_text_all(&self, selector: &str) -> Result<Vec<String>, ScrapeError>;

    /// Text content of the first matching element.
    async fn query_text(&self, selector: &str) -> Result<Option<String>, ScrapeError> {
        Ok(self.query_text_all(selector).await?.into_iter().next())
    }

    /// An attribute of the first matching element.
    async fn query_attr(&self, selector: &str, attr: &str)
    -> Result<Option<String>, ScrapeError>;

    /// Click the first matching element if it exists.
    async fn click(&self, selector: &str) -> Result<ClickOutcome, ScrapeError>;

    /// Wait up to `timeout` for the selector to match at least one element.
    async fn wait_for(&self, selector: &str, timeout: Duration)
    -> Result<WaitOutcome, ScrapeError>;

    /// Release the page. Called by [`with_session`] on every exit path.
    async fn close(&self) -> Result<(), ScrapeError>;
}

/// Opens rendering sessions, one per unit of work.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn open(&self, url: &str) -> Result<Box<dyn RenderSession>, ScrapeError>;
}

/// Run `work` against a freshly opened session for `url`, releasing the
/// session whether the work succeeds, fails, or is abandoned early. A close
/// failure is logged, never propagated over the work's own result.
pub async fn with_session<T, F, Fut>(
    provider: &dyn SessionProvider,
    url: &str,
    work: F,
) -> Result<T, ScrapeError>
where
    F: FnOnce(Arc<dyn RenderSession>) -> Fut,
    Fut: Future<Output = Result<T, ScrapeError>>,
{
    let session: Arc<dyn RenderSession> = Arc::from(provider.open(url).await?);
    let outcome = work(Arc::clone(&session)).await;
    if let Err(e) = session.close().await {
        warn!(%url, error = %e, "Failed to release rendering session");
    }
    outcome
}

/// Plain reqwest-backed transport for the static document channel.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, ScrapeError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, url: &str) -> Result<String, ScrapeError> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}
