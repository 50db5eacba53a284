//! Crawl error taxonomy.
//!
//! Failures are contained at the smallest unit possible — one field, one
//! article, one feed position — and surface here only when a whole unit of
//! work has to be abandoned. `main` converts these into log entries and
//! moves on; nothing in the crawl loop aborts the run.

use thiserror::Error;

/// Errors produced while discovering or extracting articles.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// HTTP fetch of the static document failed.
    #[error("transport request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The rendering collaborator reported a failure.
    #[error("rendering session failure: {0}")]
    Session(String),

    /// The rendered document never produced its body-content marker within
    /// the settle timeout. No usable extraction is possible for this article.
    #[error("rendered document never settled: {url}")]
    PageNeverSettled { url: String },

    /// A static-channel selector failed to parse.
    #[error("invalid selector `{0}`")]
    Selector(String),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}
