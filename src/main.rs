//! # Medium Search Scraper
//!
//! A keyword-driven scraping pipeline that discovers articles on Medium's
//! search feed, extracts structured records from each article page, and
//! normalizes them into a JSON feed — including an external summarization
//! step with a local fallback.
//!
//! ## Features
//!
//! - Walks the virtualized (infinite-scroll) search result feed per
//!   keyword, with a two-tier retry budget that distinguishes render lag
//!   from genuine feed exhaustion
//! - Dual-channel field extraction: a static document parse first, then
//!   concurrent rendered-DOM fallback queries for whatever the static
//!   response withheld
//! - Normalizes suffixed counts (`2.5K`), locale dates, and free text into
//!   typed fields; summarizes article bodies through a HuggingFace
//!   inference endpoint with a local shortening fallback
//!
//! ## Usage
//!
//! ```sh
//! medium_search_scraper -k keywords.yaml -o output.json
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Discovery**: per keyword, collect article targets from the search feed
//! 2. **Extraction**: per article, build a raw record from both channels
//! 3. **Normalization**: validate fields and summarize (parallel, bounded)
//! 4. **Output**: write the JSON feed

use clap::Parser;
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use std::collections::BTreeMap;
use std::error::Error;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod browser;
mod chromium;
mod cli;
mod discovery;
mod error;
mod extract;
mod fields;
mod models;
mod normalize;
mod outputs;
mod summarize;
mod utils;

use browser::HttpTransport;
use chromium::ChromiumProvider;
use cli::Cli;
use discovery::DiscoveryLimits;
use models::{BlogRecord, SearchJob};
use summarize::{Summarizer, TokenLimiter};
use utils::ensure_writable_dir;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("medium_search_scraper starting up");

    let args = Cli::parse();
    debug!(?args.keywords, ?args.output, "Parsed CLI arguments");

    let keywords = load_keywords(&args.keywords)?;
    if keywords.is_empty() {
        warn!(path = %args.keywords, "Keywords file is empty; nothing to do");
        return Ok(());
    }
    info!(count = keywords.len(), "Loaded search keywords");

    // Early check: ensure the output location is writable
    if let Some(parent) = Path::new(&args.output).parent() {
        let dir = if parent.as_os_str().is_empty() {
            "."
        } else {
            parent.to_str().unwrap_or(".")
        };
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(
                path = %args.output,
                error = %e,
                "Output location is not writable (fix perms or choose a different path)"
            );
            return Err(e);
        }
    }

    // ---- Summarization adapter ----
    let limiter = match &args.tokenizer {
        Some(path) => match TokenLimiter::from_file(path) {
            Ok(limiter) => {
                info!(%path, "Loaded tokenizer for input truncation");
                limiter
            }
            Err(e) => {
                warn!(
                    %path,
                    error = %e,
                    "Tokenizer unavailable; truncating on whitespace tokens"
                );
                TokenLimiter::Whitespace
            }
        },
        None => TokenLimiter::Whitespace,
    };
    let summarizer = Summarizer::new(
        args.summarizer_url.clone(),
        args.summarizer_api_key.clone(),
        limiter,
    );

    let transport = HttpTransport::new()?;
    let provider = ChromiumProvider::launch(args.headful).await?;

    let limits = DiscoveryLimits {
        local_retries: args.local_retries,
        global_retries: args.global_retries,
        element_wait: Duration::from_secs(args.element_wait_secs),
    };

    // ---- Discover targets, one keyword at a time ----
    let mut discovered = Vec::new();
    for (keyword, target_count) in &keywords {
        let job = SearchJob {
            keyword: keyword.clone(),
            target_count: *target_count,
        };
        match discovery::discover_targets(&provider, &job, &limits).await {
            Ok(mut targets) => {
                info!(keyword = %job.keyword, count = targets.len(), "Keyword discovery finished");
                discovered.append(&mut targets);
            }
            Err(e) => {
                error!(
                    keyword = %job.keyword,
                    error = %e,
                    "Discovery failed for keyword; continuing with the next"
                );
            }
        }
    }

    // The same article can surface under several keywords; extract it once.
    let targets: Vec<_> = discovered
        .into_iter()
        .unique_by(|t| t.url.clone())
        .collect();
    info!(count = targets.len(), "Total articles to extract");

    // ---- Extract and normalize with bounded concurrency ----
    let results: Vec<Option<BlogRecord>> = stream::iter(targets)
        .map(|target| {
            let transport = &transport;
            let provider = &provider;
            let summarizer = &summarizer;
            async move {
                match extract::extract_record(transport, provider, &target).await {
                    Ok(raw) => Some(normalize::normalize_record(raw, &target, summarizer).await),
                    Err(e) => {
                        error!(url = %target.url, error = %e, "Extraction failed; skipping article");
                        None
                    }
                }
            }
        })
        .buffer_unordered(args.concurrency.max(1))
        .collect()
        .await;

    let records: Vec<BlogRecord> = results.into_iter().flatten().collect();
    info!(count = records.len(), "Articles processed");

    if let Err(e) = outputs::json::write_records(&records, &args.output).await {
        error!(path = %args.output, error = %e, "Failed to write JSON feed");
    }

    if let Err(e) = provider.shutdown().await {
        warn!(error = %e, "Browser shutdown reported an error");
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}

/// Load the keyword → target-count map from a YAML file.
fn load_keywords(path: &str) -> Result<BTreeMap<String, usize>, Box<dyn Error>> {
    let raw = std::fs::read_to_string(path)?;
    if raw.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    let keywords: BTreeMap<String, usize> = serde_yaml::from_str(&raw)?;
    Ok(keywords)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_keywords() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Artificial Intelligence: 10").unwrap();
        writeln!(file, "Machine Learning: 15").unwrap();
        writeln!(file, "Data Science: 5").unwrap();

        let keywords = load_keywords(file.path().to_str().unwrap()).unwrap();
        assert_eq!(keywords.len(), 3);
        assert_eq!(keywords["Artificial Intelligence"], 10);
        assert_eq!(keywords["Data Science"], 5);
    }

    #[test]
    fn test_load_keywords_empty_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let keywords = load_keywords(file.path().to_str().unwrap()).unwrap();
        assert!(keywords.is_empty());
    }
}
