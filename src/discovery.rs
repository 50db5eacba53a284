//! Discovery engine: walks one keyword's virtualized search feed and
//! yields article targets until the requested count is met or the feed is
//! declared exhausted.
//!
//! The feed renders incrementally, so "element missing at position N" is
//! ambiguous: it can mean render lag or a genuinely finished feed. The loop
//! distinguishes the two with a two-tier retry budget carried in
//! [`DiscoveryCursor`]:
//! - `local_retries`: rounds of triggering the load-more affordance and
//!   waiting for the element at the current position
//! - `global_retries`: consecutive positions allowed to fail completely
//!   before the feed is considered exhausted
//!
//! Any found or recovered element refills both budgets to their maxima, so
//! one bad stretch never truncates an otherwise live feed.

use crate::browser::{ClickOutcome, RenderSession, SessionProvider, WaitOutcome, with_session};
use crate::error::ScrapeError;
use crate::models::{ArticleTarget, SearchJob};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

const MEDIUM_BASE: &str = "https://medium.com";

/// Container of the virtualized search result list on the rendered page.
const RESULT_LIST: &str = "/html/body/div[1]/div/div[3]/div[2]/div/main/div/div/div[2]/div";

/// The affordance that makes the feed render another batch.
const SHOW_MORE_BUTTON: &str = "//button[text()='Show more']";

fn result_item_selector(position: usize) -> String {
    format!("{RESULT_LIST}/div[{}]", position + 1)
}

fn result_link_selector(position: usize) -> String {
    format!("{}//a[h2]", result_item_selector(position))
}

/// Configured retry maxima and the per-round element wait.
#[derive(Debug, Clone, Copy)]
pub struct DiscoveryLimits {
    pub local_retries: u32,
    pub global_retries: u32,
    pub element_wait: Duration,
}

impl Default for DiscoveryLimits {
    fn default() -> Self {
        Self {
            local_retries: 3,
            global_retries: 3,
            element_wait: Duration::from_secs(3),
        }
    }
}

/// Mutable progress state for one discovery invocation, threaded explicitly
/// through the loop. Invariant: `scraped <= target_count`; the loop exits
/// when they are equal or `global_retries` reaches zero.
#[derive(Debug, Clone, Copy)]
struct DiscoveryCursor {
    position: usize,
    scraped: usize,
    local_retries: u32,
    global_retries: u32,
}

impl DiscoveryCursor {
    fn new(limits: &DiscoveryLimits) -> Self {
        Self {
            position: 0,
            scraped: 0,
            local_retries: limits.local_retries,
            global_retries: limits.global_retries,
        }
    }
}

/// Discover up to `job.target_count` article targets for one keyword.
///
/// The rendering session for the search view is scoped to this invocation
/// and released on every exit path.
#[instrument(level = "info", skip_all, fields(keyword = %job.keyword))]
pub async fn discover_targets(
    provider: &dyn SessionProvider,
    job: &SearchJob,
    limits: &DiscoveryLimits,
) -> Result<Vec<ArticleTarget>, ScrapeError> {
    let search_url = format!(
        "{MEDIUM_BASE}/search?q={}",
        urlencoding::encode(&job.keyword)
    );
    info!(target = job.target_count, %search_url, "Starting discovery");

    with_session(provider, &search_url, |session| async move {
        run_discovery(session.as_ref(), job, limits).await
    })
    .await
}

async fn run_discovery(
    session: &dyn RenderSession,
    job: &SearchJob,
    limits: &DiscoveryLimits,
) -> Result<Vec<ArticleTarget>, ScrapeError> {
    let base = Url::parse(MEDIUM_BASE)?;
    let mut cursor = DiscoveryCursor::new(limits);
    let mut targets = Vec::new();

    while cursor.scraped < job.target_count {
        if cursor.global_retries == 0 {
            info!(
                scraped = cursor.scraped,
                "Retry budget exhausted; declaring feed exhausted"
            );
            break;
        }

        let item_selector = result_item_selector(cursor.position);
        let found = match session.query_text_all(&item_selector).await {
            Ok(matches) => !matches.is_empty(),
            Err(e) => {
                warn!(
                    position = cursor.position,
                    error = %e,
                    "Element lookup failed; treating position as missing"
                );
                false
            }
        };

        if !found {
            let recovered = try_load_more(session, &item_selector, &mut cursor, limits).await;
            if !recovered {
                cursor.global_retries -= 1;
                info!(
                    position = cursor.position,
                    remaining = cursor.global_retries,
                    "No element at position after local retries"
                );
                cursor.position += 1;
                continue;
            }
            debug!(position = cursor.position, "Element appeared after load-more");
        }

        // Any found or recovered element refills both retry budgets.
        cursor.local_retries = limits.local_retries;
        cursor.global_retries = limits.global_retries;

        match session
            .query_attr(&result_link_selector(cursor.position), "href")
            .await
        {
            Ok(Some(href)) => match base.join(&href) {
                Ok(link) => {
                    info!(position = cursor.position, %link, "Discovered article");
                    targets.push(ArticleTarget {
                        url: link.to_string(),
                        origin_keyword: job.keyword.clone(),
                    });
                    cursor.scraped += 1;
                }
                Err(e) => {
                    warn!(
                        position = cursor.position,
                        %href,
                        error = %e,
                        "Discarding malformed link"
                    );
                }
            },
            // An article block without a parseable link is skipped, not
            // retried.
            Ok(None) => debug!(position = cursor.position, "No link in result block; skipping"),
            Err(e) => {
                warn!(
                    position = cursor.position,
                    error = %e,
                    "Link extraction failed; skipping position"
                );
            }
        }
        cursor.position += 1;
    }

    info!(
        scraped = cursor.scraped,
        positions = cursor.position,
        "Discovery finished"
    );
    Ok(targets)
}

/// Trigger the load-more affordance and wait for the element at the current
/// position, up to the cursor's remaining local budget. Returns whether the
/// element appeared.
async fn try_load_more(
    session: &dyn RenderSession,
    item_selector: &str,
    cursor: &mut DiscoveryCursor,
    limits: &DiscoveryLimits,
) -> bool {
    while cursor.local_retries > 0 {
        match session.click(SHOW_MORE_BUTTON).await {
            Ok(ClickOutcome::Clicked) => debug!("Clicked show-more"),
            Ok(ClickOutcome::ElementAbsent) => debug!("Show-more button absent"),
            Err(e) => warn!(error = %e, "Show-more click failed"),
        }
        match session.wait_for(item_selector, limits.element_wait).await {
            Ok(WaitOutcome::Appeared) => return true,
            Ok(WaitOutcome::TimedOut) => {
                cursor.local_retries -= 1;
                warn!(
                    remaining = cursor.local_retries,
                    "Timed out waiting for result element"
                );
            }
            Err(e) => {
                cursor.local_retries -= 1;
                warn!(
                    remaining = cursor.local_retries,
                    error = %e,
                    "Wait for result element failed"
                );
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Index encoded in a generated selector (`.../div[N]` → N-1).
    fn position_of(selector: &str) -> usize {
        let idx = selector.rfind("div[").expect("no index in selector");
        let rest = &selector[idx + 4..];
        let end = rest.find(']').unwrap();
        rest[..end].parse::<usize>().unwrap() - 1
    }

    struct FeedState {
        visible: usize,
        pending_reveal: bool,
    }

    /// Scripted virtualized feed: `items[i]` is the link of block `i`
    /// (`None` = block without a link). Only the first `visible` blocks are
    /// rendered; each show-more click reveals `reveal_step` more.
    struct FeedSession {
        items: Vec<Option<String>>,
        reveal_step: usize,
        state: Mutex<FeedState>,
        clicks: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl RenderSession for FeedSession {
        async fn query_text_all(&self, selector: &str) -> Result<Vec<String>, ScrapeError> {
            let pos = position_of(selector);
            let state = self.state.lock().unwrap();
            if pos < state.visible && pos < self.items.len() {
                Ok(vec!["block".to_string()])
            } else {
                Ok(vec![])
            }
        }

        async fn query_attr(
            &self,
            selector: &str,
            _attr: &str,
        ) -> Result<Option<String>, ScrapeError> {
            let pos = position_of(selector);
            let state = self.state.lock().unwrap();
            if pos < state.visible {
                Ok(self.items.get(pos).cloned().flatten())
            } else {
                Ok(None)
            }
        }

        async fn click(&self, _selector: &str) -> Result<ClickOutcome, ScrapeError> {
            self.clicks.fetch_add(1, Ordering::SeqCst);
            self.state.lock().unwrap().pending_reveal = true;
            Ok(ClickOutcome::Clicked)
        }

        async fn wait_for(
            &self,
            selector: &str,
            _timeout: Duration,
        ) -> Result<WaitOutcome, ScrapeError> {
            let pos = position_of(selector);
            let mut state = self.state.lock().unwrap();
            if state.pending_reveal {
                state.pending_reveal = false;
                state.visible = (state.visible + self.reveal_step).min(self.items.len());
            }
            if pos < state.visible {
                Ok(WaitOutcome::Appeared)
            } else {
                Ok(WaitOutcome::TimedOut)
            }
        }

        async fn close(&self) -> Result<(), ScrapeError> {
            Ok(())
        }
    }

    struct FeedProvider {
        items: Vec<Option<String>>,
        visible: usize,
        reveal_step: usize,
        clicks: Arc<AtomicUsize>,
    }

    impl FeedProvider {
        fn new(items: Vec<Option<String>>, visible: usize, reveal_step: usize) -> Self {
            Self {
                items,
                visible,
                reveal_step,
                clicks: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl SessionProvider for FeedProvider {
        async fn open(&self, _url: &str) -> Result<Box<dyn RenderSession>, ScrapeError> {
            Ok(Box::new(FeedSession {
                items: self.items.clone(),
                reveal_step: self.reveal_step,
                state: Mutex::new(FeedState {
                    visible: self.visible,
                    pending_reveal: false,
                }),
                clicks: Arc::clone(&self.clicks),
            }))
        }
    }

    fn links(n: usize) -> Vec<Option<String>> {
        (0..n).map(|i| Some(format!("/p/article-{i}"))).collect()
    }

    fn job(target_count: usize) -> SearchJob {
        SearchJob {
            keyword: "Rust".to_string(),
            target_count,
        }
    }

    fn limits() -> DiscoveryLimits {
        DiscoveryLimits {
            local_retries: 3,
            global_retries: 3,
            element_wait: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_emits_at_most_target_count() {
        let provider = FeedProvider::new(links(10), 10, 0);
        let targets = discover_targets(&provider, &job(5), &limits())
            .await
            .unwrap();

        assert_eq!(targets.len(), 5);
        assert_eq!(targets[0].url, "https://medium.com/p/article-0");
        assert_eq!(targets[0].origin_keyword, "Rust");
    }

    #[tokio::test]
    async fn test_no_duplicate_positions() {
        let provider = FeedProvider::new(links(8), 8, 0);
        let targets = discover_targets(&provider, &job(8), &limits())
            .await
            .unwrap();

        let mut urls: Vec<_> = targets.iter().map(|t| t.url.clone()).collect();
        urls.sort();
        urls.dedup();
        assert_eq!(urls.len(), 8);
    }

    #[tokio::test]
    async fn test_block_without_link_is_skipped_not_retried() {
        let items = vec![
            Some("/p/first".to_string()),
            None,
            Some("/p/third".to_string()),
        ];
        let provider = FeedProvider::new(items, 3, 0);
        let clicks = Arc::clone(&provider.clicks);

        let targets = discover_targets(&provider, &job(3), &limits())
            .await
            .unwrap();

        let urls: Vec<_> = targets.iter().map(|t| t.url.as_str()).collect();
        assert_eq!(
            urls,
            ["https://medium.com/p/first", "https://medium.com/p/third"]
        );
        // The linkless block at position 1 consumed no load-more attempts;
        // the clicks all come from the exhausted tail past position 2.
        assert_eq!(clicks.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_dead_feed_terminates_after_global_budget() {
        let provider = FeedProvider::new(vec![], 0, 0);
        let clicks = Arc::clone(&provider.clicks);

        let targets = discover_targets(&provider, &job(5), &limits())
            .await
            .unwrap();

        assert!(targets.is_empty());
        // Local rounds only run at the first missed position; once that
        // budget is gone it is never refilled without a success, so each
        // later miss burns a global retry immediately.
        assert_eq!(clicks.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_load_more_recovery_continues_scanning() {
        let provider = FeedProvider::new(links(4), 2, 2);
        let clicks = Arc::clone(&provider.clicks);

        let targets = discover_targets(&provider, &job(4), &limits())
            .await
            .unwrap();

        assert_eq!(targets.len(), 4);
        assert_eq!(clicks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_recovery_refills_both_budgets() {
        // Feed of 3, one revealed at a time: positions 1 and 2 each recover
        // through one click. The dead tail then gets a full local budget
        // again because the recovery at position 2 refilled it.
        let provider = FeedProvider::new(links(3), 1, 1);
        let clicks = Arc::clone(&provider.clicks);

        let targets = discover_targets(&provider, &job(5), &limits())
            .await
            .unwrap();

        assert_eq!(targets.len(), 3);
        assert_eq!(clicks.load(Ordering::SeqCst), 2 + 3);
    }

    #[tokio::test]
    async fn test_zero_target_emits_nothing() {
        let provider = FeedProvider::new(links(3), 3, 0);
        let targets = discover_targets(&provider, &job(0), &limits())
            .await
            .unwrap();
        assert!(targets.is_empty());
    }
}
