//! Summarization adapter: wraps the external text-summarization service
//! with token-budget truncation, bounded retry, and a local fallback.
//!
//! The service rejects or mishandles over-length input, so the adapter
//! truncates on token boundaries before submission. On any non-success
//! outcome it degrades to a local shortening of the *original* text — not
//! the token-truncated one — so the fallback keeps as much information as
//! the local method allows. Summarization is never fatal to a record.

use crate::error::ScrapeError;
use crate::utils::shorten;
use rand::Rng;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

/// Width of the local fallback shortening, marker included.
const FALLBACK_WIDTH: usize = 500;
const FALLBACK_MARKER: &str = "...";

/// Output length bounds and the input token budget for one request.
#[derive(Debug, Clone, Copy)]
pub struct SummaryOptions {
    pub max_input_tokens: usize,
    pub min_output_words: usize,
    pub max_output_words: usize,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            max_input_tokens: 1024,
            min_output_words: 50,
            max_output_words: 150,
        }
    }
}

/// Truncates text to a token budget.
///
/// `Subword` uses a HuggingFace tokenizer definition, matching the
/// boundaries the summarization model itself sees. `Whitespace` is the
/// degraded mode used when no tokenizer file is configured; it counts
/// whitespace-separated tokens instead.
pub enum TokenLimiter {
    Subword(Box<tokenizers::Tokenizer>),
    Whitespace,
}

impl TokenLimiter {
    /// Load a `tokenizer.json` definition.
    pub fn from_file(path: &str) -> Result<Self, ScrapeError> {
        let tokenizer = tokenizers::Tokenizer::from_file(path)
            .map_err(|e| ScrapeError::Session(format!("tokenizer load failed: {e}")))?;
        Ok(Self::Subword(Box::new(tokenizer)))
    }

    /// Truncate `text` to at most `max_tokens` tokens.
    pub fn truncate(&self, text: &str, max_tokens: usize) -> String {
        match self {
            Self::Subword(tokenizer) => match tokenizer.encode(text, false) {
                Ok(encoding) => {
                    let ids = encoding.get_ids();
                    if ids.len() <= max_tokens {
                        return text.to_string();
                    }
                    match tokenizer.decode(&ids[..max_tokens], true) {
                        Ok(truncated) => truncated,
                        Err(e) => {
                            warn!(error = %e, "Token decode failed; using whitespace truncation");
                            whitespace_truncate(text, max_tokens)
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Tokenization failed; using whitespace truncation");
                    whitespace_truncate(text, max_tokens)
                }
            },
            Self::Whitespace => whitespace_truncate(text, max_tokens),
        }
    }
}

fn whitespace_truncate(text: &str, max_tokens: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= max_tokens {
        text.to_string()
    } else {
        words[..max_tokens].join(" ")
    }
}

#[derive(Debug, Deserialize)]
struct SummaryEntry {
    summary_text: Option<String>,
}

/// Client for the summarization service.
pub struct Summarizer {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    limiter: TokenLimiter,
    max_attempts: usize,
    base_delay: Duration,
}

impl Summarizer {
    pub fn new(endpoint: String, api_key: Option<String>, limiter: TokenLimiter) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            endpoint,
            api_key,
            limiter,
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }

    /// Override the retry policy (used to keep tests fast).
    pub fn with_retry_policy(mut self, max_attempts: usize, base_delay: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.base_delay = base_delay;
        self
    }

    /// Summarize `text` within the given bounds. Never fails: a service
    /// that stays unavailable through the retry budget yields the local
    /// shortening of the original text instead.
    #[instrument(level = "info", skip_all, fields(chars = text.len()))]
    pub async fn summarize(&self, text: &str, options: &SummaryOptions) -> String {
        let truncated = self.limiter.truncate(text, options.max_input_tokens);

        match self.request_with_backoff(&truncated, options).await {
            Ok(Some(summary)) => summary,
            Ok(None) => {
                info!("Service response carried no summary text; using truncated input");
                truncated
            }
            Err(e) => {
                warn!(error = %e, "Summarization unavailable; falling back to local shortening");
                shorten(text, FALLBACK_WIDTH, FALLBACK_MARKER)
            }
        }
    }

    async fn request_with_backoff(
        &self,
        input: &str,
        options: &SummaryOptions,
    ) -> Result<Option<String>, ScrapeError> {
        let payload = serde_json::json!({
            "inputs": input,
            "parameters": {
                "min_length": options.min_output_words,
                "max_length": options.max_output_words,
            },
        });

        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            attempt += 1;
            let mut request = self.client.post(&self.endpoint).json(&payload);
            if let Some(key) = &self.api_key {
                request = request.bearer_auth(key);
            }

            let failure: String = match request.send().await {
                Ok(response) if response.status().is_success() => {
                    let entries: Vec<SummaryEntry> = match response.json().await {
                        Ok(entries) => entries,
                        Err(e) => {
                            warn!(error = %e, "Unreadable summarization response body");
                            return Ok(None);
                        }
                    };
                    return Ok(entries.into_iter().next().and_then(|e| e.summary_text));
                }
                Ok(response) => {
                    let status = response.status();
                    let retryable = status.is_server_error()
                        || status == reqwest::StatusCode::TOO_MANY_REQUESTS;
                    if !retryable {
                        return Err(ScrapeError::Session(format!(
                            "summarization service returned {status}"
                        )));
                    }
                    format!("status {status}")
                }
                Err(e) => e.to_string(),
            };

            if attempt >= self.max_attempts {
                return Err(ScrapeError::Session(format!(
                    "summarization failed after {attempt} attempts: {failure}"
                )));
            }

            let mut delay = self.base_delay.saturating_mul(1 << (attempt - 1));
            if delay > Duration::from_secs(30) {
                delay = Duration::from_secs(30);
            }
            let jitter_ms: u64 = rand::rng().random_range(0..=250);
            let delay = delay + Duration::from_millis(jitter_ms);
            debug!(
                attempt,
                max = self.max_attempts,
                elapsed_ms = total_t0.elapsed().as_millis() as u64,
                ?delay,
                failure,
                "Summarization attempt failed; backing off"
            );
            sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn summarizer(uri: String) -> Summarizer {
        Summarizer::new(uri, None, TokenLimiter::Whitespace)
            .with_retry_policy(1, Duration::from_millis(1))
    }

    #[test]
    fn test_whitespace_truncation() {
        let limiter = TokenLimiter::Whitespace;
        assert_eq!(limiter.truncate("one two three", 5), "one two three");
        assert_eq!(limiter.truncate("one two three four", 2), "one two");
    }

    #[tokio::test]
    async fn test_successful_summary() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({
                "parameters": {"min_length": 50, "max_length": 150}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"summary_text": "A concise summary."}
            ])))
            .mount(&server)
            .await;

        let result = summarizer(server.uri())
            .summarize("A long article body.", &SummaryOptions::default())
            .await;
        assert_eq!(result, "A concise summary.");
    }

    #[tokio::test]
    async fn test_missing_summary_field_returns_truncated_input() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{}])))
            .mount(&server)
            .await;

        let options = SummaryOptions {
            max_input_tokens: 3,
            ..SummaryOptions::default()
        };
        let result = summarizer(server.uri())
            .summarize("one two three four five", &options)
            .await;
        assert_eq!(result, "one two three");
    }

    #[tokio::test]
    async fn test_service_failure_falls_back_to_local_shortening() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let original = "word ".repeat(300);
        let options = SummaryOptions {
            max_input_tokens: 10,
            ..SummaryOptions::default()
        };
        let result = summarizer(server.uri()).summarize(&original, &options).await;

        assert!(result.chars().count() <= 500);
        assert!(result.ends_with("..."));
        // The fallback derives from the original text, not the truncated
        // submission.
        assert!(result.split_whitespace().count() > 10);
    }

    #[tokio::test]
    async fn test_non_retryable_status_fails_fast() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let result = Summarizer::new(server.uri(), None, TokenLimiter::Whitespace)
            .with_retry_policy(5, Duration::from_millis(1))
            .summarize("body text", &SummaryOptions::default())
            .await;

        assert_eq!(result, "body text");
    }

    #[tokio::test]
    async fn test_retries_then_falls_back() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let result = Summarizer::new(server.uri(), None, TokenLimiter::Whitespace)
            .with_retry_policy(3, Duration::from_millis(1))
            .summarize("some body", &SummaryOptions::default())
            .await;

        assert_eq!(result, "some body");
    }
}
