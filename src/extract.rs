//! Extraction engine: builds a raw record for one article target using the
//! cheapest sufficient channel per field.
//!
//! Two phases, strictly ordered:
//! 1. **Static pass** — every descriptor is applied to the already-fetched,
//!    non-rendered document.
//! 2. **Rendered fallback** — only the fields still empty after the whole
//!    static pass are queried against the live page, one concurrent query
//!    per field, joined before merging. Each query writes to a disjoint
//!    field, so no fallback result depends on another's.
//!
//! Before either phase trusts the page, the engine dismisses the membership
//! interstitial if one is up (failure-tolerant, idempotent) and waits for
//! the body-content marker; a page that never settles is abandoned as a
//! hard failure for this target only.

use crate::browser::{ClickOutcome, RenderSession, SessionProvider, Transport, WaitOutcome,
                     with_session};
use crate::error::ScrapeError;
use crate::fields::{FIELDS, FieldDescriptor, Multiplicity};
use crate::models::{ArticleTarget, FieldValue, RawRecord};
use futures::future;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, instrument};

/// Close button of the membership interstitial, when one renders.
const DISMISS_BUTTON: &str =
    "/html/body/div[1]/div/div[3]/div[2]/div[4]/div/div/div/div[1]/div[1]/div/button";

/// Marker that the article body has actually rendered.
const BODY_MARKER: &str = "//p[contains(@class, 'pw-post-body-paragraph')]";

const SETTLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Extract a raw record covering every field descriptor.
///
/// After a successful return every descriptor has been attempted by at
/// least one channel; fields are empty only if absent from both. The
/// rendering session is released regardless of outcome.
#[instrument(level = "info", skip_all, fields(url = %target.url))]
pub async fn extract_record(
    transport: &dyn Transport,
    provider: &dyn SessionProvider,
    target: &ArticleTarget,
) -> Result<RawRecord, ScrapeError> {
    let document = transport.fetch(&target.url).await?;

    with_session(provider, &target.url, |session| async move {
        let session = session.as_ref();
        dismiss_interstitial(session).await;

        match session.wait_for(BODY_MARKER, SETTLE_TIMEOUT).await? {
            WaitOutcome::Appeared => {}
            WaitOutcome::TimedOut => {
                return Err(ScrapeError::PageNeverSettled {
                    url: target.url.clone(),
                });
            }
        }

        let mut record = static_pass(&document)?;

        let missing: Vec<&FieldDescriptor> =
            FIELDS.iter().filter(|d| record.is_empty(d.name)).collect();
        debug!(missing = missing.len(), "Fields empty after static pass");

        let lookups = missing.iter().map(|d| rendered_lookup(session, d));
        for (descriptor, outcome) in missing.iter().zip(future::join_all(lookups).await) {
            match outcome {
                Ok(value) => record.set(descriptor.name, value),
                Err(e) => debug!(
                    field = descriptor.name,
                    error = %e,
                    "Rendered fallback failed; leaving field empty"
                ),
            }
        }

        Ok(record)
    })
    .await
}

/// Apply every descriptor's static selector to the fetched document.
fn static_pass(document: &str) -> Result<RawRecord, ScrapeError> {
    let html = Html::parse_document(document);
    let mut record = RawRecord::default();

    for descriptor in FIELDS.iter() {
        let selector = Selector::parse(descriptor.static_selector)
            .map_err(|e| ScrapeError::Selector(e.to_string()))?;
        let mut texts = html
            .select(&selector)
            .map(|el| el.text().collect::<String>());

        let value = match descriptor.multiplicity {
            Multiplicity::List => FieldValue::Many(texts.collect()),
            Multiplicity::Single => FieldValue::Single(match descriptor.exact_text {
                Some(literal) => texts
                    .find(|t| t.trim() == literal)
                    .map(|t| t.trim().to_string()),
                None => texts.next(),
            }),
        };
        record.set(descriptor.name, value);
    }

    Ok(record)
}

/// Query one field on the rendered channel.
async fn rendered_lookup(
    session: &dyn RenderSession,
    descriptor: &FieldDescriptor,
) -> Result<FieldValue, ScrapeError> {
    let texts = session.query_text_all(descriptor.rendered_selector).await?;
    Ok(match descriptor.multiplicity {
        Multiplicity::List => FieldValue::Many(texts),
        Multiplicity::Single => FieldValue::Single(match descriptor.exact_text {
            Some(literal) => texts
                .into_iter()
                .find(|t| t.trim() == literal)
                .map(|t| t.trim().to_string()),
            None => texts.into_iter().next(),
        }),
    })
}

/// Best-effort dismissal of the membership interstitial. Absence and
/// failure are both swallowed; the page is usable either way.
async fn dismiss_interstitial(session: &dyn RenderSession) {
    match session.click(DISMISS_BUTTON).await {
        Ok(ClickOutcome::Clicked) => debug!("Dismissed interstitial"),
        Ok(ClickOutcome::ElementAbsent) => {}
        Err(e) => debug!(error = %e, "Interstitial dismissal failed; continuing"),
    }
}
