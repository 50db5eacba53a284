//! Normalization pipeline: turns one raw record into a validated record.
//!
//! Malformed input never raises — every branch degrades to a default value
//! plus a logged diagnostic, and a record is always produced. Shapes
//! handled:
//! - counts: plain digits, or magnitude suffixes (`K`/`M`/`B`/`T`,
//!   case-insensitive) on a float prefix, truncated to integer
//! - dates: `<abbreviated month> <day>, <year>` → `YYYY-MM-DD`
//! - read length: a trailing `read` marker is stripped
//! - member-only: exact case-insensitive literal match → `Yes`, else `No`
//! - summary: paragraphs joined and summarized through the adapter
//! - presentation: summary/title/subtitle longer than 80 characters are
//!   re-expressed as wrapped lines

use crate::models::{ArticleTarget, BlogRecord, MemberOnly, RawRecord, TextBlock};
use crate::summarize::{SummaryOptions, Summarizer};
use crate::utils::{truncate_for_log, wrap_text};
use chrono::NaiveDate;
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{instrument, warn};

const WRAP_WIDTH: usize = 80;
const MEMBER_ONLY_MARKER: &str = "member-only story";
const DATE_INPUT_FORMAT: &str = "%b %d, %Y";

/// `<float><magnitude suffix>`, e.g. `2.5K` or `1m`.
static SUFFIXED_COUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+(?:\.\d+)?)\s*([KkMmBbTt])$").unwrap());

/// Normalize one raw record into a validated one.
///
/// The summary field, when present, goes through the summarization adapter;
/// everything else is pure.
#[instrument(level = "info", skip_all, fields(url = %target.url))]
pub async fn normalize_record(
    raw: RawRecord,
    target: &ArticleTarget,
    summarizer: &Summarizer,
) -> BlogRecord {
    let summary = match raw.many("summary") {
        [] => None,
        paragraphs => {
            let body = paragraphs.join("\n");
            Some(
                summarizer
                    .summarize(&body, &SummaryOptions::default())
                    .await,
            )
        }
    };

    let tags = raw
        .many("tags")
        .iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unique()
        .collect();

    BlogRecord {
        search_term: target.origin_keyword.clone(),
        title: raw.single("title").map(|t| wrap_block(t.to_string())),
        subtitle: raw.single("subtitle").map(|t| wrap_block(t.to_string())),
        summary: summary.map(wrap_block),
        tags,
        member_only: normalize_member_only(raw.single("member_only")),
        author: raw.single("author").map(str::to_string),
        publication: raw.single("publication").map(str::to_string),
        claps: parse_count(raw.single("claps"), "claps"),
        comments: parse_count(raw.single("comments"), "comments"),
        publish_date: raw.single("publish_date").map(normalize_date),
        read_length: raw.single("read_length").map(clean_read_length),
        link: target.url.clone(),
    }
}

/// Parse an engagement count. Absent → 0; digits parse directly; a
/// magnitude suffix multiplies the float prefix, truncated to integer. Any
/// other shape is a malformed-input diagnostic and yields the default.
fn parse_count(value: Option<&str>, field: &'static str) -> i64 {
    let Some(text) = value else { return 0 };

    if !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()) {
        return match text.parse() {
            Ok(n) => n,
            Err(e) => {
                warn!(field, value = text, error = %e, "Count out of range; using default");
                0
            }
        };
    }

    if let Some(caps) = SUFFIXED_COUNT.captures(text) {
        let number: f64 = caps[1].parse().unwrap_or(0.0);
        return (number * suffix_factor(&caps[2]) as f64) as i64;
    }

    warn!(
        field,
        value = %truncate_for_log(text, 120),
        "Malformed count; using default"
    );
    0
}

fn suffix_factor(suffix: &str) -> i64 {
    match suffix.to_ascii_uppercase().as_str() {
        "K" => 1_000,
        "M" => 1_000_000,
        "B" => 1_000_000_000,
        _ => 1_000_000_000_000, // T, the only remaining match
    }
}

/// `"Jan 5, 2023"` → `"2023-01-05"`. An unparseable date is left
/// byte-identical to its input.
fn normalize_date(value: &str) -> String {
    match NaiveDate::parse_from_str(value, DATE_INPUT_FORMAT) {
        Ok(date) => date.format("%Y-%m-%d").to_string(),
        Err(e) => {
            warn!(value, error = %e, "Invalid publish date format; leaving as scraped");
            value.to_string()
        }
    }
}

fn clean_read_length(value: &str) -> String {
    match value.strip_suffix("read") {
        Some(rest) => rest.trim().to_string(),
        None => value.to_string(),
    }
}

fn normalize_member_only(value: Option<&str>) -> MemberOnly {
    match value {
        Some(text) if text.to_lowercase() == MEMBER_ONLY_MARKER => MemberOnly::Yes,
        _ => MemberOnly::No,
    }
}

fn wrap_block(text: String) -> TextBlock {
    if text.chars().count() > WRAP_WIDTH {
        TextBlock::Wrapped(wrap_text(&text, WRAP_WIDTH))
    } else {
        TextBlock::Plain(text)
    }
}
