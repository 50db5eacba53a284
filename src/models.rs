//! Data models for discovered articles and their processed representations.
//!
//! The crawl moves through three shapes:
//! - [`SearchJob`] / [`ArticleTarget`]: what to look for and what was found
//! - [`RawRecord`]: field name → raw extracted value, built by the
//!   extraction engine one channel at a time
//! - [`BlogRecord`]: the validated, typed record handed to the JSON feed
//!
//! `BlogRecord` declares its fields in the exact order the feed expects;
//! `serde_json` preserves declaration order when serializing.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One keyword plus the number of articles wanted for it.
///
/// Created once per configured keyword at run start and consumed entirely
/// by one discovery invocation.
#[derive(Debug, Clone)]
pub struct SearchJob {
    /// The search keyword as typed in the keywords file.
    pub keyword: String,
    /// How many articles to collect before the discovery loop stops.
    pub target_count: usize,
}

/// One discovered article awaiting extraction.
#[derive(Debug, Clone)]
pub struct ArticleTarget {
    /// Absolute URL of the article.
    pub url: String,
    /// The keyword whose search feed produced this target.
    pub origin_keyword: String,
}

/// A raw value extracted for one logical field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Single-multiplicity field: first match or absence.
    Single(Option<String>),
    /// List-multiplicity field: every match, in document order.
    Many(Vec<String>),
}

/// Mapping from field name to raw extracted value.
///
/// Built incrementally by the extraction engine (static pass first, then
/// rendered fallback) and consumed exactly once by the normalization
/// pipeline.
#[derive(Debug, Default)]
pub struct RawRecord {
    values: HashMap<&'static str, FieldValue>,
}

impl RawRecord {
    pub fn set(&mut self, name: &'static str, value: FieldValue) {
        self.values.insert(name, value);
    }

    /// Whether a field should be considered empty for fallback purposes.
    ///
    /// This is deliberately a general falsy check: a missing entry, a
    /// `Single(None)`, an empty string, and an empty list all count as
    /// empty. A field whose correctly-extracted static value is `""` or
    /// `[]` is therefore indistinguishable from "not extracted" and will
    /// incur one rendered fallback query.
    pub fn is_empty(&self, name: &str) -> bool {
        match self.values.get(name) {
            None => true,
            Some(FieldValue::Single(v)) => v.as_deref().is_none_or(str::is_empty),
            Some(FieldValue::Many(v)) => v.is_empty(),
        }
    }

    /// The raw string of a single-multiplicity field, if present.
    pub fn single(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(FieldValue::Single(v)) => v.as_deref(),
            _ => None,
        }
    }

    /// The raw strings of a list-multiplicity field; empty when absent.
    pub fn many(&self, name: &str) -> &[String] {
        match self.values.get(name) {
            Some(FieldValue::Many(v)) => v.as_slice(),
            _ => &[],
        }
    }
}

/// Text that is either a single line or a sequence of wrapped lines.
///
/// Summary, title, and subtitle longer than the wrap width are re-expressed
/// as ordered lines; shorter text stays a plain string. Serialized untagged
/// so the feed carries either a string or an array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextBlock {
    Plain(String),
    Wrapped(Vec<String>),
}

/// Whether the article is gated behind a membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberOnly {
    Yes,
    No,
}

/// A fully validated article record, ready for the feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogRecord {
    pub search_term: String,
    pub title: Option<TextBlock>,
    pub subtitle: Option<TextBlock>,
    pub summary: Option<TextBlock>,
    pub tags: Vec<String>,
    pub member_only: MemberOnly,
    pub author: Option<String>,
    pub publication: Option<String>,
    pub claps: i64,
    pub comments: i64,
    /// `YYYY-MM-DD`, or the scraped text unchanged when it did not parse.
    pub publish_date: Option<String>,
    pub read_length: Option<String>,
    pub link: String,
}
