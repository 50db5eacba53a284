//! Utility functions for text shaping, logging, and file system checks.
//!
//! The wrap/shorten helpers reproduce the presentation transforms the feed
//! format requires: greedy 80-column word wrap for long text fields and a
//! word-boundary shortening used by the summarizer's local fallback.

use std::error::Error;
use std::fs as stdfs;
use tokio::fs;
use tracing::{info, instrument};

/// Re-express text as greedy word-wrapped lines of at most `width` chars.
///
/// Whitespace runs are collapsed to single spaces. A token longer than
/// `width` is never broken; it becomes a line on its own, so lines only
/// exceed `width` when a single unbreakable token does.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(wrap_text("one two three", 8), vec!["one two", "three"]);
/// ```
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if current.is_empty() {
            current = word.to_string();
        } else if current.chars().count() + 1 + word.chars().count() <= width {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current = word.to_string();
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Shorten text to at most `width` characters on a word boundary,
/// appending `placeholder` when anything was dropped.
///
/// Whitespace runs are collapsed first; text that already fits is returned
/// unchanged (collapsed). The placeholder counts against the width.
pub fn shorten(text: &str, width: usize, placeholder: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= width {
        return collapsed;
    }

    let marker_len = placeholder.chars().count();
    let mut kept = String::new();
    for word in collapsed.split(' ') {
        let sep = if kept.is_empty() { 0 } else { 1 };
        if kept.chars().count() + sep + word.chars().count() + marker_len > width {
            break;
        }
        if sep == 1 {
            kept.push(' ');
        }
        kept.push_str(word);
    }

    if kept.is_empty() {
        return placeholder.chars().take(width).collect();
    }
    kept + placeholder
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` bytes with an ellipsis and byte
/// count indicator appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        format!("{}…(+{} bytes)", &s[..max], s.len() - max)
    }
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if it doesn't exist, then performs a write test
/// by creating and immediately deleting a probe file.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or is not writable
/// (permission denied, read-only filesystem, etc.).
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    if let Err(e) = fs::create_dir_all(path).await {
        return Err(Box::new(e));
    }
    // Try a small sync write using std fs (simpler error surface)
    let probe_path = format!("{}/..__probe_write__", path.trim_end_matches('/'));
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}
