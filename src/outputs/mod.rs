//! Output sinks for validated records.
//!
//! One sink exists: a pretty-printed JSON feed holding every record of the
//! crawl run, in the feed's fixed field order.

pub mod json;
