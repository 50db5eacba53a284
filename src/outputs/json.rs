//! JSON feed output.
//!
//! Serializes the run's validated records as one pretty-printed JSON array.
//! An existing file at the output path is overwritten.

use crate::models::BlogRecord;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Write every record to `output_path`, creating parent directories as
/// needed and overwriting any previous feed.
#[instrument(level = "info", skip_all, fields(path = %output_path))]
pub async fn write_records(
    records: &[BlogRecord],
    output_path: &str,
) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(records)?;

    if let Some(parent) = Path::new(output_path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }

    fs::write(output_path, json).await?;
    info!(count = records.len(), "Wrote JSON feed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MemberOnly, TextBlock};

    fn record() -> BlogRecord {
        BlogRecord {
            search_term: "Rust".to_string(),
            title: Some(TextBlock::Plain("A Title".to_string())),
            subtitle: None,
            summary: Some(TextBlock::Wrapped(vec![
                "line one".to_string(),
                "line two".to_string(),
            ])),
            tags: vec!["rust".to_string()],
            member_only: MemberOnly::No,
            author: Some("Ada".to_string()),
            publication: None,
            claps: 2500,
            comments: 0,
            publish_date: Some("2023-01-05".to_string()),
            read_length: Some("5 min".to_string()),
            link: "https://medium.com/p/abc".to_string(),
        }
    }

    #[tokio::test]
    async fn test_write_records_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir
            .path()
            .join("feed/output.json")
            .to_string_lossy()
            .to_string();

        write_records(&[record()], &path).await.unwrap();

        let written = tokio::fs::read_to_string(&path).await.unwrap();
        let parsed: Vec<BlogRecord> = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].claps, 2500);
        assert_eq!(parsed[0].search_term, "Rust");
    }

    #[tokio::test]
    async fn test_write_records_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.json").to_string_lossy().to_string();

        write_records(&[record(), record()], &path).await.unwrap();
        write_records(&[record()], &path).await.unwrap();

        let written = tokio::fs::read_to_string(&path).await.unwrap();
        let parsed: Vec<BlogRecord> = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed.len(), 1);
    }
}
