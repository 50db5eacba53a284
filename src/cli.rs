//! Command-line interface definitions.
//!
//! All options can be provided via command-line flags; the summarization
//! API key also falls back to the `HF_API_KEY` environment variable.

use clap::Parser;

const DEFAULT_SUMMARIZER_URL: &str =
    "https://api-inference.huggingface.co/models/facebook/bart-large-cnn";

/// Command-line arguments for the scraper.
///
/// # Examples
///
/// ```sh
/// # Crawl the keywords in keywords.yaml, five articles at a time
/// medium_search_scraper -k keywords.yaml -o output.json
///
/// # With subword token truncation for the summarizer
/// medium_search_scraper -k keywords.yaml --tokenizer bart_tokenizer.json
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// YAML file mapping search keyword -> desired article count
    #[arg(short, long)]
    pub keywords: String,

    /// Output path for the JSON feed
    #[arg(short, long, default_value = "output.json")]
    pub output: String,

    /// Maximum number of articles extracted concurrently
    #[arg(long, default_value_t = 5)]
    pub concurrency: usize,

    /// Load-more rounds attempted at one feed position before giving up on it
    #[arg(long, default_value_t = 3)]
    pub local_retries: u32,

    /// Consecutive failed positions tolerated before a feed is declared exhausted
    #[arg(long, default_value_t = 3)]
    pub global_retries: u32,

    /// Seconds to wait for a result element after triggering load-more
    #[arg(long, default_value_t = 3)]
    pub element_wait_secs: u64,

    /// Summarization service endpoint
    #[arg(long, default_value = DEFAULT_SUMMARIZER_URL)]
    pub summarizer_url: String,

    /// Bearer token for the summarization service
    #[arg(long, env = "HF_API_KEY")]
    pub summarizer_api_key: Option<String>,

    /// Path to a HuggingFace tokenizer.json used for input truncation;
    /// without it the summarizer counts whitespace tokens
    #[arg(long)]
    pub tokenizer: Option<String>,

    /// Run the browser with a visible window
    #[arg(long, default_value_t = false)]
    pub headful: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from(&[
            "medium_search_scraper",
            "--keywords",
            "./keywords.yaml",
            "--output",
            "./out.json",
        ]);

        assert_eq!(cli.keywords, "./keywords.yaml");
        assert_eq!(cli.output, "./out.json");
        assert_eq!(cli.concurrency, 5);
        assert_eq!(cli.local_retries, 3);
        assert_eq!(cli.global_retries, 3);
        assert!(!cli.headful);
    }

    #[test]
    fn test_cli_short_flags_and_defaults() {
        let cli = Cli::parse_from(&["medium_search_scraper", "-k", "kw.yaml"]);

        assert_eq!(cli.keywords, "kw.yaml");
        assert_eq!(cli.output, "output.json");
        assert!(cli.summarizer_url.contains("bart-large-cnn"));
        assert!(cli.tokenizer.is_none());
    }
}
