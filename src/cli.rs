//! Command-line interface definitions.
//!
//! All runtime knobs that are per-invocation (rather than per-deployment)
//! live here; deployment-shaped settings belong in the YAML configuration
//! file (see [`crate::config`]).

use clap::Parser;

/// Command-line arguments for the shiurcast harvester.
///
/// # Examples
///
/// ```sh
/// # Default run: built-in sources, feed written next to the binary
/// shiurcast
///
/// # Custom output path and configuration file
/// shiurcast -o /srv/feeds/podcast_feed.xml -c shiurcast.yaml
///
/// # Quick smoke run over the first three candidates, no upload
/// shiurcast --limit 3 --no-upload
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path the produced feed file is written to
    #[arg(short, long, default_value = "podcast_feed.xml")]
    pub output: String,

    /// Optional path to a YAML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Enrich only the first N candidates (all when omitted)
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Skip FTP delivery even when an endpoint is configured
    #[arg(long)]
    pub no_upload: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["shiurcast"]);
        assert_eq!(cli.output, "podcast_feed.xml");
        assert!(cli.config.is_none());
        assert!(cli.limit.is_none());
        assert!(!cli.no_upload);
    }

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from([
            "shiurcast",
            "--output",
            "/srv/feeds/feed.xml",
            "--config",
            "shiurcast.yaml",
            "--limit",
            "3",
            "--no-upload",
        ]);
        assert_eq!(cli.output, "/srv/feeds/feed.xml");
        assert_eq!(cli.config.as_deref(), Some("shiurcast.yaml"));
        assert_eq!(cli.limit, Some(3));
        assert!(cli.no_upload);
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from(["shiurcast", "-o", "/tmp/feed.xml", "-l", "5"]);
        assert_eq!(cli.output, "/tmp/feed.xml");
        assert_eq!(cli.limit, Some(5));
    }
}
