//! # Shiurcast
//!
//! A harvesting pipeline that turns YUTorah search feeds into a podcast.
//! For each configured teacher it pulls the newest-first listing feed,
//! fetches every lecture's detail page to extract the audio URL, recording
//! timestamp, and duration from the embedded player data, and writes one
//! RSS 2.0 feed with `itunes:duration` per item.
//!
//! ## Usage
//!
//! ```sh
//! shiurcast -o /srv/feeds/podcast_feed.xml
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Listing**: harvest candidate lectures from each source's RSS feed
//! 2. **Enrichment**: fetch detail pages (4 at a time) and extract the
//!    player fields; failures keep their record with empty fields
//! 3. **Synthesis**: serialize the podcast feed and write it to disk
//! 4. **Delivery**: optionally push the file to an FTP endpoint

use chrono::Utc;
use clap::Parser;
use std::error::Error;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod delivery;
mod extract;
mod feed;
mod fetch;
mod listing;
mod models;
mod utils;

use cli::Cli;
use config::Config;
use fetch::FetchClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("shiurcast starting up");

    let args = Cli::parse();
    debug!(?args.output, ?args.config, ?args.limit, "parsed CLI arguments");

    let config = Config::load(args.config.as_deref())?;
    info!(sources = config.sources.len(), "configuration ready");

    // Early check: the output location is the one thing worth failing for
    let output_dir = match Path::new(&args.output).parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_string_lossy().into_owned(),
        _ => ".".to_string(),
    };
    if let Err(e) = utils::ensure_writable_dir(&output_dir).await {
        error!(
            path = %output_dir,
            error = %e,
            "output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let client = FetchClient::default();

    // ---- Harvest listing feeds ----
    let lectures = listing::fetch_listings(&client, &config).await;

    // ---- Enrich from detail pages ----
    let throttle = Duration::from_millis(config.detail_throttle_ms);
    let enriched = extract::enrich_details(&client, lectures, args.limit, throttle).await;

    // ---- Synthesize and write the feed ----
    let xml = feed::build_feed(&config.channel, &enriched, Utc::now())?;
    tokio::fs::write(&args.output, &xml).await?;
    info!(
        path = %args.output,
        items = enriched.len(),
        bytes = xml.len(),
        "wrote podcast feed"
    );

    // ---- Delivery ----
    if args.no_upload {
        info!("delivery disabled on the command line");
    } else {
        delivery::upload(Path::new(&args.output), config.delivery.as_ref()).await;
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "execution complete"
    );

    Ok(())
}
