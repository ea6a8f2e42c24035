//! Run configuration: source list, endpoint templates, channel metadata.
//!
//! Everything the pipeline needs is carried in an explicit [`Config`] value
//! passed into the entry point; there is no process-wide mutable state.
//! Built-in defaults describe the production deployment, and any section
//! can be overridden from a YAML file.

use crate::models::Source;
use serde::Deserialize;
use std::error::Error;
use tracing::info;

/// Runtime configuration for one harvesting run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Teachers whose listing feeds are harvested, in output order.
    pub sources: Vec<Source>,
    /// Subcategory filter shared by every source.
    pub subcategory_id: u32,
    /// Listing feed URL template with `{teacher_id}`, `{subcategory_id}`
    /// and `{sort}` placeholders.
    pub listing_url: String,
    /// Channel header of the produced feed.
    pub channel: ChannelConfig,
    /// Per-worker courtesy delay after each detail fetch, in milliseconds.
    /// Zero disables the throttle.
    pub detail_throttle_ms: u64,
    /// FTP endpoint the finished feed is pushed to. Absent means no upload.
    pub delivery: Option<DeliveryConfig>,
}

/// Channel-level fields of the produced feed.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub title: String,
    pub link: String,
    pub description: String,
    pub language: String,
}

/// FTP delivery endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryConfig {
    pub host: String,
    pub username: String,
    pub password: String,
    pub remote_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources: vec![
                Source { teacher_id: 82281, name: "Rabbi Yoni Mandelstam".to_string() },
                Source { teacher_id: 80254, name: "Rabbi Chaim Marcus".to_string() },
                Source { teacher_id: 82280, name: "Rabbi Jonathan Muskat".to_string() },
                Source { teacher_id: 80288, name: "Rabbi Avishai David".to_string() },
            ],
            subcategory_id: 234553,
            listing_url: "https://www.yutorah.org/search/rss?q=&f=teacherid:{teacher_id},subcategoryid:{subcategory_id},teacherishidden:0&s={sort}"
                .to_string(),
            channel: ChannelConfig::default(),
            detail_throttle_ms: 100,
            delivery: None,
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            title: "My Shiurim Podcast".to_string(),
            link: "https://binjomin.hu/".to_string(),
            description: "A collection of parasha from YT / YuT.".to_string(),
            language: "en-us".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from an optional YAML file, falling back to the
    /// built-in defaults when no path is given.
    pub fn load(path: Option<&str>) -> Result<Self, Box<dyn Error>> {
        match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                let config: Config = serde_yaml::from_str(&raw)?;
                info!(path, sources = config.sources.len(), "loaded configuration file");
                Ok(config)
            }
            None => Ok(Config::default()),
        }
    }
}
