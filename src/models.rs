//! Data models for harvested lectures.
//!
//! This module defines the core data structures used throughout the application:
//! - [`Source`]: A configured teacher whose listing feed is harvested
//! - [`Lecture`]: A minimally-parsed listing entry before enrichment
//! - [`EnrichedLecture`]: A lecture plus the fields pulled from its detail page
//! - [`DetailOutcome`]: How a lecture's detail fetch and extraction fared

use serde::Deserialize;

/// A configured content source: one teacher on the remote archive.
///
/// Sources are immutable configuration, not runtime state. The shared
/// subcategory id lives on the [`Config`](crate::config::Config) because it
/// is common to every source in a run.
#[derive(Debug, Clone, Deserialize)]
pub struct Source {
    /// The archive's numeric teacher identifier.
    pub teacher_id: u32,
    /// Display name, used as the feed item's author attribution.
    pub name: String,
}

/// A minimally-parsed listing entry, before detail enrichment.
#[derive(Debug, Clone)]
pub struct Lecture {
    /// Name of the source the entry was listed under.
    pub source_name: String,
    /// The lecture title as published in the listing feed.
    pub title: String,
    /// Absolute URL of the lecture's detail page.
    pub link: String,
    /// Listing description, retained verbatim.
    pub description: String,
}

/// How a lecture's detail fetch and extraction fared.
///
/// Failures are recorded here instead of raised: one bad record must never
/// abort processing of the remaining records, but tests (and logs) still
/// need to see what happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailOutcome {
    /// The player blob was found; any subset of its fields may have matched.
    Extracted,
    /// The detail page loaded but carried no player blob.
    MissingPlayerData,
    /// The detail page could not be fetched within the retry budget.
    FetchFailed,
}

/// A lecture plus the fields extracted from its detail page.
///
/// The three enrichment fields are independently optional: each one is the
/// empty string when unresolved, and a missing field never blocks the
/// others extracted from the same blob.
#[derive(Debug, Clone)]
pub struct EnrichedLecture {
    /// The candidate record this enrichment was derived from.
    pub lecture: Lecture,
    /// Absolute URL of the downloadable audio, or empty.
    pub audio_url: String,
    /// The recording timestamp as published, verbatim, or empty.
    pub recorded_at: String,
    /// Total duration as `minutes:seconds`, seconds zero-padded, or empty.
    pub duration: String,
    /// Disposition of the detail fetch for this record.
    pub outcome: DetailOutcome,
}

impl EnrichedLecture {
    /// An enrichment carrying only empty fields, for records whose detail
    /// page was unreachable or unusable.
    pub fn empty(lecture: Lecture, outcome: DetailOutcome) -> Self {
        Self {
            lecture,
            audio_url: String::new(),
            recorded_at: String::new(),
            duration: String::new(),
            outcome,
        }
    }
}
