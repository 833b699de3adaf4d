// src/ingest/types.rs
use anyhow::Result;
use chrono::NaiveDateTime;
use std::fmt;

/// External feed a record came from. Order matters: run summaries and the
/// merge step always treat Kandilli results before AFAD results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedSource {
    Kandilli,
    Afad,
}

impl FeedSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedSource::Kandilli => "kandilli",
            FeedSource::Afad => "afad",
        }
    }
}

impl fmt::Display for FeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed event as it leaves a feed parser. Timestamps are the feed's own
/// local wall clock at second precision; no timezone conversion is applied.
/// Lines/rows without a usable magnitude never become a `RawEvent`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RawEvent {
    pub occurred_at: NaiveDateTime,
    pub latitude: f64,
    pub longitude: f64,
    pub depth_km: f64,
    pub magnitude: f64,
    pub location_text: String,
    pub source: FeedSource,
}

/// A raw event pinned to one of the reference provinces. Created by the
/// resolver, never mutated afterwards; either persisted or dropped.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ResolvedEvent {
    pub province_id: u32,
    pub occurred_at: NaiveDateTime,
    pub latitude: f64,
    pub longitude: f64,
    pub depth_km: f64,
    pub magnitude: f64,
    pub location_text: String,
    pub source: FeedSource,
}

impl ResolvedEvent {
    pub fn from_raw(raw: RawEvent, province_id: u32) -> Self {
        Self {
            province_id,
            occurred_at: raw.occurred_at,
            latitude: raw.latitude,
            longitude: raw.longitude,
            depth_km: raw.depth_km,
            magnitude: raw.magnitude,
            location_text: raw.location_text,
            source: raw.source,
        }
    }
}

#[async_trait::async_trait]
pub trait FeedProvider: Send + Sync {
    /// Fetch and parse the feed's current content. Each call starts from
    /// scratch; the returned batch is complete for this poll cycle.
    async fn fetch_latest(&self) -> Result<Vec<RawEvent>>;
    fn source(&self) -> FeedSource;
}
