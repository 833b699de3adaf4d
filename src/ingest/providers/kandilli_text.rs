// src/ingest/providers/kandilli_text.rs
//! Kandilli observatory bulletin provider (Format A).
//!
//! The bulletin is a monospace text table wrapped in a `<pre>` block. Data
//! lines start with `YYYY.MM.DD HH:MM:SS`; anything else in the block
//! (headers, separator rules, footnotes) is skipped, not an error. Columns
//! after the timestamp are positional: latitude, longitude, depth, then the
//! three magnitude scales `MD ML Mw` where `-.-` means "not reported", then
//! the free-text location, optionally trailed by a solution-quality
//! annotation.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use metrics::{counter, histogram};
use once_cell::sync::OnceCell;
use regex::Regex;

use crate::ingest::types::{FeedProvider, FeedSource, RawEvent};
use crate::ingest::USER_AGENT;
use crate::resolver::fold_turkish;

/// The bulletin page wraps its data region in these literal markers.
const BLOCK_BEGIN: &str = "<pre>";
const BLOCK_END: &str = "</pre>";

/// Sentinel the bulletin prints in an empty magnitude column.
const NO_VALUE: &str = "-.-";

pub struct KandilliTextProvider {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

impl KandilliTextProvider {
    /// Parse a captured bulletin page instead of fetching one.
    pub fn from_fixture(page: &str) -> Self {
        Self {
            mode: Mode::Fixture(page.to_string()),
        }
    }

    pub fn from_url(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("building kandilli http client")?;
        Ok(Self {
            mode: Mode::Http {
                url: url.into(),
                client,
            },
        })
    }

    fn parse_page(page: &str) -> Vec<RawEvent> {
        let t0 = std::time::Instant::now();

        let out: Vec<RawEvent> = match extract_block(page) {
            Some(block) => parse_bulletin(block).collect(),
            None => {
                tracing::warn!(target: "ingest", "kandilli page has no data block");
                Vec::new()
            }
        };

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("ingest_parse_ms").record(ms);
        counter!("ingest_events_total").increment(out.len() as u64);
        out
    }
}

#[async_trait]
impl FeedProvider for KandilliTextProvider {
    async fn fetch_latest(&self) -> Result<Vec<RawEvent>> {
        match &self.mode {
            Mode::Fixture(page) => Ok(Self::parse_page(page)),
            Mode::Http { url, client } => {
                let resp = client.get(url).send().await.context("kandilli http get")?;
                let status = resp.status();
                if !status.is_success() {
                    anyhow::bail!("kandilli returned status {status}");
                }
                let body = resp.text().await.context("kandilli http body")?;
                Ok(Self::parse_page(&body))
            }
        }
    }

    fn source(&self) -> FeedSource {
        FeedSource::Kandilli
    }
}

/// Substring between the block markers; `None` rejects the whole page.
fn extract_block(page: &str) -> Option<&str> {
    let start = page.find(BLOCK_BEGIN)? + BLOCK_BEGIN.len();
    let end = page[start..].find(BLOCK_END)? + start;
    Some(&page[start..end])
}

/// Lazily parse the data region, one event per well-formed line. Skipping is
/// the normal outcome for header/separator lines; the iterator is finite and
/// consumed in one pass — each fetch re-parses from scratch.
pub fn parse_bulletin(block: &str) -> impl Iterator<Item = RawEvent> + '_ {
    block.lines().filter_map(parse_line)
}

fn parse_line(line: &str) -> Option<RawEvent> {
    static RE_LINE: OnceCell<Regex> = OnceCell::new();
    let re = RE_LINE.get_or_init(|| {
        Regex::new(r"^(\d{4}\.\d{2}\.\d{2})\s+(\d{2}:\d{2}:\d{2})\s+(.+)$").unwrap()
    });
    let caps = re.captures(line.trim_end())?;

    // The shape gate admits impossible dates (month 13); the parse drops them.
    let occurred_at =
        NaiveDateTime::parse_from_str(&format!("{} {}", &caps[1], &caps[2]), "%Y.%m.%d %H:%M:%S")
            .ok()?;

    let rest: Vec<&str> = caps[3].split_whitespace().collect();
    if rest.len() < 6 {
        return None;
    }
    let latitude = parse_finite(rest[0])?;
    let longitude = parse_finite(rest[1])?;
    let depth_km = parse_finite(rest[2])?;
    let magnitude = select_magnitude(rest[3], rest[4], rest[5])?;
    let location_text = location_from_tokens(&rest[6..]);

    Some(RawEvent {
        occurred_at,
        latitude,
        longitude,
        depth_km,
        magnitude,
        location_text,
        source: FeedSource::Kandilli,
    })
}

fn parse_finite(tok: &str) -> Option<f64> {
    tok.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Pick the magnitude to trust: `ML` first (the consistently populated column
/// in this bulletin), then `MD`, then `Mw`. A column is usable when it parses
/// and lies in the open (0, 10) interval. All three empty → no event.
fn select_magnitude(md: &str, ml: &str, mw: &str) -> Option<f64> {
    magnitude_column(ml)
        .or_else(|| magnitude_column(md))
        .or_else(|| magnitude_column(mw))
}

fn magnitude_column(tok: &str) -> Option<f64> {
    if tok == NO_VALUE {
        return None;
    }
    tok.parse::<f64>().ok().filter(|m| *m > 0.0 && *m < 10.0)
}

/// Join the location tokens, cutting at the first solution-quality
/// annotation: `İlksel` (preliminary) or a `REVIZE…` revision marker.
fn location_from_tokens(tokens: &[&str]) -> String {
    let mut kept = Vec::with_capacity(tokens.len());
    for tok in tokens {
        if is_annotation(tok) {
            break;
        }
        kept.push(*tok);
    }
    kept.join(" ")
}

fn is_annotation(tok: &str) -> bool {
    let folded = fold_turkish(tok);
    folded == "ILKSEL" || folded.starts_with("REVIZE")
}
