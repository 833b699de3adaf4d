// src/ingest/providers/afad_html.rs
//! AFAD latest-earthquakes provider (Format B).
//!
//! The feed is an HTML page whose first `<table>` lists recent events, newest
//! first: one header row, then one row per event with at least seven cells in
//! fixed order — timestamp, latitude, longitude, depth, scale type, magnitude,
//! location. Rows that do not fit the shape are skipped; a missing timestamp
//! means the event just happened, so the current wall clock stands in.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use metrics::{counter, histogram};
use once_cell::sync::OnceCell;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::ingest::types::{FeedProvider, FeedSource, RawEvent};
use crate::ingest::USER_AGENT;

/// Rows with fewer cells than this cannot carry a full event.
const MIN_CELLS: usize = 7;

pub struct AfadHtmlProvider {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

impl AfadHtmlProvider {
    /// Parse a captured page instead of fetching one.
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
            .context("building afad http client")?;
        Ok(Self {
            mode: Mode::Http {
                url: url.into(),
                client,
            },
        })
    }

    fn parse_page(page: &str) -> Vec<RawEvent> {
        let t0 = std::time::Instant::now();
        let out = parse_table(page);
        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("ingest_parse_ms").record(ms);
        counter!("ingest_events_total").increment(out.len() as u64);
        out
    }
}

#[async_trait]
impl FeedProvider for AfadHtmlProvider {
    async fn fetch_latest(&self) -> Result<Vec<RawEvent>> {
        match &self.mode {
            Mode::Fixture(page) => Ok(Self::parse_page(page)),
            Mode::Http { url, client } => {
                let resp = client.get(url).send().await.context("afad http get")?;
                let status = resp.status();
                if !status.is_success() {
                    anyhow::bail!("afad returned status {status}");
                }
                let body = resp.text().await.context("afad http body")?;
                Ok(Self::parse_page(&body))
            }
        }
    }

    fn source(&self) -> FeedSource {
        FeedSource::Afad
    }
}

fn parse_table(page: &str) -> Vec<RawEvent> {
    static SEL_TABLE: OnceCell<Selector> = OnceCell::new();
    static SEL_TR: OnceCell<Selector> = OnceCell::new();
    static SEL_TD: OnceCell<Selector> = OnceCell::new();
    let sel_table = SEL_TABLE.get_or_init(|| Selector::parse("table").unwrap());
    let sel_tr = SEL_TR.get_or_init(|| Selector::parse("tr").unwrap());
    let sel_td = SEL_TD.get_or_init(|| Selector::parse("td").unwrap());

    let doc = Html::parse_document(page);
    let Some(table) = doc.select(sel_table).next() else {
        tracing::warn!(target: "ingest", "afad page has no table");
        return Vec::new();
    };

    let mut out = Vec::new();
    // First row is the column header.
    for row in table.select(sel_tr).skip(1) {
        let cells: Vec<String> = row.select(sel_td).map(cell_text).collect();
        if let Some(ev) = parse_row(&cells) {
            out.push(ev);
        }
    }
    out
}

/// Visible text of one cell: entity decode, strip markup, collapse whitespace.
fn cell_text(cell: ElementRef<'_>) -> String {
    let mut out = html_escape::decode_html_entities(&cell.inner_html()).to_string();

    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();

    out.trim().to_string()
}

fn parse_row(cells: &[String]) -> Option<RawEvent> {
    if cells.len() < MIN_CELLS {
        return None;
    }

    // Timestamps are feed-local wall clock and pass through verbatim; an
    // unreadable one means a just-registered event, stamped "now".
    let occurred_at = NaiveDateTime::parse_from_str(&cells[0], "%Y-%m-%d %H:%M:%S")
        .unwrap_or_else(|_| Local::now().naive_local());

    let latitude = parse_finite(&cells[1])?;
    let longitude = parse_finite(&cells[2])?;
    let depth_km = parse_finite(&cells[3])?;
    // cells[4] is the scale-type label (ML, Mw, ...); the value is what counts.
    let magnitude = parse_finite(&cells[5])?;
    let location_text = cells[6].clone();

    Some(RawEvent {
        occurred_at,
        latitude,
        longitude,
        depth_km,
        magnitude,
        location_text,
        source: FeedSource::Afad,
    })
}

fn parse_finite(tok: &str) -> Option<f64> {
    tok.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &str) -> String {
        format!("<html><body><table><tr><th>Date</th></tr>{rows}</table></body></html>")
    }

    #[test]
    fn well_formed_row_parses_verbatim_timestamp() {
        let page = table(
            "<tr><td>2025-12-17 02:23:44</td><td>40.4219</td><td>29.1512</td>\
             <td>7.2</td><td>ML</td><td>3.1</td><td>Gemlik (Bursa)</td></tr>",
        );
        let events = parse_table(&page);
        assert_eq!(events.len(), 1);
        let ev = &events[0];
        assert_eq!(
            ev.occurred_at,
            NaiveDateTime::parse_from_str("2025-12-17 02:23:44", "%Y-%m-%d %H:%M:%S").unwrap()
        );
        assert_eq!(ev.latitude, 40.4219);
        assert_eq!(ev.longitude, 29.1512);
        assert_eq!(ev.depth_km, 7.2);
        assert_eq!(ev.magnitude, 3.1);
        assert_eq!(ev.location_text, "Gemlik (Bursa)");
        assert_eq!(ev.source, FeedSource::Afad);
    }

    #[test]
    fn nested_markup_and_entities_are_cleaned() {
        let page = table(
            "<tr><td><span>2025-12-17 02:23:44</span></td><td> 40.4219 </td>\
             <td>29.1512</td><td>7.2</td><td>ML</td><td><b>3.1</b></td>\
             <td>S&#304;ND&#304;RGI (BALIKES&#304;R)</td></tr>",
        );
        let events = parse_table(&page);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].magnitude, 3.1);
        assert_eq!(events[0].location_text, "SİNDİRGI (BALIKESİR)");
    }

    #[test]
    fn short_row_is_skipped() {
        let page = table("<tr><td>2025-12-17 02:23:44</td><td>40.4</td><td>29.1</td></tr>");
        assert!(parse_table(&page).is_empty());
    }

    #[test]
    fn non_numeric_coordinate_skips_the_row() {
        let page = table(
            "<tr><td>2025-12-17 02:23:44</td><td>n/a</td><td>29.1512</td>\
             <td>7.2</td><td>ML</td><td>3.1</td><td>Gemlik (Bursa)</td></tr>",
        );
        assert!(parse_table(&page).is_empty());
    }

    #[test]
    fn missing_timestamp_falls_back_to_now() {
        let page = table(
            "<tr><td></td><td>40.4219</td><td>29.1512</td>\
             <td>7.2</td><td>ML</td><td>3.1</td><td>Gemlik (Bursa)</td></tr>",
        );
        let before = Local::now().naive_local();
        let events = parse_table(&page);
        let after = Local::now().naive_local();
        assert_eq!(events.len(), 1);
        assert!(events[0].occurred_at >= before && events[0].occurred_at <= after);
    }

    #[test]
    fn page_without_table_yields_nothing() {
        assert!(parse_table("<html><body><p>maintenance</p></body></html>").is_empty());
    }
}
