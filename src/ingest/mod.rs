// src/ingest/mod.rs
//! # Ingestion pipeline
//!
//! One run: fetch both feeds concurrently, resolve each candidate to a
//! province, drop out-of-region events, skip near-duplicates against the
//! store, persist the rest, and report counts. Failures are isolated — a dead
//! feed, an unresolvable location, or a failed insert each cost exactly what
//! they touch, never the run.

pub mod config;
pub mod providers;
pub mod scheduler;
pub mod types;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram,
};
use once_cell::sync::OnceCell;
use serde::Serialize;

use crate::dedup::DedupTolerances;
use crate::ingest::config::IngestConfig;
use crate::ingest::types::{FeedProvider, FeedSource, RawEvent, ResolvedEvent};
use crate::provinces::ProvinceSet;
use crate::resolver;
use crate::store::EventStore;

/// Sent on every feed request; some upstreams reject the default client UA.
pub(crate) const USER_AGENT: &str = concat!("marmara-quake-monitor/", env!("CARGO_PKG_VERSION"));

/// One-time metrics registration (so series carry descriptions).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_events_total", "Total events parsed from feeds.");
        describe_counter!("ingest_resolved_total", "Events resolved to a covered province.");
        describe_counter!("ingest_persisted_total", "Events written to the store.");
        describe_counter!("ingest_duplicates_total", "Events skipped as near-duplicates.");
        describe_counter!("ingest_provider_errors_total", "Feed fetch failures.");
        describe_counter!("ingest_persist_errors_total", "Per-candidate store failures.");
        describe_counter!("ingest_runs_total", "Completed pipeline runs.");
        describe_counter!("ingest_runs_skipped_total", "Runs skipped: previous still active.");
        describe_histogram!("ingest_parse_ms", "Feed parse time in milliseconds.");
        describe_histogram!("ingest_run_ms", "Full pipeline run time in milliseconds.");
        describe_gauge!(
            "ingest_pipeline_last_run_ts",
            "Unix ts when the pipeline last completed a run."
        );
    });
}

/// Per-feed slice of a run summary.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SourceReport {
    /// Candidates the feed yielded (zero when the fetch failed).
    pub fetched: usize,
    /// Fetch failure, if any, with its context chain.
    pub error: Option<String>,
}

/// Outcome of one pipeline run.
///
/// `parsed` counts every candidate entering the pipeline; `resolved` those
/// matched to a province; `resolved = persisted + skipped_duplicate + errored`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct RunSummary {
    pub kandilli: SourceReport,
    pub afad: SourceReport,
    pub parsed: usize,
    pub resolved: usize,
    pub persisted: usize,
    pub skipped_duplicate: usize,
    pub errored: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(RunSummary),
    /// A previous run is still active; nothing was fetched.
    AlreadyRunning,
}

/// The ingestion pipeline. Provider slots are fixed so every run merges
/// candidates in the same order: Kandilli first, then AFAD.
pub struct Pipeline {
    kandilli: Box<dyn FeedProvider>,
    afad: Box<dyn FeedProvider>,
    provinces: ProvinceSet,
    store: Arc<dyn EventStore>,
    tolerances: DedupTolerances,
    max_centroid_distance_deg: f64,
    running: AtomicBool,
}

impl Pipeline {
    pub fn new(
        kandilli: Box<dyn FeedProvider>,
        afad: Box<dyn FeedProvider>,
        provinces: ProvinceSet,
        store: Arc<dyn EventStore>,
        cfg: &IngestConfig,
    ) -> Self {
        Self {
            kandilli,
            afad,
            provinces,
            store,
            tolerances: cfg.dedup,
            max_centroid_distance_deg: cfg.resolver.max_centroid_distance_deg,
            running: AtomicBool::new(false),
        }
    }

    /// Run one full cycle, unless a previous one is still active — overlapping
    /// runs would race each other's duplicate checks, so the late invocation
    /// is skipped whole.
    pub async fn run_once(&self) -> RunOutcome {
        ensure_metrics_described();

        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            counter!("ingest_runs_skipped_total").increment(1);
            return RunOutcome::AlreadyRunning;
        }

        let summary = self.run_cycle().await;
        self.running.store(false, Ordering::SeqCst);
        RunOutcome::Completed(summary)
    }

    async fn run_cycle(&self) -> RunSummary {
        let t0 = std::time::Instant::now();

        // 1) Fetch both feeds concurrently; one failing never blocks the other.
        let (kandilli_res, afad_res) =
            tokio::join!(self.kandilli.fetch_latest(), self.afad.fetch_latest());
        let (kandilli_events, kandilli_report) = source_report(FeedSource::Kandilli, kandilli_res);
        let (afad_events, afad_report) = source_report(FeedSource::Afad, afad_res);

        let mut summary = RunSummary {
            kandilli: kandilli_report,
            afad: afad_report,
            parsed: kandilli_events.len() + afad_events.len(),
            ..RunSummary::default()
        };

        // 2) Resolve + dedup + persist, one candidate at a time, Kandilli
        //    before AFAD. Each insert is visible to the checks after it, so
        //    an AFAD echo of a Kandilli event persisted seconds ago is caught.
        for raw in kandilli_events.into_iter().chain(afad_events) {
            self.process_candidate(raw, &mut summary).await;
        }

        // 3) Telemetry
        let now = chrono::Utc::now().timestamp().max(0) as u64;
        counter!("ingest_resolved_total").increment(summary.resolved as u64);
        counter!("ingest_persisted_total").increment(summary.persisted as u64);
        counter!("ingest_duplicates_total").increment(summary.skipped_duplicate as u64);
        counter!("ingest_persist_errors_total").increment(summary.errored as u64);
        gauge!("ingest_pipeline_last_run_ts").set(now as f64);
        histogram!("ingest_run_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        summary
    }

    async fn process_candidate(&self, raw: RawEvent, summary: &mut RunSummary) {
        let Some(province) = resolver::resolve(
            &self.provinces,
            &raw.location_text,
            raw.latitude,
            raw.longitude,
            self.max_centroid_distance_deg,
        ) else {
            // Out of the covered region; dropping is the intended outcome.
            tracing::debug!(
                target: "ingest",
                source = %raw.source,
                location = %raw.location_text,
                "event outside covered provinces"
            );
            return;
        };
        summary.resolved += 1;
        let candidate = ResolvedEvent::from_raw(raw, province.id);

        match self
            .store
            .find_near_duplicate(&candidate, self.tolerances)
            .await
        {
            Ok(Some(existing)) => {
                tracing::debug!(
                    target: "ingest",
                    source = %candidate.source,
                    existing_id = existing.id,
                    "near-duplicate skipped"
                );
                summary.skipped_duplicate += 1;
            }
            Ok(None) => match self.store.insert(&candidate).await {
                Ok(_) => summary.persisted += 1,
                Err(e) => {
                    tracing::warn!(target: "ingest", error = ?e, "event insert failed");
                    summary.errored += 1;
                }
            },
            Err(e) => {
                tracing::warn!(target: "ingest", error = ?e, "duplicate lookup failed");
                summary.errored += 1;
            }
        }
    }
}

fn source_report(
    source: FeedSource,
    res: Result<Vec<RawEvent>>,
) -> (Vec<RawEvent>, SourceReport) {
    match res {
        Ok(events) => {
            let report = SourceReport {
                fetched: events.len(),
                error: None,
            };
            (events, report)
        }
        Err(e) => {
            tracing::warn!(target: "ingest", source = %source, error = ?e, "feed fetch failed");
            counter!("ingest_provider_errors_total").increment(1);
            let report = SourceReport {
                fetched: 0,
                error: Some(format!("{e:#}")),
            };
            (Vec::new(), report)
        }
    }
}
