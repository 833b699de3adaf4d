// src/ingest/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::task::JoinHandle;

use crate::ingest::{Pipeline, RunOutcome};

/// Spawn the periodic ingestion worker. The first tick fires immediately;
/// subsequent ticks follow `interval`. A tick that lands while an earlier run
/// is still active is skipped by the pipeline's own guard.
pub fn spawn_scheduler(pipeline: Arc<Pipeline>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            match pipeline.run_once().await {
                RunOutcome::Completed(summary) => {
                    counter!("ingest_runs_total").increment(1);
                    tracing::info!(
                        target: "ingest",
                        kandilli_fetched = summary.kandilli.fetched,
                        kandilli_error = ?summary.kandilli.error,
                        afad_fetched = summary.afad.fetched,
                        afad_error = ?summary.afad.error,
                        parsed = summary.parsed,
                        resolved = summary.resolved,
                        persisted = summary.persisted,
                        skipped_duplicate = summary.skipped_duplicate,
                        errored = summary.errored,
                        "ingest tick"
                    );
                }
                RunOutcome::AlreadyRunning => {
                    tracing::warn!(target: "ingest", "previous run still active; tick skipped");
                }
            }
        }
    })
}
