//! Marmara Quake Monitor — Binary Entrypoint
//! Boots the periodic ingestion worker against the live Kandilli and AFAD
//! feeds, an in-memory event store, and structured logging.
//!
//! See `README.md` for quickstart and configuration.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use marmara_quake_monitor::ingest::config::IngestConfig;
use marmara_quake_monitor::ingest::providers::{
    afad_html::AfadHtmlProvider, kandilli_text::KandilliTextProvider,
};
use marmara_quake_monitor::ingest::scheduler::spawn_scheduler;
use marmara_quake_monitor::ingest::Pipeline;
use marmara_quake_monitor::provinces::ProvinceSet;
use marmara_quake_monitor::store::MemoryStore;

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ingest=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = IngestConfig::load_default().context("loading ingest config")?;

    // A configured province file must load; only its absence falls back to
    // the built-in set.
    let provinces = match &cfg.provinces.path {
        Some(path) => ProvinceSet::from_file(path)
            .with_context(|| format!("loading province set from {}", path.display()))?,
        None => ProvinceSet::marmara(),
    };
    let province_count = provinces.len();

    let kandilli =
        KandilliTextProvider::from_url(&cfg.feeds.kandilli_url, cfg.feeds.fetch_timeout())?;
    let afad = AfadHtmlProvider::from_url(&cfg.feeds.afad_url, cfg.feeds.fetch_timeout())?;

    let store = Arc::new(MemoryStore::new());
    let pipeline = Arc::new(Pipeline::new(
        Box::new(kandilli),
        Box::new(afad),
        provinces,
        store,
        &cfg,
    ));

    tracing::info!(
        target: "ingest",
        interval_secs = cfg.feeds.interval_secs,
        provinces = province_count,
        "quake monitor started"
    );

    let handle = spawn_scheduler(pipeline, cfg.feeds.interval());
    handle.await.context("scheduler task ended")?;
    Ok(())
}
