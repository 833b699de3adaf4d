// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod dedup;
pub mod ingest;
pub mod provinces;
pub mod resolver;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::dedup::{is_same_occurrence, DedupTolerances};
pub use crate::ingest::types::{FeedProvider, FeedSource, RawEvent, ResolvedEvent};
pub use crate::ingest::{Pipeline, RunOutcome, RunSummary, SourceReport};
pub use crate::provinces::{ProvinceRef, ProvinceSet};
pub use crate::store::{EventStore, MemoryStore, StoredEvent};
