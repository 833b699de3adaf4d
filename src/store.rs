//! # Event Store
//!
//! Boundary to the persistence collaborator. This crate only ever asks two
//! things of storage: "is there already a near-duplicate of this candidate?"
//! and "insert this one row". Rows are created once and never updated or
//! deleted here; retention is someone else's concern.
//!
//! [`MemoryStore`] is the reference implementation used by tests and the demo
//! worker. A relational store implements the same contract with a
//! per-province range query.

use std::sync::Mutex;

use anyhow::Result;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::dedup::{is_same_occurrence, DedupTolerances};
use crate::ingest::types::{FeedSource, ResolvedEvent};

/// A persisted event row, as handed back by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub id: i64,
    pub province_id: u32,
    pub occurred_at: NaiveDateTime,
    pub latitude: f64,
    pub longitude: f64,
    pub depth_km: f64,
    pub magnitude: f64,
    pub location_text: String,
    pub source: FeedSource,
}

impl StoredEvent {
    fn from_resolved(ev: &ResolvedEvent, id: i64) -> Self {
        Self {
            id,
            province_id: ev.province_id,
            occurred_at: ev.occurred_at,
            latitude: ev.latitude,
            longitude: ev.longitude,
            depth_km: ev.depth_km,
            magnitude: ev.magnitude,
            location_text: ev.location_text.clone(),
            source: ev.source,
        }
    }
}

#[async_trait::async_trait]
pub trait EventStore: Send + Sync {
    /// Return a stored event that the dedup predicate considers the same
    /// physical occurrence as `candidate`, if any exists.
    async fn find_near_duplicate(
        &self,
        candidate: &ResolvedEvent,
        tol: DedupTolerances,
    ) -> Result<Option<StoredEvent>>;

    /// Persist one event, returning its store-assigned id.
    async fn insert(&self, event: &ResolvedEvent) -> Result<i64>;
}

/// Mutex-guarded in-memory store. Inserts become visible to duplicate checks
/// immediately, which is what the in-run ordering guarantee relies on.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    rows: Vec<StoredEvent>,
    next_id: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all rows, oldest first. Test/diagnostic helper.
    pub fn snapshot(&self) -> Vec<StoredEvent> {
        self.inner.lock().expect("event store mutex poisoned").rows.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("event store mutex poisoned").rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl EventStore for MemoryStore {
    async fn find_near_duplicate(
        &self,
        candidate: &ResolvedEvent,
        tol: DedupTolerances,
    ) -> Result<Option<StoredEvent>> {
        let inner = self.inner.lock().expect("event store mutex poisoned");
        Ok(inner
            .rows
            .iter()
            .find(|row| is_same_occurrence(row, candidate, tol))
            .cloned())
    }

    async fn insert(&self, event: &ResolvedEvent) -> Result<i64> {
        let mut inner = self.inner.lock().expect("event store mutex poisoned");
        inner.next_id += 1;
        let id = inner.next_id;
        inner.rows.push(StoredEvent::from_resolved(event, id));
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn event(minute: u32) -> ResolvedEvent {
        ResolvedEvent {
            province_id: 3,
            occurred_at: NaiveDate::from_ymd_opt(2025, 12, 17)
                .unwrap()
                .and_hms_opt(2, minute, 0)
                .unwrap(),
            latitude: 40.19,
            longitude: 29.06,
            depth_km: 5.0,
            magnitude: 2.4,
            location_text: "GEMLIK (BURSA)".into(),
            source: FeedSource::Kandilli,
        }
    }

    #[tokio::test]
    async fn insert_assigns_sequential_ids() {
        let store = MemoryStore::new();
        assert_eq!(store.insert(&event(1)).await.unwrap(), 1);
        assert_eq!(store.insert(&event(2)).await.unwrap(), 2);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn near_duplicate_lookup_uses_predicate() {
        let store = MemoryStore::new();
        store.insert(&event(1)).await.unwrap();

        let tol = DedupTolerances::default();
        let mut same = event(1);
        same.magnitude += 0.1;
        assert!(store.find_near_duplicate(&same, tol).await.unwrap().is_some());

        // Different minute → different physical event.
        assert!(store
            .find_near_duplicate(&event(2), tol)
            .await
            .unwrap()
            .is_none());
    }
}
