//! # Deduplication Filter
//!
//! Decides whether a candidate event is a re-report of an already-stored one.
//! Two reports describe the same physical occurrence when their timestamps
//! and provinces are equal exactly while magnitude and coordinates agree
//! within fixed tolerances: providers share the event's origin time but
//! compute slightly different magnitude/location estimates. Exact timestamp
//! equality is what keeps aftershocks with similar magnitude and location
//! from being merged.
//!
//! The tolerance values are empirical. They are configurable so operators can
//! tune them deliberately, but the defaults must not be re-derived — changing
//! them silently changes which events count as duplicates.

use serde::Deserialize;

use crate::ingest::types::ResolvedEvent;
use crate::store::StoredEvent;

pub const DEFAULT_MAGNITUDE_TOLERANCE: f64 = 0.15;
pub const DEFAULT_COORDINATE_TOLERANCE_DEG: f64 = 0.02;

/// Fuzz bounds for the same-occurrence predicate. `[dedup]` in the config.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct DedupTolerances {
    #[serde(rename = "magnitude_tolerance", default = "default_magnitude")]
    pub magnitude: f64,
    #[serde(rename = "coordinate_tolerance_deg", default = "default_coordinate")]
    pub coordinate_deg: f64,
}

fn default_magnitude() -> f64 {
    DEFAULT_MAGNITUDE_TOLERANCE
}

fn default_coordinate() -> f64 {
    DEFAULT_COORDINATE_TOLERANCE_DEG
}

impl Default for DedupTolerances {
    fn default() -> Self {
        Self {
            magnitude: DEFAULT_MAGNITUDE_TOLERANCE,
            coordinate_deg: DEFAULT_COORDINATE_TOLERANCE_DEG,
        }
    }
}

/// True when `stored` and `candidate` describe one physical event: equal
/// timestamp and province, magnitude/latitude/longitude each inside the
/// (strict) tolerance bound.
pub fn is_same_occurrence(
    stored: &StoredEvent,
    candidate: &ResolvedEvent,
    tol: DedupTolerances,
) -> bool {
    stored.occurred_at == candidate.occurred_at
        && stored.province_id == candidate.province_id
        && (stored.magnitude - candidate.magnitude).abs() < tol.magnitude
        && (stored.latitude - candidate.latitude).abs() < tol.coordinate_deg
        && (stored.longitude - candidate.longitude).abs() < tol.coordinate_deg
}
