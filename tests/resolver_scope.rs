// tests/resolver_scope.rs
//
// Resolution of feed-shaped location strings against the built-in province
// set, including the geometric fallback for offshore events.

use marmara_quake_monitor::provinces::ProvinceSet;
use marmara_quake_monitor::resolver::{self, DEFAULT_MAX_CENTROID_DISTANCE_DEG};

fn resolve(set: &ProvinceSet, text: &str, lat: f64, lon: f64) -> Option<u32> {
    resolver::resolve(set, text, lat, lon, DEFAULT_MAX_CENTROID_DISTANCE_DEG).map(|p| p.id)
}

#[test]
fn feed_style_locations_resolve_by_text() {
    let set = ProvinceSet::marmara();
    // Kandilli upper-cases and strips diacritics; AFAD keeps them.
    assert_eq!(resolve(&set, "SINDIRGI (BALIKESIR)", 39.21, 28.18), Some(1));
    assert_eq!(resolve(&set, "Sındırgı (Balıkesir)", 39.22, 28.17), Some(1));
    assert_eq!(resolve(&set, "Adalar (İstanbul)", 40.87, 29.09), Some(6));
}

#[test]
fn parenthesized_segment_is_preferred() {
    let set = ProvinceSet::marmara();
    // Two province names in one string: the segment wins over the earlier
    // declared-order hit in the surrounding text.
    assert_eq!(
        resolve(&set, "BALIKESIR ACIKLARI (CANAKKALE)", 40.05, 26.90),
        Some(4)
    );
}

#[test]
fn offshore_events_fall_back_to_nearest_centroid() {
    let set = ProvinceSet::marmara();
    // No province name in the text; the coordinate is closest to Yalova.
    assert_eq!(resolve(&set, "MARMARA DENIZI", 40.7971, 29.1253), Some(11));
}

#[test]
fn out_of_region_events_stay_unresolved() {
    let set = ProvinceSet::marmara();
    assert_eq!(resolve(&set, "BASKALE (VAN)", 38.50, 43.40), None);
    assert_eq!(resolve(&set, "Meram (Konya)", 37.8716, 32.4846), None);
}

#[test]
fn widening_the_threshold_widens_coverage() {
    let set = ProvinceSet::marmara();
    // Ankara is ~2.6 degrees from the nearest covered centroid (Sakarya).
    assert!(
        resolver::resolve(&set, "", 39.9334, 32.8597, DEFAULT_MAX_CENTROID_DISTANCE_DEG)
            .is_none()
    );
    assert_eq!(
        resolver::resolve(&set, "", 39.9334, 32.8597, 5.0).map(|p| p.id),
        Some(9)
    );
}
