//! # Province Resolver
//!
//! Maps a raw event's free-text location and/or coordinates onto one of the
//! reference provinces.
//!
//! Stage 1 is textual: both the input and every reference name are folded
//! (Turkish diacritics → plain ASCII, uppercased) and compared with three
//! equivalence tests — exact, input-contains-reference,
//! reference-contains-input. A parenthesized segment, when present, is tried
//! before the whole string; references are scanned in declared order and the
//! first match wins. No scoring.
//!
//! Stage 2 is geometric and only runs when stage 1 misses: squared-degree
//! distance to each centroid, qualified by a maximum threshold, minimum wins.
//! At this regional scale no great-circle correction is needed.
//!
//! Neither stage matching means the event is outside the target region and
//! the caller drops it. That is a scope restriction, not an error.

use once_cell::sync::OnceCell;
use regex::Regex;

use crate::provinces::{ProvinceRef, ProvinceSet};

/// How far (in degrees, straight-line) an event may sit from a province
/// centroid and still be claimed by it. Empirical; do not re-derive.
pub const DEFAULT_MAX_CENTROID_DISTANCE_DEG: f64 = 2.0;

/// Fold the Turkish-specific letters to their closest ASCII equivalents and
/// uppercase everything else. `ı`/`İ` both fold to `I`, which is exactly the
/// collision the feeds' mixed-case spellings need.
pub fn fold_turkish(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            'ç' | 'Ç' => out.push('C'),
            'ğ' | 'Ğ' => out.push('G'),
            'ı' | 'İ' => out.push('I'),
            'ö' | 'Ö' => out.push('O'),
            'ş' | 'Ş' => out.push('S'),
            'ü' | 'Ü' => out.push('U'),
            _ => out.push(ch.to_ascii_uppercase()),
        }
    }
    out
}

/// Full two-stage resolution: text first, centroid fallback second.
pub fn resolve<'a>(
    provinces: &'a ProvinceSet,
    location_text: &str,
    lat: f64,
    lon: f64,
    max_distance_deg: f64,
) -> Option<&'a ProvinceRef> {
    if let Some(p) = resolve_by_text(provinces, location_text) {
        return Some(p);
    }
    resolve_by_centroid(provinces, lat, lon, max_distance_deg)
}

/// Stage 1: parenthesized segment first, then the whole folded text.
pub fn resolve_by_text<'a>(
    provinces: &'a ProvinceSet,
    location_text: &str,
) -> Option<&'a ProvinceRef> {
    let folded = fold_turkish(location_text.trim());
    if folded.is_empty() {
        // Without this guard `reference.contains("")` would hand every
        // location-less event to the first declared province.
        return None;
    }

    static RE_PAREN: OnceCell<Regex> = OnceCell::new();
    let re = RE_PAREN.get_or_init(|| Regex::new(r"\(([^)]*)\)").unwrap());

    if let Some(caps) = re.captures(&folded) {
        let segment = caps[1].trim();
        if !segment.is_empty() {
            if let Some(p) = match_by_name(provinces, segment) {
                return Some(p);
            }
        }
    }
    match_by_name(provinces, &folded)
}

/// Stage 2: nearest qualifying centroid by squared-degree distance. Strict
/// `<` keeps the first minimal reference in declared order on a tie.
pub fn resolve_by_centroid<'a>(
    provinces: &'a ProvinceSet,
    lat: f64,
    lon: f64,
    max_distance_deg: f64,
) -> Option<&'a ProvinceRef> {
    let max_sq = max_distance_deg * max_distance_deg;
    let mut best: Option<(&ProvinceRef, f64)> = None;
    for p in provinces.iter() {
        let dlat = lat - p.lat;
        let dlon = lon - p.lon;
        let d2 = dlat * dlat + dlon * dlon;
        if d2 > max_sq {
            continue;
        }
        match best {
            Some((_, best_d2)) if d2 >= best_d2 => {}
            _ => best = Some((p, d2)),
        }
    }
    best.map(|(p, _)| p)
}

/// The three equivalence tests, in declared reference order, first match wins.
fn match_by_name<'a>(provinces: &'a ProvinceSet, folded_input: &str) -> Option<&'a ProvinceRef> {
    provinces.iter().find(|p| {
        let name = fold_turkish(&p.name);
        folded_input == name || folded_input.contains(&name) || name.contains(folded_input)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set() -> ProvinceSet {
        ProvinceSet::marmara()
    }

    #[test]
    fn fold_maps_turkish_letters() {
        assert_eq!(fold_turkish("Balıkesir"), "BALIKESIR");
        assert_eq!(fold_turkish("İstanbul"), "ISTANBUL");
        assert_eq!(fold_turkish("Çanakkale"), "CANAKKALE");
        assert_eq!(fold_turkish("Tekirdağ"), "TEKIRDAG");
        assert_eq!(fold_turkish("şüı"), "SUI");
    }

    #[test]
    fn exact_and_containment_matches() {
        let s = set();
        assert_eq!(resolve_by_text(&s, "BURSA").map(|p| p.id), Some(3));
        // input contains reference
        assert_eq!(
            resolve_by_text(&s, "SINDIRGI-BALIKESIR").map(|p| p.id),
            Some(1)
        );
        // reference contains input
        assert_eq!(resolve_by_text(&s, "istanb").map(|p| p.id), Some(6));
        assert_eq!(resolve_by_text(&s, "MARMARIS"), None);
    }

    #[test]
    fn parenthesized_segment_tried_first() {
        let s = set();
        // The segment names the province even though the prefix does not.
        assert_eq!(
            resolve_by_text(&s, "Sındırgı (Balıkesir)").map(|p| p.id),
            Some(1)
        );
        // Segment matches nothing → whole text still resolves.
        assert_eq!(
            resolve_by_text(&s, "Gemlik (Körfez) Bursa").map(|p| p.id),
            Some(3)
        );
    }

    #[test]
    fn empty_text_never_matches() {
        let s = set();
        assert_eq!(resolve_by_text(&s, ""), None);
        assert_eq!(resolve_by_text(&s, "   "), None);
        assert_eq!(resolve_by_text(&s, "()"), None);
    }

    #[test]
    fn centroid_fallback_respects_threshold() {
        let s = set();
        // Right on Yalova's centroid.
        assert_eq!(
            resolve_by_centroid(&s, 40.6550, 29.2769, 2.0).map(|p| p.id),
            Some(11)
        );
        // Ankara-ish: farther than 2 degrees from every Marmara centroid.
        assert_eq!(resolve_by_centroid(&s, 39.93, 32.85, 2.0), None);
        // Same point qualifies once the threshold is loosened.
        assert!(resolve_by_centroid(&s, 39.93, 32.85, 5.0).is_some());
    }

    #[test]
    fn centroid_fallback_picks_nearest() {
        let s = set();
        // Between Bursa and Yalova, slightly closer to Bursa.
        let p = resolve_by_centroid(&s, 40.30, 29.10, 2.0).unwrap();
        assert_eq!(p.id, 3);
    }

    #[test]
    fn text_match_wins_over_coordinates() {
        let s = set();
        // Coordinates sit near Bursa, but the text names Yalova.
        let p = resolve(&s, "Çınarcık (Yalova)", 40.30, 29.10, 2.0).unwrap();
        assert_eq!(p.id, 11);
    }
}
