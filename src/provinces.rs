//! # Province Reference Set
//!
//! The fixed list of target provinces this system is scoped to, each with a
//! canonical display name (diacritics preserved) and a reference centroid in
//! decimal degrees. Events that cannot be pinned to one of these are dropped
//! by the caller, not stored.
//!
//! - Ships with a built-in Marmara-region seed (eleven provinces).
//! - Can be loaded from a small TOML or JSON table instead.
//! - Declared order is preserved: the resolver scans it first-match-wins.

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::resolver::fold_turkish;

/// One target province: stable id, canonical name, reference centroid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvinceRef {
    pub id: u32,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

/// Immutable, declared-order collection of [`ProvinceRef`]s. Loaded once per
/// process and passed by reference into the resolver — no global state.
#[derive(Debug, Clone)]
pub struct ProvinceSet {
    refs: Vec<ProvinceRef>,
}

impl ProvinceSet {
    /// Built-in seed: the eleven Marmara-region provinces, listed in their
    /// usual alphabetical order. Centroids are province-center coordinates.
    pub fn marmara() -> Self {
        let refs = [
            (1, "Balıkesir", 39.6484, 27.8826),
            (2, "Bilecik", 40.1426, 29.9793),
            (3, "Bursa", 40.1885, 29.0610),
            (4, "Çanakkale", 40.1553, 26.4142),
            (5, "Edirne", 41.6818, 26.5623),
            (6, "İstanbul", 41.0082, 28.9784),
            (7, "Kırklareli", 41.7351, 27.2245),
            (8, "Kocaeli", 40.8533, 29.8815),
            (9, "Sakarya", 40.7569, 30.3783),
            (10, "Tekirdağ", 40.9781, 27.5117),
            (11, "Yalova", 40.6550, 29.2769),
        ]
        .into_iter()
        .map(|(id, name, lat, lon)| ProvinceRef {
            id,
            name: name.to_string(),
            lat,
            lon,
        })
        .collect();
        Self { refs }
    }

    /// Build from an explicit list, enforcing the reference-set invariants:
    /// non-empty, unique ids, unique names (compared after diacritic folding,
    /// which is how the resolver compares them), pairwise-distinct centroids.
    pub fn from_refs(refs: Vec<ProvinceRef>) -> Result<Self> {
        if refs.is_empty() {
            bail!("province reference set is empty");
        }
        for (i, a) in refs.iter().enumerate() {
            if a.name.trim().is_empty() {
                bail!("province id {} has an empty name", a.id);
            }
            for b in refs.iter().skip(i + 1) {
                if a.id == b.id {
                    bail!("duplicate province id {}", a.id);
                }
                if fold_turkish(&a.name) == fold_turkish(&b.name) {
                    bail!("duplicate province name `{}` / `{}`", a.name, b.name);
                }
                if a.lat == b.lat && a.lon == b.lon {
                    bail!(
                        "provinces `{}` and `{}` share the centroid ({}, {})",
                        a.name,
                        b.name,
                        a.lat,
                        a.lon
                    );
                }
            }
        }
        Ok(Self { refs })
    }

    /// Load from a TOML (`[[provinces]]`) or JSON (array) table.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading province table {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let refs = parse_refs(&content, &ext)?;
        Self::from_refs(refs)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProvinceRef> {
        self.refs.iter()
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    pub fn by_id(&self, id: u32) -> Option<&ProvinceRef> {
        self.refs.iter().find(|p| p.id == id)
    }
}

fn parse_refs(s: &str, hint_ext: &str) -> Result<Vec<ProvinceRef>> {
    // Try TOML first if hinted or the content looks like a TOML table.
    let try_toml = hint_ext == "toml" || s.contains("[[provinces]]");
    if try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    if let Ok(v) = parse_json(s) {
        return Ok(v);
    }
    if !try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    Err(anyhow!("unsupported province table format"))
}

fn parse_toml(s: &str) -> Result<Vec<ProvinceRef>> {
    #[derive(Deserialize)]
    struct TomlTable {
        provinces: Vec<ProvinceRef>,
    }
    let v: TomlTable = toml::from_str(s)?;
    Ok(v.provinces)
}

fn parse_json(s: &str) -> Result<Vec<ProvinceRef>> {
    let v: Vec<ProvinceRef> = serde_json::from_str(s)?;
    Ok(v)
}
