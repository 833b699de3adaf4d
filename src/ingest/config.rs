// src/ingest/config.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::dedup::DedupTolerances;
use crate::resolver::DEFAULT_MAX_CENTROID_DISTANCE_DEG;

pub const ENV_CONFIG_PATH: &str = "QUAKE_CONFIG_PATH";

pub const DEFAULT_KANDILLI_URL: &str = "http://www.koeri.boun.edu.tr/scripts/lst0.asp";
pub const DEFAULT_AFAD_URL: &str = "https://deprem.afad.gov.tr/last-earthquakes.html";
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_INTERVAL_SECS: u64 = 300;

/// Runtime configuration for the ingestion service. Every field has a
/// working default, so an empty file (or no file at all) is valid.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(default)]
pub struct IngestConfig {
    pub feeds: FeedsCfg,
    pub resolver: ResolverCfg,
    pub dedup: DedupTolerances,
    pub provinces: ProvincesCfg,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FeedsCfg {
    pub kandilli_url: String,
    pub afad_url: String,
    pub fetch_timeout_secs: u64,
    pub interval_secs: u64,
}

impl Default for FeedsCfg {
    fn default() -> Self {
        Self {
            kandilli_url: DEFAULT_KANDILLI_URL.to_string(),
            afad_url: DEFAULT_AFAD_URL.to_string(),
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            interval_secs: DEFAULT_INTERVAL_SECS,
        }
    }
}

impl FeedsCfg {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ResolverCfg {
    pub max_centroid_distance_deg: f64,
}

impl Default for ResolverCfg {
    fn default() -> Self {
        Self {
            max_centroid_distance_deg: DEFAULT_MAX_CENTROID_DISTANCE_DEG,
        }
    }
}

/// Optional path to a province reference file; `None` uses the built-in set.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(default)]
pub struct ProvincesCfg {
    pub path: Option<PathBuf>,
}

impl IngestConfig {
    /// Load from an explicit path. Supports TOML or JSON formats.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading ingest config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        Self::parse(&content, ext.as_str())
    }

    /// Load using env var + fallbacks:
    /// 1) $QUAKE_CONFIG_PATH
    /// 2) config/ingest.toml
    /// 3) config/ingest.json
    /// 4) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            } else {
                return Err(anyhow!("QUAKE_CONFIG_PATH points to non-existent path"));
            }
        }
        let toml_p = PathBuf::from("config/ingest.toml");
        if toml_p.exists() {
            return Self::load_from(&toml_p);
        }
        let json_p = PathBuf::from("config/ingest.json");
        if json_p.exists() {
            return Self::load_from(&json_p);
        }
        Ok(Self::default())
    }

    fn parse(s: &str, hint_ext: &str) -> Result<Self> {
        let try_toml = hint_ext == "toml" || s.contains("[feeds]");
        if try_toml {
            if let Ok(v) = toml::from_str::<Self>(s) {
                return Ok(v);
            }
        }
        if let Ok(v) = serde_json::from_str::<Self>(s) {
            return Ok(v);
        }
        if !try_toml {
            if let Ok(v) = toml::from_str::<Self>(s) {
                return Ok(v);
            }
        }
        Err(anyhow!("unsupported ingest config format"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, fs};

    #[test]
    fn empty_toml_is_all_defaults() {
        let cfg = IngestConfig::parse("", "toml").unwrap();
        assert_eq!(cfg, IngestConfig::default());
        assert_eq!(cfg.feeds.kandilli_url, DEFAULT_KANDILLI_URL);
        assert_eq!(cfg.feeds.fetch_timeout(), Duration::from_secs(20));
        assert_eq!(cfg.resolver.max_centroid_distance_deg, 2.0);
        assert_eq!(cfg.dedup.magnitude, 0.15);
        assert_eq!(cfg.dedup.coordinate_deg, 0.02);
        assert!(cfg.provinces.path.is_none());
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let cfg = IngestConfig::parse(
            r#"
[feeds]
interval_secs = 60

[dedup]
magnitude_tolerance = 0.3
"#,
            "toml",
        )
        .unwrap();
        assert_eq!(cfg.feeds.interval_secs, 60);
        assert_eq!(cfg.feeds.kandilli_url, DEFAULT_KANDILLI_URL);
        assert_eq!(cfg.dedup.magnitude, 0.3);
        assert_eq!(cfg.dedup.coordinate_deg, 0.02);
    }

    #[test]
    fn json_form_is_accepted() {
        let cfg = IngestConfig::parse(
            r#"{"resolver": {"max_centroid_distance_deg": 1.5}, "provinces": {"path": "p.toml"}}"#,
            "json",
        )
        .unwrap();
        assert_eq!(cfg.resolver.max_centroid_distance_deg, 1.5);
        assert_eq!(cfg.provinces.path, Some(PathBuf::from("p.toml")));
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks() {
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();

        env::remove_var(ENV_CONFIG_PATH);

        // No files in temp CWD → built-in defaults
        let cfg = IngestConfig::load_default().unwrap();
        assert_eq!(cfg, IngestConfig::default());

        // Env var takes precedence
        let p = tmp.path().join("quake.toml");
        fs::write(&p, "[feeds]\ninterval_secs = 15\n").unwrap();
        env::set_var(ENV_CONFIG_PATH, p.display().to_string());
        let cfg2 = IngestConfig::load_default().unwrap();
        assert_eq!(cfg2.feeds.interval_secs, 15);
        env::remove_var(ENV_CONFIG_PATH);

        env::set_current_dir(&old).unwrap();
    }
}
