// src/config/mod.rs
//! Run configuration: every recognized option is read once at startup into
//! `AppConfig` and validated before any I/O happens.

pub mod drafting;

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ScoutError, ScoutResult};
use crate::ingest::providers::rss::TECHCRUNCH_FEED;
use crate::ingest::terms::{load_terms_from, parse_term_list};
use crate::platform::Platform;

pub use drafting::DraftingConfig;

// --- env names ---
pub const ENV_SOURCES: &str = "SCOUT_SOURCES";
pub const ENV_SEARCH_TERMS: &str = "SCOUT_SEARCH_TERMS";
pub const ENV_TERMS_PATH: &str = "SCOUT_TERMS_PATH";
pub const ENV_PLATFORMS: &str = "SCOUT_PLATFORMS";
pub const ENV_OUTPUT_DIR: &str = "SCOUT_OUTPUT_DIR";
pub const ENV_HISTORY_KEY: &str = "SCOUT_HISTORY_KEY";
pub const ENV_HISTORY_CAP: &str = "SCOUT_HISTORY_CAP";
pub const ENV_ITEM_DELAY_MS: &str = "SCOUT_ITEM_DELAY_MS";
pub const ENV_TOP_N: &str = "SCOUT_TOP_N";
pub const ENV_WEIGHTS_PATH: &str = "SCOUT_WEIGHTS_PATH";
pub const ENV_DRAFTING_CONFIG: &str = "SCOUT_DRAFTING_CONFIG";
pub const ENV_DRAFTING_MODE: &str = "SCOUT_DRAFTING_MODE";
pub const ENV_METRICS_PATH: &str = "SCOUT_METRICS_PATH";

// --- defaults ---
pub const DEFAULT_SOURCES: &str = "techcrunch,reddit:startups,reddit:sales";
pub const DEFAULT_SEARCH_TERMS: &str =
    "series a,first sales hire,founding sales,head of sales,b2b saas";
pub const DEFAULT_PLATFORMS: &str = "linkedin,twitter,email";
pub const DEFAULT_OUTPUT_DIR: &str = "output";
pub const DEFAULT_HISTORY_KEY: &str = "processed_history.json";
pub const DEFAULT_HISTORY_CAP: usize = 100;
pub const DEFAULT_ITEM_DELAY_MS: u64 = 2_000;

/// Where candidates come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    Rss { id: String, url: String },
    Reddit { subreddit: String },
}

impl SourceSpec {
    /// `techcrunch` | `reddit:<sub>` | `rss:<id>=<url>`
    pub fn parse(raw: &str) -> ScoutResult<Self> {
        let s = raw.trim();
        if s.eq_ignore_ascii_case("techcrunch") {
            return Ok(SourceSpec::Rss {
                id: "techcrunch".into(),
                url: TECHCRUNCH_FEED.into(),
            });
        }
        if let Some(sub) = s.strip_prefix("reddit:") {
            let sub = sub.trim().trim_start_matches("r/");
            if sub.is_empty() {
                return Err(ScoutError::Configuration(format!("empty subreddit in `{s}`")));
            }
            return Ok(SourceSpec::Reddit {
                subreddit: sub.to_string(),
            });
        }
        if let Some(rest) = s.strip_prefix("rss:") {
            if let Some((id, url)) = rest.split_once('=') {
                let (id, url) = (id.trim(), url.trim());
                if !id.is_empty() && (url.starts_with("http://") || url.starts_with("https://")) {
                    return Ok(SourceSpec::Rss {
                        id: id.to_ascii_lowercase(),
                        url: url.to_string(),
                    });
                }
            }
            return Err(ScoutError::Configuration(format!(
                "rss source must look like rss:<id>=<http url>, got `{s}`"
            )));
        }
        Err(ScoutError::Configuration(format!("unknown source `{s}`")))
    }

    pub fn source_id(&self) -> String {
        match self {
            SourceSpec::Rss { id, .. } => id.clone(),
            SourceSpec::Reddit { subreddit } => format!("reddit_{}", subreddit.to_ascii_lowercase()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub sources: Vec<SourceSpec>,
    pub search_terms: Vec<String>,
    pub platforms: Vec<Platform>,
    pub output_dir: PathBuf,
    pub history_key: String,
    pub history_cap: usize,
    /// Fixed pause between per-item external calls in multi-candidate runs.
    pub item_delay: Duration,
    pub top_n: usize,
    pub weights_path: Option<PathBuf>,
    pub drafting: DraftingConfig,
    /// `SCOUT_DRAFTING_MODE=mock` forces the deterministic drafting client.
    pub drafting_mock: bool,
    pub metrics_path: Option<PathBuf>,
}

impl AppConfig {
    /// Read the process environment (call `dotenvy::dotenv()` first if wanted).
    pub fn from_env() -> ScoutResult<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from any key → value lookup. Blank values count as unset.
    pub fn from_lookup<F>(get: F) -> ScoutResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| get(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let sources = get(ENV_SOURCES)
            .unwrap_or_else(|| DEFAULT_SOURCES.to_string())
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(SourceSpec::parse)
            .collect::<ScoutResult<Vec<_>>>()?;

        let mut search_terms = match get(ENV_TERMS_PATH) {
            Some(p) => load_terms_from(&PathBuf::from(&p))
                .map_err(|e| ScoutError::Configuration(format!("{e:#}")))?,
            None => Vec::new(),
        };
        if search_terms.is_empty() {
            search_terms =
                parse_term_list(&get(ENV_SEARCH_TERMS).unwrap_or_else(|| DEFAULT_SEARCH_TERMS.into()));
        }

        let platforms = parse_platforms(&get(ENV_PLATFORMS).unwrap_or_else(|| DEFAULT_PLATFORMS.into()))?;

        let history_cap = parse_num::<usize>(&get, ENV_HISTORY_CAP)?.unwrap_or(DEFAULT_HISTORY_CAP);
        let item_delay_ms = parse_num::<u64>(&get, ENV_ITEM_DELAY_MS)?.unwrap_or(DEFAULT_ITEM_DELAY_MS);
        let top_n = parse_num::<usize>(&get, ENV_TOP_N)?.unwrap_or(1);

        let drafting = match get(ENV_DRAFTING_CONFIG) {
            Some(p) => DraftingConfig::load_from_file(&p)?,
            None => DraftingConfig::default(),
        }
        .resolve(&get)?;

        let cfg = Self {
            sources,
            search_terms,
            platforms,
            output_dir: PathBuf::from(get(ENV_OUTPUT_DIR).unwrap_or_else(|| DEFAULT_OUTPUT_DIR.into())),
            history_key: get(ENV_HISTORY_KEY).unwrap_or_else(|| DEFAULT_HISTORY_KEY.into()),
            history_cap,
            item_delay: Duration::from_millis(item_delay_ms),
            top_n,
            weights_path: get(ENV_WEIGHTS_PATH).map(PathBuf::from),
            drafting,
            drafting_mock: get(ENV_DRAFTING_MODE).is_some_and(|v| v.eq_ignore_ascii_case("mock")),
            metrics_path: get(ENV_METRICS_PATH).map(PathBuf::from),
        };
        cfg.validate_shape()?;
        Ok(cfg)
    }

    fn validate_shape(&self) -> ScoutResult<()> {
        if self.sources.is_empty() {
            return Err(ScoutError::Configuration("no sources configured".into()));
        }
        if self.platforms.is_empty() {
            return Err(ScoutError::Configuration("no platforms configured".into()));
        }
        if self.history_cap == 0 {
            return Err(ScoutError::Configuration(format!("{ENV_HISTORY_CAP} must be >= 1")));
        }
        if self.top_n == 0 {
            return Err(ScoutError::Configuration(format!("{ENV_TOP_N} must be >= 1")));
        }
        if self.history_key.contains("..") || self.history_key.starts_with('/') {
            return Err(ScoutError::Configuration(format!(
                "{ENV_HISTORY_KEY} must be a relative key without `..`"
            )));
        }
        Ok(())
    }

    /// Checks that only matter when drafts will actually be requested.
    pub fn validate_for_drafting(&self) -> ScoutResult<()> {
        if self.drafting_mock {
            return Ok(());
        }
        self.drafting.validate_credentials()
    }

    pub fn state_dir(&self) -> PathBuf {
        self.output_dir.join("state")
    }

    pub fn review_dir(&self) -> PathBuf {
        self.output_dir.join("review")
    }
}

fn parse_platforms(raw: &str) -> ScoutResult<Vec<Platform>> {
    let mut out: Vec<Platform> = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let p = part.parse::<Platform>().map_err(ScoutError::Configuration)?;
        if !out.contains(&p) {
            out.push(p);
        }
    }
    Ok(out)
}

fn parse_num<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> ScoutResult<Option<T>> {
    match get(key) {
        None => Ok(None),
        Some(v) => v
            .parse::<T>()
            .map(Some)
            .map_err(|_| ScoutError::Configuration(format!("{key} must be a number, got `{v}`"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_apply_when_env_is_empty() {
        let cfg = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.sources.len(), 3);
        assert_eq!(cfg.sources[0].source_id(), "techcrunch");
        assert_eq!(cfg.sources[1].source_id(), "reddit_startups");
        assert_eq!(cfg.history_cap, DEFAULT_HISTORY_CAP);
        assert_eq!(cfg.item_delay, Duration::from_millis(DEFAULT_ITEM_DELAY_MS));
        assert_eq!(cfg.top_n, 1);
        assert_eq!(
            cfg.platforms,
            vec![Platform::LinkedIn, Platform::Twitter, Platform::Email]
        );
        assert_eq!(cfg.state_dir(), PathBuf::from("output/state"));
        assert!(!cfg.drafting_mock);
    }

    #[test]
    fn explicit_values_override_defaults() {
        let cfg = AppConfig::from_lookup(lookup(&[
            (ENV_SOURCES, "reddit:r/SaaS, rss:hn=https://hnrss.org/newest"),
            (ENV_SEARCH_TERMS, "icp, icp ,vp sales"),
            (ENV_PLATFORMS, "x,email,twitter"),
            (ENV_HISTORY_CAP, "5"),
            (ENV_ITEM_DELAY_MS, "0"),
            (ENV_TOP_N, "3"),
            (ENV_DRAFTING_MODE, "MOCK"),
        ]))
        .unwrap();
        assert_eq!(
            cfg.sources,
            vec![
                SourceSpec::Reddit {
                    subreddit: "SaaS".into()
                },
                SourceSpec::Rss {
                    id: "hn".into(),
                    url: "https://hnrss.org/newest".into()
                }
            ]
        );
        assert_eq!(cfg.search_terms, vec!["icp", "vp sales"]);
        assert_eq!(cfg.platforms, vec![Platform::Twitter, Platform::Email]);
        assert_eq!(cfg.history_cap, 5);
        assert_eq!(cfg.item_delay, Duration::ZERO);
        assert_eq!(cfg.top_n, 3);
        assert!(cfg.drafting_mock);
        cfg.validate_for_drafting().unwrap();
    }

    #[test]
    fn bad_values_are_configuration_errors() {
        for pairs in [
            vec![(ENV_SOURCES, "myspace")],
            vec![(ENV_SOURCES, "rss:nourl")],
            vec![(ENV_PLATFORMS, "fax")],
            vec![(ENV_HISTORY_CAP, "lots")],
            vec![(ENV_HISTORY_CAP, "0")],
            vec![(ENV_TOP_N, "0")],
            vec![(ENV_HISTORY_KEY, "../escape.json")],
        ] {
            let err = AppConfig::from_lookup(lookup(&pairs)).unwrap_err();
            assert!(err.is_fatal(), "{pairs:?} should be fatal, got {err}");
        }
    }

    #[test]
    fn missing_openai_key_only_matters_for_drafting() {
        let cfg = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert!(cfg.validate_for_drafting().is_err());

        let with_key = AppConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-1")])).unwrap();
        with_key.validate_for_drafting().unwrap();
    }

    #[serial_test::serial]
    #[test]
    fn from_env_reads_process_environment() {
        std::env::set_var(ENV_TOP_N, "2");
        std::env::set_var(ENV_SOURCES, "reddit:sales");
        let cfg = AppConfig::from_env().unwrap();
        std::env::remove_var(ENV_TOP_N);
        std::env::remove_var(ENV_SOURCES);
        assert_eq!(cfg.top_n, 2);
        assert_eq!(cfg.sources[0].source_id(), "reddit_sales");
    }
}
