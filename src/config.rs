use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use tracing::debug;

use crate::normalize::{RowNormalizer, SchemaConfig};
use crate::paging::DEFAULT_PAGE_SIZE;
use crate::poster::PosterRules;
use crate::search::{FieldWeights, FuzzySearch, DEFAULT_FUZZY_THRESHOLD};
use crate::semantic::SemanticConfig;
use crate::source::{RetryPolicy, SheetNames};

pub const CONFIG_FILE: &str = "showcase.toml";

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    pub fuzzy_threshold: f64,
    pub weights: FieldWeights,
    /// Quiet window before an interactive query runs.
    pub debounce_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD, weights: FieldWeights::default(), debounce_ms: 300 }
    }
}

/// Everything tunable. Every field has a default, so an empty file is valid.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub spreadsheet_id: String,
    pub api_key: String,
    pub sheets: SheetNames,
    /// Read this snapshot instead of the live spreadsheet.
    pub snapshot: Option<PathBuf>,
    pub database_url: Option<String>,
    pub feed_ttl_secs: i64,
    pub retries: u32,
    pub retry_base_ms: u64,
    pub schema: SchemaConfig,
    pub posters: PosterRules,
    pub canonical_genres: bool,
    pub page_size: usize,
    /// Alternate movies and shows in the latest-first order.
    pub interleave_latest: bool,
    pub search: SearchConfig,
    pub semantic: SemanticConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            spreadsheet_id: String::new(),
            api_key: String::new(),
            sheets: SheetNames::default(),
            snapshot: None,
            database_url: None,
            feed_ttl_secs: 60 * 60,
            retries: 2,
            retry_base_ms: 500,
            schema: SchemaConfig::default(),
            posters: PosterRules::default(),
            canonical_genres: true,
            page_size: DEFAULT_PAGE_SIZE,
            interleave_latest: true,
            search: SearchConfig::default(),
            semantic: SemanticConfig::default(),
        }
    }
}

impl Config {
    /// Reads `path` if given (it must exist), else the platform config file if
    /// present, else defaults. Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) if !p.exists() => bail!("config file not found: {}", p.display()),
            Some(p) => Some(p.to_path_buf()),
            None => default_path().filter(|p| p.exists()),
        };
        let mut config = match file {
            Some(p) => {
                debug!(path = %p.display(), "reading config");
                Self::from_toml(&std::fs::read_to_string(&p).with_context(|| format!("reading config: {}", p.display()))?)
                    .with_context(|| format!("parsing config: {}", p.display()))?
            }
            None => Self::default(),
        };
        config.apply_env(|k| std::env::var(k).ok());
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Applies `SHOWCASE_*` overrides from `var`. Unparsable numbers are ignored.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        let var = |k: &str| var(k).filter(|v| !v.trim().is_empty());
        if let Some(v) = var("SHOWCASE_SPREADSHEET_ID") {
            self.spreadsheet_id = v;
        }
        if let Some(v) = var("SHOWCASE_API_KEY").or_else(|| var("GOOGLE_API_KEY")) {
            self.api_key = v;
        }
        if let Some(v) = var("SHOWCASE_SNAPSHOT") {
            self.snapshot = Some(PathBuf::from(v));
        }
        if let Some(v) = var("SHOWCASE_DATABASE_URL") {
            self.database_url = Some(v);
        }
        if let Some(v) = var("SHOWCASE_FEED_TTL_SECS").and_then(|s| s.parse().ok()) {
            self.feed_ttl_secs = v;
        }
        if let Some(v) = var("SHOWCASE_SEMANTIC_ENDPOINT") {
            self.semantic.endpoint = Some(v);
            self.semantic.enabled = true;
        }
        if let Some(v) = var("SHOWCASE_SEMANTIC_API_KEY") {
            self.semantic.api_key = Some(v);
        }
    }

    pub fn normalizer(&self) -> RowNormalizer {
        RowNormalizer::new(&self.schema, self.posters.clone(), self.canonical_genres)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy { retries: self.retries, base_delay: Duration::from_millis(self.retry_base_ms), ..RetryPolicy::default() }
    }

    pub fn fuzzy(&self) -> FuzzySearch {
        FuzzySearch::new(self.search.weights, self.search.fuzzy_threshold)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.search.debounce_ms)
    }
}

pub fn default_path() -> Option<PathBuf> {
    ProjectDirs::from("dev", "showcase", "showcase").map(|p| p.config_dir().join(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_file_is_all_defaults() {
        let cfg = Config::from_toml("").unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.page_size, 30);
        assert_eq!(cfg.feed_ttl_secs, 3600);
        assert_eq!(cfg.sheets.tv, "TV_Shows");
    }

    #[test]
    fn nested_sections_parse() {
        let cfg = Config::from_toml(
            r#"
            spreadsheet_id = "abc"
            page_size = 12

            [schema]
            version = "classic"

            [schema.tv]
            episodes = 14

            [search]
            fuzzy_threshold = 0.3

            [semantic]
            enabled = true
            endpoint = "https://example.test/v1:generate"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.spreadsheet_id, "abc");
        assert_eq!(cfg.page_size, 12);
        assert_eq!(cfg.schema.tv.episodes, Some(14));
        assert_eq!(cfg.search.fuzzy_threshold, 0.3);
        assert_eq!(cfg.search.debounce_ms, 300);
        assert!(cfg.semantic.enabled);
        assert_eq!(cfg.semantic.timeout_secs, 8);
    }

    #[test]
    fn env_overrides_win_and_api_key_falls_back() {
        let env: HashMap<&str, &str> = [
            ("SHOWCASE_SPREADSHEET_ID", "from-env"),
            ("GOOGLE_API_KEY", "google"),
            ("SHOWCASE_FEED_TTL_SECS", "not-a-number"),
            ("SHOWCASE_DATABASE_URL", "  "),
        ]
        .into_iter()
        .collect();
        let mut cfg = Config { spreadsheet_id: "file".into(), ..Config::default() };
        cfg.apply_env(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.spreadsheet_id, "from-env");
        assert_eq!(cfg.api_key, "google");
        assert_eq!(cfg.feed_ttl_secs, 3600);
        assert_eq!(cfg.database_url, None);
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load(Some(&dir.path().join("nope.toml"))).is_err());

        let path = dir.path().join("showcase.toml");
        std::fs::write(&path, "retries = 0\n").unwrap();
        assert_eq!(Config::load(Some(&path)).unwrap().retry_policy().retries, 0);
    }
}
