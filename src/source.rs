//! Feed loading: the spreadsheet API or a pre-fetched JSON snapshot.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::LoadError;

pub type RawRow = Vec<String>;

pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sheet {
    Movies,
    Tv,
    Config,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SheetNames {
    pub movies: String,
    pub tv: String,
    pub config: String,
}

impl Default for SheetNames {
    fn default() -> Self {
        Self { movies: "Movies".into(), tv: "TV_Shows".into(), config: "Config".into() }
    }
}

impl SheetNames {
    pub fn name(&self, sheet: Sheet) -> &str {
        match sheet {
            Sheet::Movies => &self.movies,
            Sheet::Tv => &self.tv,
            Sheet::Config => &self.config,
        }
    }
}

/// The three raw sheets. Also the on-disk snapshot format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFeed {
    #[serde(default, deserialize_with = "de_rows")]
    pub movies: Vec<RawRow>,
    #[serde(default, deserialize_with = "de_rows")]
    pub tv: Vec<RawRow>,
    #[serde(default, deserialize_with = "de_rows")]
    pub config: Vec<RawRow>,
    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl RawFeed {
    pub fn sheet(&self, sheet: Sheet) -> &[RawRow] {
        match sheet {
            Sheet::Movies => &self.movies,
            Sheet::Tv => &self.tv,
            Sheet::Config => &self.config,
        }
    }
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default, deserialize_with = "de_rows")]
    values: Vec<RawRow>,
}

// Cells are strings in the API, but hand-edited snapshots may hold numbers,
// booleans or nulls.
fn de_rows<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<RawRow>, D::Error> {
    let rows: Option<Vec<Vec<Value>>> = Option::deserialize(d)?;
    Ok(rows
        .unwrap_or_default()
        .into_iter()
        .map(|row| row.into_iter().map(cell_to_string).collect())
        .collect())
}

/// Rows of one `values.get` response body.
fn decode_range(sheet: &str, body: &str) -> Result<Vec<RawRow>, FetchError> {
    let range: ValueRange =
        serde_json::from_str(body).map_err(|source| FetchError::Decode { sheet: sheet.to_string(), source })?;
    Ok(range.values)
}

fn cell_to_string(v: Value) -> String {
    match v {
        Value::String(s) => s,
        Value::Null => String::new(),
        Value::Bool(true) => "TRUE".into(),
        Value::Bool(false) => "FALSE".into(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("spreadsheet id is not configured")]
    NotConfigured,
    #[error("request for sheet `{sheet}` failed: {source}")]
    Transport {
        sheet: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("sheet `{sheet}` returned HTTP {status}")]
    Status { sheet: String, status: reqwest::StatusCode },
    #[error("sheet `{sheet}` is not valid JSON: {source}")]
    Decode {
        sheet: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("reading snapshot {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    /// Network failures and server errors are worth another attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Transport { .. } => true,
            FetchError::Status { status, .. } => status.is_server_error() || *status == reqwest::StatusCode::TOO_MANY_REQUESTS,
            _ => false,
        }
    }
}

#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Key under which a fetched feed may be cached; `None` disables caching.
    fn cache_key(&self) -> Option<String>;
    fn sheet_name(&self, sheet: Sheet) -> String;
    async fn fetch_sheet(&self, sheet: Sheet) -> Result<Vec<RawRow>, FetchError>;
}

#[derive(Debug, Clone)]
pub struct SheetsSource {
    client: reqwest::Client,
    base: Url,
    spreadsheet_id: String,
    api_key: String,
    names: SheetNames,
}

impl SheetsSource {
    pub fn new(spreadsheet_id: &str, api_key: &str, names: SheetNames) -> anyhow::Result<Self> {
        Self::with_base(SHEETS_API_BASE, spreadsheet_id, api_key, names)
    }

    pub fn with_base(base: &str, spreadsheet_id: &str, api_key: &str, names: SheetNames) -> anyhow::Result<Self> {
        let base = Url::parse(base).with_context(|| format!("invalid sheets base url: {base}"))?;
        let client = reqwest::Client::builder()
            .user_agent(concat!("showcase/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(20))
            .build()
            .context("building http client")?;
        Ok(Self { client, base, spreadsheet_id: spreadsheet_id.trim().to_string(), api_key: api_key.trim().to_string(), names })
    }

    pub fn sheet_url(&self, sheet: Sheet) -> Result<Url, FetchError> {
        if self.spreadsheet_id.is_empty() {
            return Err(FetchError::NotConfigured);
        }
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::NotConfigured)?
            .pop_if_empty()
            .push(&self.spreadsheet_id)
            .push("values")
            .push(self.names.name(sheet));
        if !self.api_key.is_empty() {
            url.query_pairs_mut().append_pair("key", &self.api_key);
        }
        Ok(url)
    }
}

#[async_trait]
impl ContentSource for SheetsSource {
    fn cache_key(&self) -> Option<String> {
        Some(format!("sheets|{}", self.spreadsheet_id))
    }

    fn sheet_name(&self, sheet: Sheet) -> String {
        self.names.name(sheet).to_string()
    }

    async fn fetch_sheet(&self, sheet: Sheet) -> Result<Vec<RawRow>, FetchError> {
        let name = self.sheet_name(sheet);
        let url = self.sheet_url(sheet)?;
        debug!(sheet = %name, "fetching sheet");
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Transport { sheet: name.clone(), source })?;
        if !resp.status().is_success() {
            return Err(FetchError::Status { sheet: name, status: resp.status() });
        }
        let body = resp.text().await.map_err(|source| FetchError::Transport { sheet: name.clone(), source })?;
        decode_range(&name, &body)
    }
}

/// A `content.json` snapshot with `movies` / `tv` / `config` keys. The file is
/// parsed on the first successful fetch and shared by every sheet after that.
#[derive(Debug)]
pub struct SnapshotSource {
    path: PathBuf,
    feed: OnceCell<RawFeed>,
}

impl SnapshotSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), feed: OnceCell::new() }
    }

    async fn read(&self) -> Result<RawFeed, FetchError> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| FetchError::Io { path: self.path.clone(), source })?;
        debug!(path = %self.path.display(), "snapshot read");
        serde_json::from_str(&text).map_err(|source| FetchError::Decode { sheet: self.path.display().to_string(), source })
    }
}

#[async_trait]
impl ContentSource for SnapshotSource {
    fn cache_key(&self) -> Option<String> {
        None
    }

    fn sheet_name(&self, sheet: Sheet) -> String {
        match sheet {
            Sheet::Movies => "movies",
            Sheet::Tv => "tv",
            Sheet::Config => "config",
        }
        .to_string()
    }

    async fn fetch_sheet(&self, sheet: Sheet) -> Result<Vec<RawRow>, FetchError> {
        let feed = self.feed.get_or_try_init(|| self.read()).await?;
        Ok(feed.sheet(sheet).to_vec())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { retries: 2, base_delay: Duration::from_millis(500), max_delay: Duration::from_secs(10) }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self { retries: 0, ..Self::default() }
    }

    fn delay(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt)).min(self.max_delay)
    }
}

async fn fetch_required(source: &dyn ContentSource, sheet: Sheet, retry: &RetryPolicy) -> Result<Vec<RawRow>, LoadError> {
    let mut attempt = 0;
    loop {
        match source.fetch_sheet(sheet).await {
            Ok(rows) => return Ok(rows),
            Err(e) if e.is_transient() && attempt < retry.retries => {
                let wait = retry.delay(attempt);
                warn!(sheet = %source.sheet_name(sheet), error = %e, attempt = attempt + 1, ?wait, "sheet fetch failed; retrying");
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
            Err(e) => {
                return Err(LoadError::RequiredSheet { sheet: source.sheet_name(sheet), attempts: attempt + 1, source: e });
            }
        }
    }
}

/// Fetches all sheets concurrently. Movies and shows are required: if either
/// fails the whole load fails. The config sheet degrades to empty.
pub async fn load_feed(source: &dyn ContentSource, retry: &RetryPolicy) -> Result<RawFeed, LoadError> {
    let (movies, tv, config) = futures::join!(
        fetch_required(source, Sheet::Movies, retry),
        fetch_required(source, Sheet::Tv, retry),
        source.fetch_sheet(Sheet::Config),
    );
    let movies = movies?;
    let tv = tv?;
    let config = config.unwrap_or_else(|e| {
        warn!(error = %e, "optional config sheet unavailable; continuing without curated rows");
        Vec::new()
    });
    info!(movies = movies.len(), tv = tv.len(), config = config.len(), "feed loaded");
    Ok(RawFeed { movies, tv, config, updated_at: None })
}

/// Writes the feed in snapshot form, stamping `updatedAt`.
pub async fn write_snapshot(feed: &RawFeed, path: &Path) -> anyhow::Result<()> {
    let mut feed = feed.clone();
    feed.updated_at = Some(chrono::Utc::now().to_rfc3339());
    let json = serde_json::to_string(&feed)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating snapshot dir: {}", parent.display()))?;
    }
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("writing snapshot: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves canned sheets; each sheet fails a configured number of times first.
    struct Flaky {
        sheets: HashMap<&'static str, Vec<RawRow>>,
        failures: Mutex<HashMap<&'static str, u32>>,
        permanent: bool,
    }

    fn key(sheet: Sheet) -> &'static str {
        match sheet {
            Sheet::Movies => "movies",
            Sheet::Tv => "tv",
            Sheet::Config => "config",
        }
    }

    #[async_trait]
    impl ContentSource for Flaky {
        fn cache_key(&self) -> Option<String> {
            None
        }

        fn sheet_name(&self, sheet: Sheet) -> String {
            key(sheet).to_string()
        }

        async fn fetch_sheet(&self, sheet: Sheet) -> Result<Vec<RawRow>, FetchError> {
            let k = key(sheet);
            let mut failures = self.failures.lock().unwrap();
            if let Some(left) = failures.get_mut(k).filter(|n| **n > 0) {
                *left -= 1;
                let status = if self.permanent { reqwest::StatusCode::NOT_FOUND } else { reqwest::StatusCode::BAD_GATEWAY };
                return Err(FetchError::Status { sheet: k.to_string(), status });
            }
            Ok(self.sheets.get(k).cloned().unwrap_or_default())
        }
    }

    fn flaky(fail: &[(&'static str, u32)], permanent: bool) -> Flaky {
        let mut sheets = HashMap::new();
        sheets.insert("movies", vec![vec!["Title".to_string()], vec!["Heat".to_string()]]);
        sheets.insert("tv", vec![vec!["Title".to_string()]]);
        sheets.insert("config", vec![vec!["Name".to_string()]]);
        Flaky { sheets, failures: Mutex::new(fail.iter().cloned().collect()), permanent }
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried() {
        let src = flaky(&[("movies", 2)], false);
        let feed = load_feed(&src, &RetryPolicy::default()).await.unwrap();
        assert_eq!(feed.movies.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn required_failure_aborts_the_load() {
        let src = flaky(&[("tv", 1)], true);
        let err = load_feed(&src, &RetryPolicy::default()).await.unwrap_err();
        match err {
            LoadError::RequiredSheet { sheet, attempts, .. } => {
                assert_eq!(sheet, "tv");
                assert_eq!(attempts, 1);
            }
        }
    }

    #[tokio::test]
    async fn optional_config_failure_degrades_to_empty() {
        let src = flaky(&[("config", 5)], true);
        let feed = load_feed(&src, &RetryPolicy::none()).await.unwrap();
        assert!(feed.config.is_empty());
        assert_eq!(feed.movies.len(), 2);
    }

    #[test]
    fn snapshot_cells_are_stringified() {
        let json = r#"{"movies": [["Title","Year"],["Heat", 1995, null, true]], "updatedAt": "x"}"#;
        let feed: RawFeed = serde_json::from_str(json).unwrap();
        assert_eq!(feed.movies[1], vec!["Heat", "1995", "", "TRUE"]);
        assert!(feed.tv.is_empty());
        assert!(feed.config.is_empty());
    }

    #[test]
    fn missing_values_key_is_an_empty_sheet() {
        let rows = decode_range("Movies", r#"{"range": "Movies!A1:Z1000"}"#).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn sheet_body_decodes_to_rows() {
        let body = r#"{"range": "TV_Shows!A1:Z1000", "majorDimension": "ROWS", "values": [["Title", "Year"], ["Dark", "2017"]]}"#;
        let rows = decode_range("TV_Shows", body).unwrap();
        assert_eq!(rows, vec![vec!["Title", "Year"], vec!["Dark", "2017"]]);
    }

    #[test]
    fn malformed_sheet_body_names_the_sheet() {
        let err = decode_range("TV_Shows", "<html>quota</html>").unwrap_err();
        assert!(matches!(&err, FetchError::Decode { sheet, .. } if sheet == "TV_Shows"));
        assert!(!err.is_transient());
    }

    #[test]
    fn sheet_urls_are_escaped() {
        let src = SheetsSource::new("abc123", "k3y", SheetNames::default()).unwrap();
        let url = src.sheet_url(Sheet::Tv).unwrap();
        assert_eq!(url.as_str(), "https://sheets.googleapis.com/v4/spreadsheets/abc123/values/TV_Shows?key=k3y");
        let unset = SheetsSource::new("", "", SheetNames::default()).unwrap();
        assert!(matches!(unset.sheet_url(Sheet::Movies), Err(FetchError::NotConfigured)));
    }

    #[tokio::test]
    async fn snapshot_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("content.json");
        let feed = RawFeed { movies: vec![vec!["T".into()], vec!["Heat".into()]], ..Default::default() };
        write_snapshot(&feed, &path).await.unwrap();

        let src = SnapshotSource::new(&path);
        let loaded = load_feed(&src, &RetryPolicy::none()).await.unwrap();
        assert_eq!(loaded.movies, feed.movies);
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("updatedAt"));
    }

    #[tokio::test]
    async fn snapshot_file_is_parsed_once_per_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("content.json");
        let feed = RawFeed { tv: vec![vec!["T".into()], vec!["Dark".into()]], ..Default::default() };
        write_snapshot(&feed, &path).await.unwrap();

        let src = SnapshotSource::new(&path);
        assert_eq!(src.fetch_sheet(Sheet::Tv).await.unwrap(), feed.tv);
        std::fs::remove_file(&path).unwrap();
        let loaded = load_feed(&src, &RetryPolicy::none()).await.unwrap();
        assert_eq!(loaded.tv, feed.tv);

        let fresh = SnapshotSource::new(&path);
        assert!(matches!(fresh.fetch_sheet(Sheet::Movies).await, Err(FetchError::Io { .. })));
    }
}
