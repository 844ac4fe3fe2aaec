pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod favorites;
pub mod filter;
pub mod genre;
pub mod model;
pub mod normalize;
pub mod paging;
pub mod poster;
pub mod rows;
pub mod search;
pub mod semantic;
pub mod session;
pub mod sort;
pub mod source;
pub mod state;
pub mod storage;
pub mod trailer;

// --- Library API for embedding ---

/// Convenience re-exports for embedders.
pub mod prelude {
    pub use crate::catalog::Catalog;
    pub use crate::config::Config;
    pub use crate::filter::ListingFilter;
    pub use crate::model::{ConfigRow, ConfigRowKind, ContentRecord, ContentType, SubtitleLabel};
    pub use crate::paging::Page;
    pub use crate::rows::HomeRow;
    pub use crate::sort::SortMode;
    pub use crate::state::{AppContext, BrowseState};
    pub use crate::{Detail, HomeView, SearchMode, SearchResults, Showcase};
}

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::config::Config;
use crate::db::Database;
use crate::favorites::FavoritesStore;
use crate::filter::ListingFilter;
use crate::model::ContentRecord;
use crate::paging::Page;
use crate::rows::HomeRow;
use crate::semantic::{GenerativeBackend, SemanticBackend};
use crate::sort::SortMode;
use crate::source::{ContentSource, RawFeed, RetryPolicy, SheetsSource, SnapshotSource};
use crate::state::AppContext;
use crate::storage::Storage;

pub const BANNER_KEY: &str = "showcase_banner";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    #[default]
    Text,
    Fuzzy,
    Semantic,
}

impl std::str::FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "substring" => Ok(SearchMode::Text),
            "fuzzy" => Ok(SearchMode::Fuzzy),
            "semantic" | "ai" => Ok(SearchMode::Semantic),
            other => Err(format!("unknown search mode `{other}` (expected text, fuzzy, semantic)")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResults<'a> {
    pub mode: SearchMode,
    pub results: Vec<&'a ContentRecord>,
    /// Semantic search was requested but substring search answered.
    pub fell_back: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct HomeView<'a> {
    pub hero: Vec<&'a ContentRecord>,
    pub rows: Vec<HomeRow<'a>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Detail<'a> {
    pub record: &'a ContentRecord,
    pub related: Vec<&'a ContentRecord>,
    /// `None` means there is no playable trailer.
    pub trailer_embed: Option<String>,
    pub favorite: bool,
}

/// Async library entry point. Owns the catalog of one load plus persisted state.
pub struct Showcase {
    config: Config,
    storage: Arc<dyn Storage>,
    catalog: Arc<Catalog>,
    favorites: FavoritesStore,
    semantic: Option<Arc<dyn SemanticBackend>>,
}

impl std::fmt::Debug for Showcase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Showcase")
            .field("records", &self.catalog.len())
            .field("favorites", &self.favorites.len())
            .field("semantic", &self.semantic.is_some())
            .finish()
    }
}

impl Showcase {
    /// Connects the database (running migrations), then loads the feed named by
    /// `config`. `refresh` skips and evicts any cached feed.
    pub async fn connect(config: Config, refresh: bool) -> Result<Self> {
        let db = Database::connect(config.database_url.as_deref()).await?;
        db.run_migrations().await?;
        let source = source_for(&config)?;
        if refresh {
            if let Some(key) = source.cache_key() {
                let removed = db.clear_cache_prefix(Some(&key)).await?;
                debug!(key = %key, removed, "feed cache evicted");
            }
        }
        Self::open(config, Arc::new(db), source.as_ref(), refresh).await
    }

    /// Builds a session over any storage and source.
    pub async fn open(config: Config, storage: Arc<dyn Storage>, source: &dyn ContentSource, refresh: bool) -> Result<Self> {
        let feed = load_cached_feed(storage.as_ref(), source, &config.retry_policy(), config.feed_ttl_secs, refresh).await?;
        let catalog = Catalog::from_feed(&feed, &config.normalizer());
        let favorites = FavoritesStore::open(storage.clone()).await?;
        let semantic = semantic_backend(&config)?;
        Ok(Self { config, storage, catalog: Arc::new(catalog), favorites, semantic })
    }

    pub fn with_semantic_backend(mut self, backend: Arc<dyn SemanticBackend>) -> Self {
        self.semantic = Some(backend);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Fresh browse state over the shared catalog.
    pub fn context(&self) -> AppContext {
        AppContext::new(self.catalog.clone(), self.config.page_size, self.config.interleave_latest)
    }

    pub async fn home(&self) -> Result<HomeView<'_>> {
        let banner = self.banner_titles().await?;
        let mut all = rows::curated_rows(&self.catalog);
        all.extend(rows::home_rows(&self.catalog));
        Ok(HomeView { hero: rows::hero(&self.catalog, &banner), rows: all })
    }

    pub fn list(&self, filter: &ListingFilter, sort: SortMode, page: usize) -> Page<&ContentRecord> {
        let matched = filter.apply(self.catalog.records());
        let sorted = sort::sort_records(matched, sort, self.config.interleave_latest);
        paging::paginate(&sorted, page, self.config.page_size)
    }

    pub async fn search(&self, query: &str, mode: SearchMode, filter: &ListingFilter) -> SearchResults<'_> {
        let records = self.catalog.records();
        match mode {
            SearchMode::Text => SearchResults { mode, results: search::text_search(records, query, filter), fell_back: false },
            SearchMode::Fuzzy => {
                let scored = self.config.fuzzy().search(records, query, filter);
                SearchResults { mode, results: scored.into_iter().map(|s| s.record).collect(), fell_back: false }
            }
            SearchMode::Semantic => match &self.semantic {
                Some(backend) => {
                    let timeout = Duration::from_secs(self.config.semantic.timeout_secs);
                    let out = semantic::semantic_search(backend.as_ref(), &self.catalog, query, filter, timeout).await;
                    SearchResults { mode, results: out.results, fell_back: out.fell_back }
                }
                None => {
                    warn!("semantic search is not configured; using substring search");
                    SearchResults { mode, results: search::text_search(records, query, filter), fell_back: true }
                }
            },
        }
    }

    pub fn detail(&self, id: &str) -> Option<Detail<'_>> {
        let record = self.catalog.get(id)?;
        Some(Detail {
            record,
            related: filter::related(record, self.catalog.records()),
            trailer_embed: trailer::embed_url(&record.trailer_url),
            favorite: self.favorites.is_favorite(id),
        })
    }

    pub fn years(&self) -> Vec<String> {
        self.catalog.years()
    }

    pub fn favorites(&self) -> Vec<&ContentRecord> {
        self.favorites.join(&self.catalog)
    }

    pub fn is_favorite(&self, id: &str) -> bool {
        self.favorites.is_favorite(id)
    }

    pub async fn toggle_favorite(&mut self, id: &str) -> Result<bool> {
        if self.catalog.get(id).is_none() {
            warn!(id, "toggling a favorite that is not in the catalog");
        }
        self.favorites.toggle(id).await
    }

    pub async fn clear_favorites(&mut self) -> Result<()> {
        self.favorites.clear().await
    }

    /// Stored banner titles; a corrupt value reads as none.
    pub async fn banner_titles(&self) -> Result<Vec<String>> {
        let Some(raw) = self.storage.get_value(BANNER_KEY).await.context("reading banner")? else {
            return Ok(Vec::new());
        };
        Ok(serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(error = %e, "stored banner is not a JSON list; ignoring it");
            Vec::new()
        }))
    }

    pub async fn set_banner(&self, titles: &[String]) -> Result<()> {
        let json = serde_json::to_string(titles)?;
        self.storage.put_value(BANNER_KEY, &json).await.context("saving banner")
    }

    pub async fn clear_banner(&self) -> Result<()> {
        self.storage.delete_value(BANNER_KEY).await.context("clearing banner")
    }
}

/// Snapshot when configured, live spreadsheet otherwise.
pub fn source_for(config: &Config) -> Result<Box<dyn ContentSource>> {
    match &config.snapshot {
        Some(path) => Ok(Box::new(SnapshotSource::new(path))),
        None => Ok(Box::new(SheetsSource::new(&config.spreadsheet_id, &config.api_key, config.sheets.clone())?)),
    }
}

fn semantic_backend(config: &Config) -> Result<Option<Arc<dyn SemanticBackend>>> {
    let sc = &config.semantic;
    let Some(endpoint) = sc.endpoint.as_deref().filter(|_| sc.enabled) else {
        return Ok(None);
    };
    let backend = GenerativeBackend::new(endpoint, sc.api_key.as_deref(), Duration::from_secs(sc.timeout_secs))
        .with_context(|| format!("configuring semantic backend: {endpoint}"))?;
    Ok(Some(Arc::new(backend)))
}

/// Loads the raw feed, serving it from the cache while it is fresh.
pub async fn load_cached_feed(
    storage: &dyn Storage,
    source: &dyn ContentSource,
    retry: &RetryPolicy,
    ttl_secs: i64,
    refresh: bool,
) -> Result<RawFeed> {
    let key = source.cache_key();
    let now = current_epoch();

    // Try cache first if not refreshing
    if let (Some(key), false) = (&key, refresh) {
        if let Some(payload) = storage.get_cache(key, now).await.ok().flatten() {
            match serde_json::from_str::<RawFeed>(&payload) {
                Ok(feed) => {
                    debug!(key = %key, "feed served from cache");
                    return Ok(feed);
                }
                Err(e) => warn!(key = %key, error = %e, "cached feed is unreadable; refetching"),
            }
        }
    }

    let feed = source::load_feed(source, retry).await?;
    if let Some(key) = key {
        let payload = serde_json::to_string(&feed)?;
        if let Err(e) = storage.put_cache(&key, &payload, now + ttl_secs).await {
            warn!(key = %key, error = %e, "could not cache feed");
        }
    }
    info!(movies = feed.movies.len(), tv = feed.tv.len(), "feed ready");
    Ok(feed)
}

pub(crate) fn current_epoch() -> i64 {
    std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap_or_default().as_secs() as i64
}

#[cfg(test)]
pub(crate) mod testutil {
    use crate::catalog::Catalog;
    use crate::model::{ContentRecord, ContentType, SubtitleLabel};
    use crate::normalize::slugify;
    use crate::poster::DEFAULT_PLACEHOLDER;

    pub fn record(title: &str, content_type: ContentType, index: usize) -> ContentRecord {
        ContentRecord {
            id: slugify(title),
            title: title.to_string(),
            year: "N/A".to_string(),
            language: "Unknown".to_string(),
            genre: Vec::new(),
            synopsis: String::new(),
            cast: Vec::new(),
            imdb_rating: 0.0,
            poster_url: DEFAULT_PLACEHOLDER.to_string(),
            trailer_url: String::new(),
            episodes: Vec::new(),
            subtitle: SubtitleLabel::English,
            director: None,
            streaming_platform: None,
            content_type,
            source_order_index: index,
        }
    }

    pub fn catalog_of(records: Vec<ContentRecord>) -> Catalog {
        Catalog::from_records(records)
    }
}
