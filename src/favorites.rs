//! "My List": a persisted, ordered set of record ids.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::catalog::Catalog;
use crate::model::ContentRecord;
use crate::storage::Storage;

pub const FAVORITES_KEY: &str = "showcase_favorites";

/// Ids are not validated against the catalog; stale ones are skipped on [`FavoritesStore::join`].
pub struct FavoritesStore {
    storage: Arc<dyn Storage>,
    ids: Vec<String>,
}

impl std::fmt::Debug for FavoritesStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FavoritesStore").field("ids", &self.ids).finish()
    }
}

impl FavoritesStore {
    /// Reads the persisted list. A corrupt value starts an empty list.
    pub async fn open(storage: Arc<dyn Storage>) -> Result<Self> {
        let ids = match storage.get_value(FAVORITES_KEY).await.context("reading favorites")? {
            Some(raw) => serde_json::from_str::<Vec<String>>(&raw).unwrap_or_else(|e| {
                warn!(error = %e, "stored favorites are not a JSON list; starting empty");
                Vec::new()
            }),
            None => Vec::new(),
        };
        debug!(count = ids.len(), "favorites loaded");
        Ok(Self { storage, ids })
    }

    pub fn is_favorite(&self, id: &str) -> bool {
        self.ids.iter().any(|f| f == id)
    }

    /// Flips membership and persists. Returns the new membership. Memory is
    /// only updated once the write succeeds.
    pub async fn toggle(&mut self, id: &str) -> Result<bool> {
        let mut next = self.ids.clone();
        let now_favorite = match next.iter().position(|f| f == id) {
            Some(pos) => {
                next.remove(pos);
                false
            }
            None => {
                next.push(id.to_string());
                true
            }
        };
        self.persist(&next).await?;
        self.ids = next;
        Ok(now_favorite)
    }

    pub fn list(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub async fn clear(&mut self) -> Result<()> {
        self.persist(&[]).await?;
        self.ids.clear();
        Ok(())
    }

    /// Favorites present in the catalog, in insertion order.
    pub fn join<'a>(&self, catalog: &'a Catalog) -> Vec<&'a ContentRecord> {
        catalog.resolve(&self.ids)
    }

    async fn persist(&self, ids: &[String]) -> Result<()> {
        let json = serde_json::to_string(ids)?;
        self.storage.put_value(FAVORITES_KEY, &json).await.context("saving favorites")
    }
}
