use anyhow::{Context, Result};
use directories::ProjectDirs;
use sqlx::{any::AnyConnectOptions, AnyPool, ConnectOptions, migrate::Migrator};
use sqlx::any::AnyPoolOptions;
use std::{path::PathBuf, str::FromStr};
use std::sync::Once;

use crate::storage::Storage;

// Ensure drivers are installed exactly once for sqlx::any
static INSTALL_DRIVERS: Once = Once::new();

// Embed SQL migrations from the migrations/ directory
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

#[derive(Clone, Debug)]
pub struct Database {
    pool: AnyPool,
}

impl Database {
    // Create a connection pool. If database_url is None, use a SQLite file in
    // the user's data directory.
    pub async fn connect(database_url: Option<&str>) -> Result<Self> {
        INSTALL_DRIVERS.call_once(sqlx::any::install_default_drivers);

        let url = match database_url {
            Some(u) if !u.trim().is_empty() => u.to_string(),
            _ => default_sqlite_url()?,
        };

        let opts = AnyConnectOptions::from_str(&url)
            .with_context(|| format!("invalid database URL: {url}"))?;
        // Quiet by default; statement logs are noise at info level
        let opts = opts.disable_statement_logging();

        let pool = AnyPoolOptions::new()
            .max_connections(4)
            .connect_with(opts)
            .await
            .with_context(|| format!("failed to connect to database: {url}"))?;

        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await.context("running migrations")
    }

    pub async fn clear_cache_prefix(&self, prefix: Option<&str>) -> Result<u64> {
        let result = if let Some(p) = prefix {
            let like = format!("{}%", p);
            sqlx::query("DELETE FROM feed_cache WHERE key LIKE ?")
                .bind(like)
                .execute(&self.pool)
                .await?
        } else {
            sqlx::query("DELETE FROM feed_cache")
                .execute(&self.pool)
                .await?
        };
        Ok(result.rows_affected())
    }
}

#[async_trait::async_trait]
impl Storage for Database {
    async fn get_value(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query_scalar::<_, String>("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn put_value(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO kv_store(key, value, updated_at) VALUES (?, ?, ?)\n             ON CONFLICT(key) DO UPDATE SET value=excluded.value, updated_at=excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(crate::current_epoch())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_value(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM kv_store WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_cache(&self, key: &str, now: i64) -> Result<Option<String>> {
        let row = sqlx::query_scalar::<_, String>(
            "SELECT payload FROM feed_cache WHERE key = ? AND expires_at > ?",
        )
        .bind(key)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn put_cache(&self, key: &str, payload: &str, expires_at: i64) -> Result<()> {
        sqlx::query(
            "INSERT INTO feed_cache(key, payload, expires_at) VALUES (?, ?, ?)\n             ON CONFLICT(key) DO UPDATE SET payload=excluded.payload, expires_at=excluded.expires_at",
        )
        .bind(key)
        .bind(payload)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn default_sqlite_url() -> Result<String> {
    let proj = ProjectDirs::from("dev", "showcase", "showcase")
        .context("unable to determine data directory for default sqlite path")?;
    let mut path: PathBuf = proj.data_dir().to_path_buf();
    std::fs::create_dir_all(&path).with_context(|| format!("creating data dir: {}", path.display()))?;
    path.push("showcase.db");
    Ok(sqlite_url_for(&path))
}

/// `sqlite://` URL that creates the file on first open.
pub fn sqlite_url_for(path: &std::path::Path) -> String {
    // Encode spaces in the path for a valid sqlite URL
    let mut path_str = path.to_string_lossy().to_string();
    if path_str.contains(' ') { path_str = path_str.replace(' ', "%20"); }
    format!("sqlite://{path_str}?mode=rwc")
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn temp_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let url = sqlite_url_for(&dir.path().join("test.db"));
        let db = Database::connect(Some(&url)).await.unwrap();
        db.run_migrations().await.unwrap();
        (dir, db)
    }

    #[tokio::test]
    async fn values_upsert_and_delete() {
        let (_dir, db) = temp_db().await;
        assert_eq!(db.get_value("k").await.unwrap(), None);
        db.put_value("k", "1").await.unwrap();
        db.put_value("k", "2").await.unwrap();
        assert_eq!(db.get_value("k").await.unwrap().as_deref(), Some("2"));
        db.delete_value("k").await.unwrap();
        assert_eq!(db.get_value("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn cache_entries_expire() {
        let (_dir, db) = temp_db().await;
        db.put_cache("sheets|x", "{}", 100).await.unwrap();
        assert_eq!(db.get_cache("sheets|x", 99).await.unwrap().as_deref(), Some("{}"));
        assert_eq!(db.get_cache("sheets|x", 100).await.unwrap(), None);
        assert_eq!(db.clear_cache_prefix(Some("sheets|")).await.unwrap(), 1);
    }
}
