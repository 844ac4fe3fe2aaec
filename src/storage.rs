use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

/// Persistent state that outlives a session, plus an expiring payload cache.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn get_value(&self, key: &str) -> Result<Option<String>>;
    async fn put_value(&self, key: &str, value: &str) -> Result<()>;
    async fn delete_value(&self, key: &str) -> Result<()>;

    async fn get_cache(&self, key: &str, now: i64) -> Result<Option<String>>;
    async fn put_cache(&self, key: &str, payload: &str, expires_at: i64) -> Result<()>;
}

/// Process-local storage; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, String>>,
    cache: Mutex<HashMap<String, (String, i64)>>,
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get_value(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.lock().unwrap().get(key).cloned())
    }

    async fn put_value(&self, key: &str, value: &str) -> Result<()> {
        self.values.lock().unwrap().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete_value(&self, key: &str) -> Result<()> {
        self.values.lock().unwrap().remove(key);
        Ok(())
    }

    async fn get_cache(&self, key: &str, now: i64) -> Result<Option<String>> {
        Ok(self
            .cache
            .lock()
            .unwrap()
            .get(key)
            .filter(|(_, expires_at)| *expires_at > now)
            .map(|(payload, _)| payload.clone()))
    }

    async fn put_cache(&self, key: &str, payload: &str, expires_at: i64) -> Result<()> {
        self.cache.lock().unwrap().insert(key.to_string(), (payload.to_string(), expires_at));
        Ok(())
    }
}
