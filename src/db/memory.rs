use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::db::KvStore;

/// Process-local store, used when no database is configured and in tests.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self) -> bool {
        self.expires_at.is_none_or(|at| at > Instant::now())
    }
}

impl MemoryStore {
    /// Writes without going through the async lock; panics if it is held.
    #[cfg(test)]
    pub(crate) fn force_set(&self, key: &str, value: &[u8]) {
        self.entries
            .try_lock()
            .expect("store is not locked")
            .insert(
                key.to_string(),
                Entry {
                    value: value.to_vec(),
                    expires_at: None,
                },
            );
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let entries = self.entries.lock().await;
        Ok(entries
            .get(key)
            .filter(|entry| entry.is_live())
            .map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: &[u8], expiry: Option<Duration>) -> Result<()> {
        self.entries.lock().await.insert(
            key.to_string(),
            Entry {
                value: value.to_vec(),
                expires_at: expiry.map(|expiry| Instant::now() + expiry),
            },
        );
        Ok(())
    }

    async fn compare_and_set(&self, key: &str, old: Option<&[u8]>, new: &[u8]) -> Result<bool> {
        let mut entries = self.entries.lock().await;
        let current = entries
            .get(key)
            .filter(|entry| entry.is_live())
            .map(|entry| entry.value.as_slice());
        if current != old {
            return Ok(false);
        }
        entries.insert(
            key.to_string(),
            Entry {
                value: new.to_vec(),
                expires_at: None,
            },
        );
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}
