use anyhow::{Context as _, Result};
use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;
use std::time::Duration;

pub mod memory;
pub mod mutes;
pub mod notifications_off;
pub mod postgres;
pub mod subscriptions;
pub mod users;

/// How many times a read-modify-write is retried when another writer got in
/// between the read and the compare-and-set.
const MAX_WRITE_ATTEMPTS: u32 = 5;

/// Key/value persistence used for every piece of bridge state.
///
/// Values are opaque bytes. `compare_and_set` is the only primitive that
/// composite documents are updated with.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Unconditionally stores `value`, optionally expiring after `expiry`.
    async fn set(&self, key: &str, value: &[u8], expiry: Option<Duration>) -> Result<()>;

    /// Stores `new` only if the current value equals `old`, where `None`
    /// means "no value". Returns whether the write happened.
    async fn compare_and_set(&self, key: &str, old: Option<&[u8]>, new: &[u8]) -> Result<bool>;

    async fn delete(&self, key: &str) -> Result<()>;
}

/// Opens the Postgres store when a database URL is configured, and an
/// in-memory one otherwise.
pub async fn open(database_url: Option<&str>) -> Result<Arc<dyn KvStore>> {
    match database_url {
        Some(url) => {
            let store = postgres::PostgresStore::connect(url).await?;
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("DATABASE_URL is not set, state will not survive a restart");
            Ok(Arc::new(memory::MemoryStore::default()))
        }
    }
}

/// Atomically rewrites the raw value under `key`.
///
/// `update` receives the current value and returns the replacement (or
/// `None` to leave the value untouched) together with a result. It may be
/// called several times if concurrent writers race.
pub(crate) async fn modify<R>(
    store: &dyn KvStore,
    key: &str,
    mut update: impl FnMut(Option<&[u8]>) -> Result<(Option<Vec<u8>>, R)>,
) -> Result<R> {
    for attempt in 1..=MAX_WRITE_ATTEMPTS {
        let current = store
            .get(key)
            .await
            .with_context(|| format!("failed to read `{key}`"))?;
        let (new, result) = update(current.as_deref())?;
        let Some(new) = new else {
            return Ok(result);
        };
        if store
            .compare_and_set(key, current.as_deref(), &new)
            .await
            .with_context(|| format!("failed to write `{key}`"))?
        {
            return Ok(result);
        }
        tracing::debug!("concurrent update of `{key}`, retrying (attempt {attempt})");
    }
    anyhow::bail!("gave up updating `{key}` after {MAX_WRITE_ATTEMPTS} concurrent writes")
}

/// [`modify`] for JSON documents; a missing value reads as `T::default()`.
///
/// `update` returns whether it changed the document.
pub(crate) async fn modify_json<T, R>(
    store: &dyn KvStore,
    key: &str,
    mut update: impl FnMut(&mut T) -> (bool, R),
) -> Result<R>
where
    T: Serialize + DeserializeOwned + Default,
{
    modify(store, key, |current| {
        let mut doc: T = decode_json(key, current)?;
        let (changed, result) = update(&mut doc);
        if !changed {
            return Ok((None, result));
        }
        Ok((Some(serde_json::to_vec(&doc)?), result))
    })
    .await
}

pub(crate) async fn load_json<T>(store: &dyn KvStore, key: &str) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let current = store
        .get(key)
        .await
        .with_context(|| format!("failed to read `{key}`"))?;
    decode_json(key, current.as_deref())
}

fn decode_json<T>(key: &str, raw: Option<&[u8]>) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    match raw {
        Some(raw) => {
            serde_json::from_slice(raw).with_context(|| format!("failed to decode `{key}`"))
        }
        None => Ok(T::default()),
    }
}
