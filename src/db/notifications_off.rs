//! Repositories whose notifications are turned off entirely.

use anyhow::Result;

use crate::db::{KvStore, load_json, modify_json};

pub const NOTIFICATIONS_OFF_KEY: &str = "subscribed-turned-off-notifications";

pub async fn list(store: &dyn KvStore) -> Result<Vec<String>> {
    load_json(store, NOTIFICATIONS_OFF_KEY).await
}

/// Turns notifications off for `repo`; returns `false` if they already were.
pub async fn disable(store: &dyn KvStore, repo: &str) -> Result<bool> {
    modify_json(store, NOTIFICATIONS_OFF_KEY, |repos: &mut Vec<String>| {
        if repos.iter().any(|r| r.eq_ignore_ascii_case(repo)) {
            return (false, false);
        }
        repos.push(repo.to_string());
        (true, true)
    })
    .await
}

/// Turns notifications back on for `repo`; returns whether it was off.
pub async fn enable(store: &dyn KvStore, repo: &str) -> Result<bool> {
    modify_json(store, NOTIFICATIONS_OFF_KEY, |repos: &mut Vec<String>| {
        let before = repos.len();
        repos.retain(|r| !r.eq_ignore_ascii_case(repo));
        let removed = repos.len() != before;
        (removed, removed)
    })
    .await
}

/// Whether events of `repo` must be dropped. A store failure counts as "not
/// turned off".
pub async fn is_disabled(store: &dyn KvStore, repo: &str) -> bool {
    match list(store).await {
        Ok(repos) => repos.iter().any(|r| r.eq_ignore_ascii_case(repo)),
        Err(e) => {
            tracing::warn!("failed to read the notifications-off list: {e:?}");
            false
        }
    }
}
