//! Per-user lists of GitHub logins whose activity should not produce direct
//! messages. Stored as comma-joined text.

use anyhow::Result;

use crate::db::{KvStore, modify};
use crate::errors::UserError;

fn key(user_id: &str) -> String {
    format!("{user_id}-muted-users")
}

fn split(raw: Option<&[u8]>) -> Vec<String> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    String::from_utf8_lossy(raw)
        .split(',')
        .map(str::trim)
        .filter(|login| !login.is_empty())
        .map(str::to_string)
        .collect()
}

fn join(logins: &[String]) -> Option<Vec<u8>> {
    Some(logins.join(",").into_bytes())
}

pub async fn muted_users(store: &dyn KvStore, user_id: &str) -> Result<Vec<String>> {
    Ok(split(store.get(&key(user_id)).await?.as_deref()))
}

/// Adds `login` to the mute list; returns `false` if it was already muted.
pub async fn mute(store: &dyn KvStore, user_id: &str, login: &str) -> Result<bool> {
    let login = login.trim().trim_start_matches('@');
    if login.is_empty() || login.contains(',') {
        return Err(UserError(format!("Invalid username `{login}`.")).into());
    }
    modify(store, &key(user_id), |raw| {
        let mut logins = split(raw);
        if logins.iter().any(|l| l.eq_ignore_ascii_case(login)) {
            return Ok((None, false));
        }
        logins.push(login.to_string());
        Ok((join(&logins), true))
    })
    .await
}

/// Removes `login` from the mute list; returns whether it was muted.
pub async fn unmute(store: &dyn KvStore, user_id: &str, login: &str) -> Result<bool> {
    let login = login.trim().trim_start_matches('@');
    modify(store, &key(user_id), |raw| {
        let mut logins = split(raw);
        let before = logins.len();
        logins.retain(|l| !l.eq_ignore_ascii_case(login));
        if logins.len() == before {
            return Ok((None, false));
        }
        Ok((join(&logins), true))
    })
    .await
}

pub async fn unmute_all(store: &dyn KvStore, user_id: &str) -> Result<()> {
    store.delete(&key(user_id)).await
}

/// Whether `user_id` muted `login`. A store failure counts as "not muted".
pub async fn is_muted(store: &dyn KvStore, user_id: &str, login: &str) -> bool {
    match muted_users(store, user_id).await {
        Ok(logins) => logins.iter().any(|l| l.eq_ignore_ascii_case(login)),
        Err(e) => {
            tracing::warn!("failed to read mute list of {user_id}: {e:?}");
            false
        }
    }
}
