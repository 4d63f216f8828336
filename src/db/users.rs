//! The user directory: which chat user is which GitHub user, and the GitHub
//! credential each connected chat user granted.

use anyhow::{Context as _, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::db::KvStore;

#[derive(Debug, Clone)]
pub struct UserInfo {
    pub user_id: String,
    pub github_login: String,
    pub token: SecretString,
}

#[derive(Serialize, Deserialize)]
struct StoredUserInfo {
    user_id: String,
    github_login: String,
    token: String,
}

fn login_key(github_login: &str) -> String {
    format!("{}_githubusername", github_login.to_lowercase())
}

fn token_key(user_id: &str) -> String {
    format!("{user_id}_githubtoken")
}

/// Records both directions of the mapping, dropping the login mapping of a
/// previous connection of the same chat user.
pub async fn connect(store: &dyn KvStore, info: &UserInfo) -> Result<()> {
    if let Some(previous) = user_info(store, &info.user_id).await?
        && !previous
            .github_login
            .eq_ignore_ascii_case(&info.github_login)
    {
        store.delete(&login_key(&previous.github_login)).await?;
    }

    let stored = StoredUserInfo {
        user_id: info.user_id.clone(),
        github_login: info.github_login.clone(),
        token: info.token.expose_secret().to_string(),
    };
    store
        .set(&token_key(&info.user_id), &serde_json::to_vec(&stored)?, None)
        .await
        .context("failed to store user info")?;
    store
        .set(
            &login_key(&info.github_login),
            info.user_id.as_bytes(),
            None,
        )
        .await
        .context("failed to store GitHub login mapping")?;
    Ok(())
}

/// Forgets a chat user; returns whether it was connected.
pub async fn disconnect(store: &dyn KvStore, user_id: &str) -> Result<bool> {
    let Some(info) = user_info(store, user_id).await? else {
        return Ok(false);
    };
    store.delete(&login_key(&info.github_login)).await?;
    store.delete(&token_key(user_id)).await?;
    Ok(true)
}

pub async fn user_info(store: &dyn KvStore, user_id: &str) -> Result<Option<UserInfo>> {
    if user_id.is_empty() {
        return Ok(None);
    }
    let Some(raw) = store.get(&token_key(user_id)).await? else {
        return Ok(None);
    };
    let stored: StoredUserInfo = serde_json::from_slice(&raw)
        .with_context(|| format!("failed to decode user info of {user_id}"))?;
    Ok(Some(UserInfo {
        user_id: stored.user_id,
        github_login: stored.github_login,
        token: stored.token.into(),
    }))
}

/// The chat user connected to `github_login`, if any.
pub async fn chat_user_id(store: &dyn KvStore, github_login: &str) -> Result<Option<String>> {
    let raw = store.get(&login_key(github_login)).await?;
    Ok(raw
        .map(|raw| String::from_utf8_lossy(&raw).into_owned())
        .filter(|id| !id.is_empty()))
}
