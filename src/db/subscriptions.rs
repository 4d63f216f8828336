//! The subscription document: every channel subscription, grouped by
//! subscription key.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::db::{KvStore, load_json, modify_json};
use crate::subscriptions::Subscription;

pub const SUBSCRIPTIONS_KEY: &str = "subscriptions";

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Subscriptions {
    /// Subscription key (`owner/repo` or `owner/`) to subscriptions, in
    /// insertion order.
    #[serde(default)]
    pub repositories: BTreeMap<String, Vec<Subscription>>,
}

impl Subscriptions {
    pub fn for_key(&self, key: &str) -> &[Subscription] {
        self.repositories
            .get(key)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

pub async fn load(store: &dyn KvStore) -> Result<Subscriptions> {
    load_json(store, SUBSCRIPTIONS_KEY).await
}

/// Adds a subscription, replacing the channel's existing subscription to the
/// same key in place.
pub async fn add(store: &dyn KvStore, subscription: Subscription) -> Result<()> {
    modify_json(store, SUBSCRIPTIONS_KEY, |doc: &mut Subscriptions| {
        let list = doc
            .repositories
            .entry(subscription.repository.clone())
            .or_default();
        match list
            .iter_mut()
            .find(|existing| existing.channel_id == subscription.channel_id)
        {
            Some(existing) if *existing == subscription => return (false, ()),
            Some(existing) => *existing = subscription.clone(),
            None => list.push(subscription.clone()),
        }
        (true, ())
    })
    .await
}

/// Removes the channel's subscription to `key`, returning whether there was
/// one.
pub async fn remove(store: &dyn KvStore, channel_id: &str, key: &str) -> Result<bool> {
    modify_json(store, SUBSCRIPTIONS_KEY, |doc: &mut Subscriptions| {
        let Some(list) = doc.repositories.get_mut(key) else {
            return (false, false);
        };
        let before = list.len();
        list.retain(|sub| sub.channel_id != channel_id);
        let removed = list.len() != before;
        if list.is_empty() {
            doc.repositories.remove(key);
        }
        (removed, removed)
    })
    .await
}

/// All subscriptions of a channel, sorted by key.
pub async fn for_channel(store: &dyn KvStore, channel_id: &str) -> Result<Vec<Subscription>> {
    let doc = load(store).await?;
    Ok(doc
        .repositories
        .into_values()
        .flatten()
        .filter(|sub| sub.channel_id == channel_id)
        .collect())
}
