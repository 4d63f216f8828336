//! Fixtures shared by the unit tests: recording fakes for the chat server and
//! the GitHub API, and a [`TestContext`] wiring them to an in-memory store.

use async_trait::async_trait;
use bon::builder;
use secrecy::{ExposeSecret, SecretString};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::chat::{MessageSink, Post, PostType};
use crate::config::Config;
use crate::db::memory::MemoryStore;
use crate::db::{self, users::UserInfo};
use crate::github::{GithubApi, PullRequestDetails, Repository};
use crate::handlers::Context;
use crate::subscriptions::{Features, Subscription, SubscriptionFlags};


#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectPost {
    pub user_id: String,
    pub message: String,
    pub post_type: PostType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EphemeralPost {
    pub user_id: String,
    pub channel_id: String,
    pub message: String,
}

/// Records everything sent to the chat server.
#[derive(Default)]
pub struct FakeChat {
    posts: Mutex<Vec<Post>>,
    direct: Mutex<Vec<DirectPost>>,
    ephemeral: Mutex<Vec<EphemeralPost>>,
    refreshes: Mutex<Vec<String>>,
    failing_channels: Mutex<HashSet<String>>,
}

impl FakeChat {
    /// Makes every post to `channel_id` fail.
    pub fn fail_channel(&self, channel_id: &str) {
        self.failing_channels
            .lock()
            .unwrap()
            .insert(channel_id.to_string());
    }

    pub fn posts(&self) -> Vec<Post> {
        self.posts.lock().unwrap().clone()
    }

    /// Channels that received a post, sorted.
    pub fn channels(&self) -> Vec<String> {
        let mut channels: Vec<_> = self
            .posts()
            .into_iter()
            .map(|post| post.channel_id)
            .collect();
        channels.sort();
        channels
    }

    pub fn direct_posts(&self) -> Vec<DirectPost> {
        self.direct.lock().unwrap().clone()
    }

    /// Users that received a direct message, sorted.
    pub fn dm_recipients(&self) -> Vec<String> {
        let mut users: Vec<_> = self
            .direct_posts()
            .into_iter()
            .map(|post| post.user_id)
            .collect();
        users.sort();
        users
    }

    pub fn ephemeral_posts(&self) -> Vec<EphemeralPost> {
        self.ephemeral.lock().unwrap().clone()
    }

    pub fn refreshes(&self) -> Vec<String> {
        self.refreshes.lock().unwrap().clone()
    }

    pub fn is_silent(&self) -> bool {
        self.posts().is_empty() && self.direct_posts().is_empty()
    }
}

#[async_trait]
impl MessageSink for FakeChat {
    async fn create_post(&self, post: &Post) -> anyhow::Result<()> {
        if self
            .failing_channels
            .lock()
            .unwrap()
            .contains(&post.channel_id)
        {
            anyhow::bail!("channel {} is unavailable", post.channel_id);
        }
        self.posts.lock().unwrap().push(post.clone());
        Ok(())
    }

    async fn create_direct_post(
        &self,
        user_id: &str,
        message: &str,
        post_type: PostType,
    ) -> anyhow::Result<()> {
        self.direct.lock().unwrap().push(DirectPost {
            user_id: user_id.to_string(),
            message: message.to_string(),
            post_type,
        });
        Ok(())
    }

    async fn send_ephemeral_post(
        &self,
        user_id: &str,
        channel_id: &str,
        message: &str,
    ) -> anyhow::Result<()> {
        self.ephemeral.lock().unwrap().push(EphemeralPost {
            user_id: user_id.to_string(),
            channel_id: channel_id.to_string(),
            message: message.to_string(),
        });
        Ok(())
    }

    async fn publish_refresh(&self, user_id: &str) -> anyhow::Result<()> {
        self.refreshes.lock().unwrap().push(user_id.to_string());
        Ok(())
    }
}

/// An in-memory GitHub: public repositories are visible to every token,
/// private ones only to the tokens they were granted to.
#[derive(Default)]
pub struct FakeGithub {
    repos: Mutex<HashMap<String, Repository>>,
    grants: Mutex<HashSet<(String, String)>>,
    owners: Mutex<HashSet<String>>,
    members: Mutex<HashSet<(String, String)>>,
    pulls: Mutex<HashMap<(String, u64), PullRequestDetails>>,
    failing: AtomicBool,
}

impl FakeGithub {
    pub fn add_repo(&self, full_name: &str, private: bool) {
        let repo = if private {
            github::private_repo(full_name)
        } else {
            github::repo(full_name)
        };
        self.owners
            .lock()
            .unwrap()
            .insert(repo.owner().to_lowercase());
        self.repos
            .lock()
            .unwrap()
            .insert(full_name.to_lowercase(), repo);
    }

    pub fn grant(&self, user_id: &str, full_name: &str) {
        self.grants
            .lock()
            .unwrap()
            .insert((token(user_id), full_name.to_lowercase()));
    }

    pub fn revoke(&self, user_id: &str, full_name: &str) {
        self.grants
            .lock()
            .unwrap()
            .remove(&(token(user_id), full_name.to_lowercase()));
    }

    pub fn add_org_member(&self, org: &str, login: &str) {
        self.members
            .lock()
            .unwrap()
            .insert((org.to_lowercase(), login.to_lowercase()));
    }

    pub fn add_pull_request(&self, full_name: &str, details: PullRequestDetails) {
        self.pulls
            .lock()
            .unwrap()
            .insert((full_name.to_lowercase(), details.number), details);
    }

    /// Makes every API call fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> anyhow::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("GitHub is unavailable");
        }
        Ok(())
    }
}

#[async_trait]
impl GithubApi for FakeGithub {
    async fn repository(
        &self,
        token: &SecretString,
        owner: &str,
        repo: &str,
    ) -> anyhow::Result<Option<Repository>> {
        self.check()?;
        let name = format!("{owner}/{repo}").to_lowercase();
        let Some(found) = self.repos.lock().unwrap().get(&name).cloned() else {
            return Ok(None);
        };
        let granted = self
            .grants
            .lock()
            .unwrap()
            .contains(&(token.expose_secret().to_string(), name));
        Ok((!found.private || granted).then_some(found))
    }

    async fn owner_exists(&self, _token: &SecretString, owner: &str) -> anyhow::Result<bool> {
        self.check()?;
        Ok(self.owners.lock().unwrap().contains(&owner.to_lowercase()))
    }

    async fn is_org_member(
        &self,
        _token: &SecretString,
        org: &str,
        login: &str,
    ) -> anyhow::Result<bool> {
        self.check()?;
        Ok(self
            .members
            .lock()
            .unwrap()
            .contains(&(org.to_lowercase(), login.to_lowercase())))
    }

    async fn pull_request_details(
        &self,
        _token: &SecretString,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> anyhow::Result<PullRequestDetails> {
        self.check()?;
        self.pulls
            .lock()
            .unwrap()
            .get(&(format!("{owner}/{repo}").to_lowercase(), number))
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no pull request {owner}/{repo}#{number}"))
    }
}

/// The GitHub credential stored for a connected test user.
pub fn token(user_id: &str) -> String {
    format!("token-{user_id}")
}

/// A subscription created by `creator` with the default features.
#[builder]
pub fn subscription(
    channel: &str,
    repository: &str,
    features: Option<&str>,
    creator: Option<&str>,
    exclude_org_members: Option<bool>,
) -> Subscription {
    Subscription {
        channel_id: channel.to_string(),
        creator_id: creator.unwrap_or("creator").to_string(),
        repository: repository.to_lowercase(),
        features: Features::parse(features.unwrap_or(crate::subscriptions::DEFAULT_FEATURES))
            .unwrap(),
        flags: SubscriptionFlags {
            exclude_org_members: exclude_org_members.unwrap_or(false),
            exclude_org_repos: false,
        },
    }
}

pub struct TestContext {
    pub ctx: Arc<Context>,
    pub chat: Arc<FakeChat>,
    pub github: Arc<FakeGithub>,
    pub store: Arc<MemoryStore>,
}

impl TestContext {
    pub fn new() -> TestContext {
        TestContext::with_config(Config::new("secret", "admin-token"))
    }

    pub fn with_config(config: Config) -> TestContext {
        let chat = Arc::new(FakeChat::default());
        let github = Arc::new(FakeGithub::default());
        let store = Arc::new(MemoryStore::default());
        let ctx = Arc::new(Context {
            config,
            store: store.clone(),
            chat: chat.clone(),
            github: github.clone(),
        });
        TestContext {
            ctx,
            chat,
            github,
            store,
        }
    }

    /// Connects chat user `user_id` to GitHub user `login`.
    pub async fn connect(&self, user_id: &str, login: &str) {
        db::users::connect(
            &*self.store,
            &UserInfo {
                user_id: user_id.to_string(),
                github_login: login.to_string(),
                token: token(user_id).into(),
            },
        )
        .await
        .unwrap();
    }

    pub async fn add_subscription(&self, subscription: Subscription) {
        db::subscriptions::add(&*self.store, subscription)
            .await
            .unwrap();
    }

    pub async fn mute(&self, user_id: &str, login: &str) {
        db::mutes::mute(&*self.store, user_id, login).await.unwrap();
    }

    pub async fn turn_off(&self, full_name: &str) {
        db::notifications_off::disable(&*self.store, full_name)
            .await
            .unwrap();
    }
}
