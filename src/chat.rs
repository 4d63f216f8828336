use async_trait::async_trait;
use serde::Serialize;

pub(crate) mod api;
pub(crate) mod client;

pub use client::ChatClient;

/// Post types understood by the chat plugin's renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PostType {
    #[serde(rename = "custom_git_pr")]
    PullRequest,
    #[serde(rename = "custom_git_issue")]
    Issue,
    #[serde(rename = "custom_git_comment")]
    Comment,
    #[serde(rename = "custom_git_review")]
    Review,
    #[serde(rename = "custom_git_push")]
    Push,
    #[serde(rename = "custom_git_ref")]
    Ref,
    #[serde(rename = "custom_git_star")]
    Star,
    #[serde(rename = "custom_git_mention")]
    Mention,
    #[serde(rename = "custom_git_author")]
    Author,
    #[serde(rename = "custom_git_assigned")]
    Assigned,
    #[serde(rename = "custom_git_review_request")]
    ReviewRequest,
}

/// A message destined to a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub channel_id: String,
    pub message: String,
    pub post_type: PostType,
}

/// Where rendered messages go.
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn create_post(&self, post: &Post) -> anyhow::Result<()>;

    /// Sends a direct message from the bot to `user_id`.
    async fn create_direct_post(
        &self,
        user_id: &str,
        message: &str,
        post_type: PostType,
    ) -> anyhow::Result<()>;

    /// Posts a message in `channel_id` that only `user_id` can see.
    async fn send_ephemeral_post(
        &self,
        user_id: &str,
        channel_id: &str,
        message: &str,
    ) -> anyhow::Result<()>;

    /// Tells `user_id`'s clients to refresh their pending-review counters.
    async fn publish_refresh(&self, user_id: &str) -> anyhow::Result<()>;
}
