use async_trait::async_trait;
use secrecy::SecretString;

pub(crate) mod client;
pub(crate) mod issue;
pub(crate) mod repos;
pub(crate) mod utils;
mod webhook;

pub use client::GithubClient;
pub use issue::*;
pub use repos::*;
pub use webhook::event::*;
pub use webhook::{EventName, deserialize_payload, parse_event, verify_signature, webhook};

pub type UserId = u64;

/// The subset of the GitHub REST API the bridge relies on.
///
/// Every call is made with the credential of a specific connected user, so
/// the answers reflect what that user is allowed to see.
#[async_trait]
pub trait GithubApi: Send + Sync {
    /// Fetches a repository, returning `None` when it does not exist or is
    /// not visible with `token`.
    async fn repository(
        &self,
        token: &SecretString,
        owner: &str,
        repo: &str,
    ) -> anyhow::Result<Option<Repository>>;

    /// Whether `owner` names an existing organization or user account.
    async fn owner_exists(&self, token: &SecretString, owner: &str) -> anyhow::Result<bool>;

    async fn is_org_member(
        &self,
        token: &SecretString,
        org: &str,
        login: &str,
    ) -> anyhow::Result<bool>;

    async fn pull_request_details(
        &self,
        token: &SecretString,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> anyhow::Result<PullRequestDetails>;
}
