use serde::{Deserialize, Serialize};

use crate::github::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub login: String,
    #[serde(default)]
    pub id: UserId,
    #[serde(default)]
    pub html_url: String,
}

impl User {
    /// GitHub logins are case-insensitive.
    pub fn is(&self, login: &str) -> bool {
        self.login.eq_ignore_ascii_case(login)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// `owner/name`, with the case GitHub reports.
    pub full_name: String,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub html_url: String,
}

impl Repository {
    pub fn owner(&self) -> &str {
        self.full_name
            .split_once('/')
            .map_or(self.full_name.as_str(), |(owner, _)| owner)
    }

    pub fn name(&self) -> &str {
        self.full_name
            .split_once('/')
            .map_or("", |(_, name)| name)
    }
}

/// Summary of a pull request as shown in the chat sidebar: the pull request
/// itself, its combined commit status and the reviews submitted so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullRequestDetails {
    pub url: String,
    pub number: u64,
    pub status: String,
    pub mergeable: Option<bool>,
    pub requested_reviewers: Vec<String>,
    pub reviews: Vec<ReviewSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewSummary {
    pub user: User,
    pub state: String,
}

/// <https://docs.github.com/en/rest/commits/statuses#get-the-combined-status-for-a-specific-reference>
#[derive(Debug, Deserialize)]
pub(crate) struct CombinedStatus {
    pub state: String,
}
