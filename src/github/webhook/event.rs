use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::github::{Comment, Issue, Label, PullRequest, Repository, Review, User};

/// An event triggered by a webhook.
#[derive(Debug)]
pub enum Event {
    /// One or more commits are pushed to a repository branch or tag.
    Push(PushEvent),
    /// Activity on a pull request.
    PullRequest(PullRequestEvent),
    /// A review was submitted, edited or dismissed.
    PullRequestReview(PullRequestReviewEvent),
    /// A comment on the diff of a pull request.
    PullRequestReviewComment(PullRequestReviewCommentEvent),
    /// Activity on an issue.
    Issue(IssuesEvent),
    /// A comment on an issue or a pull request conversation.
    IssueComment(IssueCommentEvent),
    /// A Git branch or tag is created.
    Create(RefEvent),
    /// A Git branch or tag is deleted.
    Delete(RefEvent),
    Star(StarEvent),
}

impl Event {
    pub fn repo(&self) -> &Repository {
        match self {
            Event::Push(e) => &e.repository,
            Event::PullRequest(e) => &e.repository,
            Event::PullRequestReview(e) => &e.repository,
            Event::PullRequestReviewComment(e) => &e.repository,
            Event::Issue(e) => &e.repository,
            Event::IssueComment(e) => &e.repository,
            Event::Create(e) | Event::Delete(e) => &e.repository,
            Event::Star(e) => &e.repository,
        }
    }

    pub fn sender(&self) -> &User {
        match self {
            Event::Push(e) => &e.sender,
            Event::PullRequest(e) => &e.sender,
            Event::PullRequestReview(e) => &e.sender,
            Event::PullRequestReviewComment(e) => &e.sender,
            Event::Issue(e) => &e.sender,
            Event::IssueComment(e) => &e.sender,
            Event::Create(e) | Event::Delete(e) => &e.sender,
            Event::Star(e) => &e.sender,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequestEvent {
    #[serde(flatten)]
    pub action: PullRequestAction,
    pub pull_request: PullRequest,
    pub repository: Repository,
    pub sender: User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[serde(tag = "action")]
pub enum PullRequestAction {
    Opened,
    Edited,
    Closed,
    Reopened,
    Synchronize,
    ReadyForReview,
    ConvertedToDraft,
    Labeled {
        label: Label,
    },
    Unlabeled,
    Assigned {
        assignee: User,
    },
    Unassigned,
    ReviewRequested {
        /// Absent when a team rather than a user was requested.
        #[serde(default)]
        requested_reviewer: Option<User>,
    },
    ReviewRequestRemoved,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuesEvent {
    #[serde(flatten)]
    pub action: IssuesAction,
    pub issue: Issue,
    pub repository: Repository,
    pub sender: User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[serde(tag = "action")]
pub enum IssuesAction {
    Opened,
    Edited,
    Deleted,
    Closed,
    Reopened,
    Labeled { label: Label },
    Unlabeled,
    Assigned { assignee: User },
    Unassigned,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueCommentEvent {
    pub action: CommentAction,
    pub issue: Issue,
    pub comment: Comment,
    pub repository: Repository,
    pub sender: User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentAction {
    Created,
    Edited,
    Deleted,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequestReviewEvent {
    pub action: ReviewAction,
    pub review: Review,
    pub pull_request: PullRequest,
    pub repository: Repository,
    pub sender: User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
    Submitted,
    Edited,
    Dismissed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequestReviewCommentEvent {
    pub action: CommentAction,
    pub comment: Comment,
    pub pull_request: PullRequest,
    pub repository: Repository,
    pub sender: User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushEvent {
    /// The full git ref that was pushed.
    ///
    /// Example: `refs/heads/main` or `refs/tags/v3.14.1`.
    #[serde(rename = "ref")]
    pub git_ref: String,
    #[serde(default)]
    pub commits: Vec<Commit>,
    /// URL comparing the state before and after the push.
    #[serde(default)]
    pub compare: String,
    #[serde(default)]
    pub forced: bool,
    pub repository: Repository,
    pub sender: User,
}

impl PushEvent {
    /// The ref without its `refs/heads/` or `refs/tags/` prefix.
    pub fn short_ref(&self) -> &str {
        self.git_ref
            .strip_prefix("refs/heads/")
            .or_else(|| self.git_ref.strip_prefix("refs/tags/"))
            .unwrap_or(&self.git_ref)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commit {
    pub id: String,
    pub message: String,
    pub url: String,
    pub author: CommitAuthor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitAuthor {
    pub name: String,
    #[serde(default)]
    pub username: Option<String>,
}

/// Payload of both `create` and `delete` events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefEvent {
    /// Short name of the branch or tag, e.g. `main`.
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub ref_type: RefKind,
    pub repository: Repository,
    pub sender: User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefKind {
    Branch,
    Tag,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StarEvent {
    pub action: StarAction,
    #[serde(default)]
    pub starred_at: Option<DateTime<Utc>>,
    pub repository: Repository,
    pub sender: User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StarAction {
    Created,
    Deleted,
    #[serde(other)]
    Unknown,
}
