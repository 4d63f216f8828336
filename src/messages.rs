//! Rendering of chat messages from webhook payloads.
//!
//! Each template receives the serialized event as its context, so templates
//! refer to payload fields directly (`pull_request.title`, `sender.login`...).

use crate::github::utils;
use anyhow::Context as _;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::LazyLock;
use tera::{Tera, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    NewPullRequest,
    ClosedPullRequest,
    PullRequestLabeled,
    NewIssue,
    ClosedIssue,
    IssueLabeled,
    IssueComment,
    PullRequestReview,
    ReviewComment,
    PushedCommits,
    NewRef,
    DeletedRef,
    Star,
    PullRequestMention,
    IssueMention,
    CommentMention,
    CommentAuthor,
    CommentAssignee,
    PullRequestNotification,
    IssueNotification,
    ReviewNotification,
}

impl Template {
    fn name(self) -> &'static str {
        match self {
            Template::NewPullRequest => "new_pr.tt",
            Template::ClosedPullRequest => "closed_pr.tt",
            Template::PullRequestLabeled => "pr_labeled.tt",
            Template::NewIssue => "new_issue.tt",
            Template::ClosedIssue => "closed_issue.tt",
            Template::IssueLabeled => "issue_labeled.tt",
            Template::IssueComment => "issue_comment.tt",
            Template::PullRequestReview => "pr_review.tt",
            Template::ReviewComment => "review_comment.tt",
            Template::PushedCommits => "pushed_commits.tt",
            Template::NewRef => "new_ref.tt",
            Template::DeletedRef => "deleted_ref.tt",
            Template::Star => "star.tt",
            Template::PullRequestMention => "pr_mention.tt",
            Template::IssueMention => "issue_mention.tt",
            Template::CommentMention => "comment_mention.tt",
            Template::CommentAuthor => "comment_author.tt",
            Template::CommentAssignee => "comment_assignee.tt",
            Template::PullRequestNotification => "pr_notification.tt",
            Template::IssueNotification => "issue_notification.tt",
            Template::ReviewNotification => "review_notification.tt",
        }
    }
}

macro_rules! templates {
    ($($file:literal,)*) => {
        vec![$(($file, include_str!(concat!("../templates/", $file))),)*]
    };
}

static TEMPLATES: LazyLock<Tera> = LazyLock::new(|| {
    let mut tera = Tera::default();
    tera.register_filter("first_line", first_line);
    tera.register_filter("sanitize", sanitize);
    tera.add_raw_templates(templates![
        "new_pr.tt",
        "closed_pr.tt",
        "pr_labeled.tt",
        "new_issue.tt",
        "closed_issue.tt",
        "issue_labeled.tt",
        "issue_comment.tt",
        "pr_review.tt",
        "review_comment.tt",
        "pushed_commits.tt",
        "new_ref.tt",
        "deleted_ref.tt",
        "star.tt",
        "pr_mention.tt",
        "issue_mention.tt",
        "comment_mention.tt",
        "comment_author.tt",
        "comment_assignee.tt",
        "pr_notification.tt",
        "issue_notification.tt",
        "review_notification.tt",
    ])
    .expect("invalid message templates");
    tera
});

fn first_line(value: &Value, _: &HashMap<String, Value>) -> tera::Result<Value> {
    let text = tera::try_get_value!("first_line", "value", String, value);
    Ok(Value::String(
        text.lines().next().unwrap_or_default().trim_end().to_string(),
    ))
}

fn sanitize(value: &Value, _: &HashMap<String, Value>) -> tera::Result<Value> {
    if value.is_null() {
        return Ok(Value::String(String::new()));
    }
    let text = tera::try_get_value!("sanitize", "value", String, value);
    Ok(Value::String(utils::sanitize_description(&text)))
}

pub fn render<T: Serialize>(template: Template, data: &T) -> anyhow::Result<String> {
    let context =
        tera::Context::from_serialize(data).context("failed to build template context")?;
    TEMPLATES
        .render(template.name(), &context)
        .with_context(|| format!("failed to render {}", template.name()))
}
