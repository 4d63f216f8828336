//! Direct messages to users `@mentioned` in a new pull request, a new issue
//! or a new comment.
//!
//! The author of the mentioning object is left to the notification handlers,
//! which tell them about the activity anyway.

use futures::future::join_all;

use crate::chat::PostType;
use crate::github::utils::strip_email_reply;
use crate::github::{
    CommentAction, IssueCommentEvent, IssuesAction, IssuesEvent, PullRequestAction,
    PullRequestEvent, Repository, User,
};
use crate::handlers::Context;
use crate::handlers::notification::{recipient, send_direct};
use crate::messages::{self, Template};

pub(super) async fn handle_pull_request(
    ctx: &Context,
    event: &PullRequestEvent,
) -> anyhow::Result<()> {
    if event.action != PullRequestAction::Opened {
        return Ok(());
    }
    let recipients = recipients(
        ctx,
        &event.repository,
        &event.sender,
        &event.pull_request.user,
        &event.pull_request.body,
    )
    .await;
    notify(ctx, &recipients, Template::PullRequestMention, event).await
}

pub(super) async fn handle_issue(ctx: &Context, event: &IssuesEvent) -> anyhow::Result<()> {
    if event.action != IssuesAction::Opened {
        return Ok(());
    }
    let recipients = recipients(
        ctx,
        &event.repository,
        &event.sender,
        &event.issue.user,
        &event.issue.body,
    )
    .await;
    notify(ctx, &recipients, Template::IssueMention, event).await
}

pub(super) async fn handle_comment(ctx: &Context, event: &IssueCommentEvent) -> anyhow::Result<()> {
    if event.action != CommentAction::Created {
        return Ok(());
    }
    let body = strip_email_reply(&event.comment.body);
    let recipients = recipients(
        ctx,
        &event.repository,
        &event.sender,
        &event.issue.user,
        body,
    )
    .await;
    if recipients.is_empty() {
        return Ok(());
    }

    let mut event = event.clone();
    event.comment.body = body.to_string();
    notify(ctx, &recipients, Template::CommentMention, &event).await
}

async fn recipients(
    ctx: &Context,
    repo: &Repository,
    sender: &User,
    author: &User,
    body: &str,
) -> Vec<String> {
    let logins = parser::get_mentions(body)
        .into_iter()
        .filter(|login| !author.is(login))
        .collect::<Vec<_>>();
    join_all(
        logins
            .iter()
            .map(|login| recipient(ctx, repo, sender, login)),
    )
    .await
    .into_iter()
    .flatten()
    .collect()
}

async fn notify<T: serde::Serialize>(
    ctx: &Context,
    recipients: &[String],
    template: Template,
    event: &T,
) -> anyhow::Result<()> {
    if recipients.is_empty() {
        return Ok(());
    }
    let message = messages::render(template, event)?;
    join_all(
        recipients
            .iter()
            .map(|user_id| send_direct(ctx, user_id, &message, PostType::Mention)),
    )
    .await;
    Ok(())
}
