//! Direct messages to the people an event is about: the author of a closed
//! pull request, a requested reviewer, an assignee...
//!
//! Every recipient goes through [`recipient`], which drops the sender
//! themselves, GitHub users without a connected chat account, users who
//! cannot see a private repository and users who muted the sender.

use futures::future::join_all;

use crate::chat::PostType;
use crate::db;
use crate::github::{
    CommentAction, IssueCommentEvent, IssuesAction, IssuesEvent, PullRequestAction,
    PullRequestEvent, PullRequestReviewEvent, Repository, ReviewAction, User,
};
use crate::handlers::Context;
use crate::messages::{self, Template};
use crate::permissions;
use tracing as log;

pub(super) async fn handle_pull_request(
    ctx: &Context,
    event: &PullRequestEvent,
) -> anyhow::Result<()> {
    let (login, post_type) = match &event.action {
        PullRequestAction::ReviewRequested {
            requested_reviewer: Some(reviewer),
        } => (&reviewer.login, PostType::ReviewRequest),
        PullRequestAction::Closed | PullRequestAction::Reopened => {
            (&event.pull_request.user.login, PostType::Author)
        }
        PullRequestAction::Assigned { assignee } => (&assignee.login, PostType::Assigned),
        _ => return Ok(()),
    };

    let Some(user_id) = recipient(ctx, &event.repository, &event.sender, login).await else {
        return Ok(());
    };
    let message = messages::render(Template::PullRequestNotification, event)?;
    send_direct(ctx, &user_id, &message, post_type).await;
    Ok(())
}

pub(super) async fn handle_issue(ctx: &Context, event: &IssuesEvent) -> anyhow::Result<()> {
    let (login, post_type) = match &event.action {
        IssuesAction::Closed | IssuesAction::Reopened => (&event.issue.user.login, PostType::Author),
        IssuesAction::Assigned { assignee } => (&assignee.login, PostType::Assigned),
        _ => return Ok(()),
    };

    let Some(user_id) = recipient(ctx, &event.repository, &event.sender, login).await else {
        return Ok(());
    };
    let message = messages::render(Template::IssueNotification, event)?;
    send_direct(ctx, &user_id, &message, post_type).await;
    Ok(())
}

pub(super) async fn handle_review(
    ctx: &Context,
    event: &PullRequestReviewEvent,
) -> anyhow::Result<()> {
    if event.action != ReviewAction::Submitted || !event.review.state.is_reportable() {
        return Ok(());
    }

    let author = &event.pull_request.user.login;
    let Some(user_id) = recipient(ctx, &event.repository, &event.sender, author).await else {
        return Ok(());
    };
    let message = messages::render(Template::ReviewNotification, event)?;
    send_direct(ctx, &user_id, &message, PostType::Review).await;
    Ok(())
}

/// Notifies the author of the commented issue or pull request, and each of
/// its assignees.
pub(super) async fn handle_comment(ctx: &Context, event: &IssueCommentEvent) -> anyhow::Result<()> {
    if event.action != CommentAction::Created {
        return Ok(());
    }

    let author = &event.issue.user;
    if let Some(user_id) = recipient(ctx, &event.repository, &event.sender, &author.login).await {
        let message = messages::render(Template::CommentAuthor, event)?;
        send_direct(ctx, &user_id, &message, PostType::Author).await;
    }

    let assignees = event
        .issue
        .assignees
        .iter()
        .filter(|assignee| !assignee.is(&author.login))
        .collect::<Vec<_>>();
    if assignees.is_empty() {
        return Ok(());
    }
    let recipients = join_all(assignees.iter().map(|assignee| {
        recipient(ctx, &event.repository, &event.sender, &assignee.login)
    }))
    .await;
    let recipients = recipients.into_iter().flatten().collect::<Vec<_>>();
    if recipients.is_empty() {
        return Ok(());
    }
    let message = messages::render(Template::CommentAssignee, event)?;
    join_all(
        recipients
            .iter()
            .map(|user_id| send_direct(ctx, user_id, &message, PostType::Assigned)),
    )
    .await;
    Ok(())
}

/// The chat user to notify on behalf of GitHub user `login`, if any.
pub(super) async fn recipient(
    ctx: &Context,
    repo: &Repository,
    sender: &User,
    login: &str,
) -> Option<String> {
    if sender.is(login) {
        return None;
    }
    let user_id = match db::users::chat_user_id(&*ctx.store, login).await {
        Ok(Some(user_id)) => user_id,
        Ok(None) => return None,
        Err(e) => {
            log::warn!("failed to look up the chat user of {login}: {e:?}");
            return None;
        }
    };
    if repo.private && !permissions::can_see(ctx, &user_id, &repo.full_name).await {
        log::debug!("{login} cannot see {}, not notifying", repo.full_name);
        return None;
    }
    if db::mutes::is_muted(&*ctx.store, &user_id, &sender.login).await {
        log::debug!("{login} muted {}", sender.login);
        return None;
    }
    Some(user_id)
}

/// Sends a direct message, then asks the recipient's clients to refresh.
pub(super) async fn send_direct(ctx: &Context, user_id: &str, message: &str, post_type: PostType) {
    if let Err(e) = ctx
        .chat
        .create_direct_post(user_id, message, post_type)
        .await
    {
        log::warn!("failed to send direct message to {user_id}: {e:?}");
        return;
    }
    if let Err(e) = ctx.chat.publish_refresh(user_id).await {
        log::warn!("failed to refresh clients of {user_id}: {e:?}");
    }
}
