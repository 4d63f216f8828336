use crate::chat::{MessageSink, Post, PostType};
use crate::config::Config;
use crate::db::{self, KvStore};
use crate::github::{Event, GithubApi, Label, Repository, User};
use crate::permissions;
use crate::subscriptions::{Subscription, subscription_key};
use futures::future::join_all;
use std::sync::Arc;
use tracing as log;

mod issue;
mod issue_comment;
mod mentions;
mod notification;
mod pull_request;
mod push;
mod refs;
mod review;
mod star;


pub struct Context {
    pub config: Config,
    pub store: Arc<dyn KvStore>,
    pub chat: Arc<dyn MessageSink>,
    pub github: Arc<dyn GithubApi>,
}

/// Routes one verified webhook event to channels and users.
///
/// Returns `false` when the event was dropped before classification.
pub async fn handle(ctx: &Context, event: &Event) -> bool {
    let repo = event.repo();
    if db::notifications_off::is_disabled(&*ctx.store, &repo.full_name).await {
        log::debug!("notifications are turned off for {}", repo.full_name);
        return false;
    }
    if repo.private && !ctx.config.enable_private_repos {
        log::debug!("ignoring event on private repository {}", repo.full_name);
        return false;
    }

    let results = match event {
        Event::PullRequest(e) => vec![
            ("pull_request", pull_request::handle(ctx, e).await),
            ("pull_request mentions", mentions::handle_pull_request(ctx, e).await),
            (
                "pull_request notification",
                notification::handle_pull_request(ctx, e).await,
            ),
        ],
        Event::Issue(e) => vec![
            ("issues", issue::handle(ctx, e).await),
            ("issues mentions", mentions::handle_issue(ctx, e).await),
            ("issues notification", notification::handle_issue(ctx, e).await),
        ],
        Event::IssueComment(e) => vec![
            ("issue_comment", issue_comment::handle(ctx, e).await),
            ("issue_comment mentions", mentions::handle_comment(ctx, e).await),
            (
                "issue_comment notification",
                notification::handle_comment(ctx, e).await,
            ),
        ],
        Event::PullRequestReview(e) => vec![
            ("pull_request_review", review::handle_review(ctx, e).await),
            (
                "pull_request_review notification",
                notification::handle_review(ctx, e).await,
            ),
        ],
        Event::PullRequestReviewComment(e) => vec![(
            "pull_request_review_comment",
            review::handle_review_comment(ctx, e).await,
        )],
        Event::Push(e) => vec![("push", push::handle(ctx, e).await)],
        Event::Create(e) => vec![("create", refs::handle_create(ctx, e).await)],
        Event::Delete(e) => vec![("delete", refs::handle_delete(ctx, e).await)],
        Event::Star(e) => vec![("star", star::handle(ctx, e).await)],
    };

    for (name, result) in results {
        if let Err(e) = result {
            log::error!(
                "failed to process event on {} with {name} handler: {e:?}",
                repo.full_name
            );
        }
    }
    true
}

/// Subscriptions matching `repo`: repository-level ones first, then those
/// of its owner.
///
/// For private repositories only subscriptions whose creator can still see
/// the repository are kept.
pub(crate) async fn subscriptions_for(ctx: &Context, repo: &Repository) -> Vec<Subscription> {
    let all = match db::subscriptions::load(&*ctx.store).await {
        Ok(all) => all,
        Err(e) => {
            log::warn!("failed to load subscriptions for {}: {e:?}", repo.full_name);
            return Vec::new();
        }
    };
    let candidates: Vec<Subscription> = all
        .for_key(&subscription_key(repo.owner(), repo.name()))
        .iter()
        .chain(all.for_key(&subscription_key(repo.owner(), "")))
        .cloned()
        .collect();

    if !repo.private || candidates.is_empty() {
        return candidates;
    }

    let visible = join_all(
        candidates
            .iter()
            .map(|sub| permissions::can_see(ctx, &sub.creator_id, &repo.full_name)),
    )
    .await;
    candidates
        .into_iter()
        .zip(visible)
        .filter_map(|(sub, visible)| visible.then_some(sub))
        .collect()
}

/// Label filter of a subscription against an object carrying `labels`.
///
/// `applied` is the label added by a `labeled` action: it must be the filter
/// label itself, and subscriptions without a filter ignore such events.
pub(crate) fn label_allows(sub: &Subscription, labels: &[Label], applied: Option<&Label>) -> bool {
    let Some(filter) = sub.label() else {
        return applied.is_none();
    };
    if let Some(applied) = applied
        && applied.name != filter
    {
        return false;
    }
    labels.iter().any(|label| label.name == filter)
}

/// Publishes `message` in the channel of every subscription in `subs`,
/// skipping those that exclude `sender` as an organization member.
pub(crate) async fn fan_out(
    ctx: &Context,
    subs: Vec<Subscription>,
    sender: &User,
    message: &str,
    post_type: PostType,
) {
    let excluded = join_all(
        subs.iter()
            .map(|sub| permissions::excludes_org_member(ctx, sender, sub)),
    )
    .await;
    let posts = subs
        .into_iter()
        .zip(excluded)
        .filter(|(_, excluded)| !excluded)
        .map(|(sub, _)| Post {
            channel_id: sub.channel_id,
            message: message.to_string(),
            post_type,
        })
        .collect::<Vec<_>>();
    deliver(ctx, &posts).await;
}

async fn deliver(ctx: &Context, posts: &[Post]) {
    let results = join_all(posts.iter().map(|post| ctx.chat.create_post(post))).await;
    for (post, result) in posts.iter().zip(results) {
        if let Err(e) = result {
            log::warn!("failed to post in channel {}: {e:?}", post.channel_id);
        }
    }
}
