//! Channel messages for submitted reviews and new review comments.

use crate::chat::PostType;
use crate::github::{
    CommentAction, PullRequestReviewCommentEvent, PullRequestReviewEvent, ReviewAction,
};
use crate::handlers::{Context, fan_out, label_allows, subscriptions_for};
use crate::messages::{self, Template};
use crate::subscriptions::Feature;
use tracing as log;

pub(super) async fn handle_review(
    ctx: &Context,
    event: &PullRequestReviewEvent,
) -> anyhow::Result<()> {
    if event.action != ReviewAction::Submitted || !event.review.state.is_reportable() {
        log::debug!(
            "skipping review action {:?} with state {:?}",
            event.action,
            event.review.state
        );
        return Ok(());
    }

    let subs = subscriptions_for(ctx, &event.repository)
        .await
        .into_iter()
        .filter(|sub| sub.has(Feature::PullReviews))
        .filter(|sub| label_allows(sub, &event.pull_request.labels, None))
        .collect::<Vec<_>>();
    if subs.is_empty() {
        return Ok(());
    }

    let message = messages::render(Template::PullRequestReview, event)?;
    fan_out(ctx, subs, &event.sender, &message, PostType::Review).await;
    Ok(())
}

pub(super) async fn handle_review_comment(
    ctx: &Context,
    event: &PullRequestReviewCommentEvent,
) -> anyhow::Result<()> {
    if event.action != CommentAction::Created {
        log::debug!("skipping review comment action {:?}", event.action);
        return Ok(());
    }

    let subs = subscriptions_for(ctx, &event.repository)
        .await
        .into_iter()
        .filter(|sub| sub.has(Feature::PullReviews))
        .filter(|sub| label_allows(sub, &event.pull_request.labels, None))
        .collect::<Vec<_>>();
    if subs.is_empty() {
        return Ok(());
    }

    let message = messages::render(Template::ReviewComment, event)?;
    fan_out(ctx, subs, &event.sender, &message, PostType::Review).await;
    Ok(())
}
