//! Channel messages for opened, closed and labeled pull requests.

use crate::chat::PostType;
use crate::github::{PullRequestAction, PullRequestEvent};
use crate::handlers::{Context, fan_out, label_allows, subscriptions_for};
use crate::messages::{self, Template};
use crate::subscriptions::{Feature, Subscription};
use tracing as log;

pub(super) async fn handle(ctx: &Context, event: &PullRequestEvent) -> anyhow::Result<()> {
    let (template, applied) = match &event.action {
        PullRequestAction::Opened => (Template::NewPullRequest, None),
        PullRequestAction::Closed => (Template::ClosedPullRequest, None),
        PullRequestAction::Labeled { label } => (Template::PullRequestLabeled, Some(label)),
        action => {
            log::debug!("skipping pull request action {action:?}");
            return Ok(());
        }
    };

    let closed = event.action == PullRequestAction::Closed;
    let subs = subscriptions_for(ctx, &event.repository)
        .await
        .into_iter()
        .filter(|sub| wants(sub, closed))
        .filter(|sub| label_allows(sub, &event.pull_request.labels, applied))
        .collect::<Vec<_>>();
    if subs.is_empty() {
        return Ok(());
    }

    let message = messages::render(template, event)?;
    fan_out(ctx, subs, &event.sender, &message, PostType::PullRequest).await;
    Ok(())
}

/// `pulls_merged` narrows a subscription to closing events only.
fn wants(sub: &Subscription, closed: bool) -> bool {
    if sub.has(Feature::PullsMerged) {
        return closed;
    }
    sub.has(Feature::Pulls)
}
