//! Channel messages for opened, closed, reopened and labeled issues.

use chrono::{TimeDelta, Utc};

use crate::chat::PostType;
use crate::github::{IssuesAction, IssuesEvent};
use crate::handlers::{Context, fan_out, label_allows, subscriptions_for};
use crate::messages::{self, Template};
use crate::subscriptions::{Feature, Subscription};
use tracing as log;

/// Labels applied this soon after creation come from issue templates and
/// are already part of the "new issue" message.
const LABELED_AFTER_CREATION: TimeDelta = TimeDelta::seconds(4);

pub(super) async fn handle(ctx: &Context, event: &IssuesEvent) -> anyhow::Result<()> {
    let (template, applied) = match &event.action {
        IssuesAction::Opened => (Template::NewIssue, None),
        IssuesAction::Closed | IssuesAction::Reopened => (Template::ClosedIssue, None),
        IssuesAction::Labeled { label } => {
            if Utc::now() - event.issue.created_at < LABELED_AFTER_CREATION {
                log::debug!(
                    "skipping label `{}` applied on creation of {}",
                    label.name,
                    event.issue.html_url
                );
                return Ok(());
            }
            (Template::IssueLabeled, Some(label))
        }
        action => {
            log::debug!("skipping issue action {action:?}");
            return Ok(());
        }
    };

    let opened = event.action == IssuesAction::Opened;
    let subs = subscriptions_for(ctx, &event.repository)
        .await
        .into_iter()
        .filter(|sub| wants(sub, opened))
        .filter(|sub| label_allows(sub, &event.issue.labels, applied))
        .collect::<Vec<_>>();
    if subs.is_empty() {
        return Ok(());
    }

    let message = messages::render(template, event)?;
    fan_out(ctx, subs, &event.sender, &message, PostType::Issue).await;
    Ok(())
}

/// `issue_creations` narrows a subscription to newly opened issues.
fn wants(sub: &Subscription, opened: bool) -> bool {
    if sub.has(Feature::IssueCreations) {
        return opened;
    }
    sub.has(Feature::Issues)
}
