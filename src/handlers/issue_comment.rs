use crate::chat::PostType;
use crate::github::{CommentAction, IssueCommentEvent};
use crate::handlers::{Context, fan_out, label_allows, subscriptions_for};
use crate::messages::{self, Template};
use crate::subscriptions::Feature;
use tracing as log;

pub(super) async fn handle(ctx: &Context, event: &IssueCommentEvent) -> anyhow::Result<()> {
    if event.action != CommentAction::Created {
        log::debug!("skipping issue comment action {:?}", event.action);
        return Ok(());
    }

    let subs = subscriptions_for(ctx, &event.repository)
        .await
        .into_iter()
        .filter(|sub| sub.has(Feature::IssueComments))
        .filter(|sub| label_allows(sub, &event.issue.labels, None))
        .collect::<Vec<_>>();
    if subs.is_empty() {
        return Ok(());
    }

    let message = messages::render(Template::IssueComment, event)?;
    fan_out(ctx, subs, &event.sender, &message, PostType::Comment).await;
    Ok(())
}
