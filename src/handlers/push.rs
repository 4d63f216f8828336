use crate::chat::PostType;
use crate::github::PushEvent;
use crate::handlers::{Context, fan_out, subscriptions_for};
use crate::messages::{self, Template};
use crate::subscriptions::Feature;
use tracing as log;

pub(super) async fn handle(ctx: &Context, event: &PushEvent) -> anyhow::Result<()> {
    if event.commits.is_empty() {
        log::debug!("skipping push without commits to {}", event.short_ref());
        return Ok(());
    }

    let subs = subscriptions_for(ctx, &event.repository)
        .await
        .into_iter()
        .filter(|sub| sub.has(Feature::Pushes))
        .collect::<Vec<_>>();
    if subs.is_empty() {
        return Ok(());
    }

    let message = messages::render(Template::PushedCommits, event)?;
    fan_out(ctx, subs, &event.sender, &message, PostType::Push).await;
    Ok(())
}
