use crate::chat::PostType;
use crate::github::{StarAction, StarEvent};
use crate::handlers::{Context, fan_out, subscriptions_for};
use crate::messages::{self, Template};
use crate::subscriptions::Feature;
use tracing as log;

pub(super) async fn handle(ctx: &Context, event: &StarEvent) -> anyhow::Result<()> {
    if !matches!(event.action, StarAction::Created | StarAction::Deleted) {
        log::debug!("skipping star action {:?}", event.action);
        return Ok(());
    }

    let subs = subscriptions_for(ctx, &event.repository)
        .await
        .into_iter()
        .filter(|sub| sub.has(Feature::Stars))
        .collect::<Vec<_>>();
    if subs.is_empty() {
        return Ok(());
    }

    let message = messages::render(Template::Star, event)?;
    fan_out(ctx, subs, &event.sender, &message, PostType::Star).await;
    Ok(())
}
