//! Channel messages for created and deleted branches and tags.

use crate::chat::PostType;
use crate::github::{RefEvent, RefKind};
use crate::handlers::{Context, fan_out, subscriptions_for};
use crate::messages::{self, Template};
use crate::subscriptions::Feature;
use tracing as log;

pub(super) async fn handle_create(ctx: &Context, event: &RefEvent) -> anyhow::Result<()> {
    handle_ref(ctx, event, Feature::Creates, Template::NewRef).await
}

pub(super) async fn handle_delete(ctx: &Context, event: &RefEvent) -> anyhow::Result<()> {
    handle_ref(ctx, event, Feature::Deletes, Template::DeletedRef).await
}

async fn handle_ref(
    ctx: &Context,
    event: &RefEvent,
    feature: Feature,
    template: Template,
) -> anyhow::Result<()> {
    if !matches!(event.ref_type, RefKind::Branch | RefKind::Tag) {
        log::debug!("skipping {feature} of unknown ref type `{}`", event.git_ref);
        return Ok(());
    }

    let subs = subscriptions_for(ctx, &event.repository)
        .await
        .into_iter()
        .filter(|sub| sub.has(feature))
        .collect::<Vec<_>>();
    if subs.is_empty() {
        return Ok(());
    }

    let message = messages::render(template, event)?;
    fan_out(ctx, subs, &event.sender, &message, PostType::Ref).await;
    Ok(())
}
