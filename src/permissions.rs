//! Live visibility and membership checks, made with the credential of the
//! chat user they concern.

use crate::db;
use crate::github::User;
use crate::handlers::Context;
use crate::subscriptions::Subscription;

/// Whether the chat user `user_id` can see `owner_repo` on GitHub.
///
/// Fails closed: any missing piece or lookup failure answers `false`.
pub async fn can_see(ctx: &Context, user_id: &str, owner_repo: &str) -> bool {
    if user_id.is_empty() {
        return false;
    }
    let Some((owner, repo)) = owner_repo.split_once('/') else {
        return false;
    };
    if owner.is_empty() || repo.is_empty() || !ctx.config.check_org(owner) {
        return false;
    }
    let info = match db::users::user_info(&*ctx.store, user_id).await {
        Ok(Some(info)) => info,
        Ok(None) => return false,
        Err(e) => {
            tracing::warn!("failed to load credential of {user_id}: {e:?}");
            return false;
        }
    };
    match ctx.github.repository(&info.token, owner, repo).await {
        Ok(found) => found.is_some(),
        Err(e) => {
            tracing::warn!("failed to check access of {user_id} to {owner_repo}: {e:?}");
            false
        }
    }
}

/// Whether `sub` drops events sent by `sender` because they belong to the
/// locked organization.
///
/// Membership is looked up with the subscription creator's credential. When
/// it cannot be determined the event is let through.
pub async fn excludes_org_member(ctx: &Context, sender: &User, sub: &Subscription) -> bool {
    if !sub.flags.exclude_org_members {
        return false;
    }
    let Some(org) = &ctx.config.github_org else {
        return false;
    };
    let info = match db::users::user_info(&*ctx.store, &sub.creator_id).await {
        Ok(Some(info)) => info,
        Ok(None) => {
            tracing::warn!(
                "creator {} of a subscription to {} is not connected",
                sub.creator_id,
                sub.repository
            );
            return false;
        }
        Err(e) => {
            tracing::warn!("failed to load credential of {}: {e:?}", sub.creator_id);
            return false;
        }
    };
    match ctx.github.is_org_member(&info.token, org, &sender.login).await {
        Ok(member) => member,
        Err(e) => {
            tracing::warn!("failed to check membership of {} in {org}: {e:?}", sender.login);
            false
        }
    }
}
