//! Channel subscriptions: what a channel wants to hear about, and the
//! operations that create and remove them.

use anyhow::Context as _;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::db;
use crate::errors::UserError;
use crate::handlers::Context;

pub const DEFAULT_FEATURES: &str = "pulls,issues,creates,deletes";

/// A kind of activity a channel can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Feature {
    Issues,
    IssueCreations,
    Pulls,
    PullsMerged,
    Pushes,
    Creates,
    Deletes,
    IssueComments,
    PullReviews,
    Stars,
}

impl Feature {
    pub const ALL: [Feature; 10] = [
        Feature::Issues,
        Feature::IssueCreations,
        Feature::Pulls,
        Feature::PullsMerged,
        Feature::Pushes,
        Feature::Creates,
        Feature::Deletes,
        Feature::IssueComments,
        Feature::PullReviews,
        Feature::Stars,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Feature::Issues => "issues",
            Feature::IssueCreations => "issue_creations",
            Feature::Pulls => "pulls",
            Feature::PullsMerged => "pulls_merged",
            Feature::Pushes => "pushes",
            Feature::Creates => "creates",
            Feature::Deletes => "deletes",
            Feature::IssueComments => "issue_comments",
            Feature::PullReviews => "pull_reviews",
            Feature::Stars => "stars",
        }
    }

    fn from_name(name: &str) -> Option<Feature> {
        Feature::ALL
            .into_iter()
            .find(|feature| feature.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The feature set of a subscription plus an optional label filter.
///
/// Serialized in its text form, e.g. `pulls,issues,label:"bug"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Features {
    set: BTreeSet<Feature>,
    label: Option<String>,
}

struct Parsed<'a> {
    features: Features,
    labels: usize,
    invalid: Vec<&'a str>,
}

impl Features {
    /// Parses and validates a feature list as typed by a user.
    pub fn parse(input: &str) -> Result<Features, UserError> {
        let Parsed {
            features,
            labels,
            invalid,
        } = Features::scan(input);

        if !invalid.is_empty() {
            return Err(UserError(format!(
                "Invalid feature(s) provided: {}",
                invalid.join(", ")
            )));
        }
        if labels > 1 {
            return Err(UserError::new("Only one label filter is allowed."));
        }
        if features.label.is_some() && !features.has(Feature::Pulls) && !features.has(Feature::Issues) {
            return Err(UserError::new(
                "Feature list must include \"pulls\" or \"issues\" when using a label.",
            ));
        }
        if features.has(Feature::Issues) && features.has(Feature::IssueCreations) {
            return Err(UserError::new(
                "Feature list cannot contain both \"issues\" and \"issue_creations\".",
            ));
        }
        Ok(features)
    }

    fn scan(input: &str) -> Parsed<'_> {
        let mut parsed = Parsed {
            features: Features::default(),
            labels: 0,
            invalid: Vec::new(),
        };
        for token in split_unquoted_commas(input) {
            if let Some(value) = token.strip_prefix("label:") {
                match unquote(value) {
                    Some(label) => {
                        parsed.labels += 1;
                        parsed.features.label = Some(label.to_string());
                    }
                    None => parsed.invalid.push(token),
                }
                continue;
            }
            match Feature::from_name(token) {
                Some(feature) => {
                    parsed.features.set.insert(feature);
                }
                None => parsed.invalid.push(token),
            }
        }
        parsed
    }

    pub fn has(&self, feature: Feature) -> bool {
        self.set.contains(&feature)
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

// Stored lists were validated when written; unknown names are dropped.
impl From<String> for Features {
    fn from(text: String) -> Features {
        Features::scan(&text).features
    }
}

impl From<Features> for String {
    fn from(features: Features) -> String {
        features.to_string()
    }
}

impl fmt::Display for Features {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let label = self.label.as_ref().map(|label| format!("label:\"{label}\""));
        let text = self
            .set
            .iter()
            .map(|feature| feature.as_str().to_string())
            .chain(label)
            .join(",");
        f.write_str(&text)
    }
}

fn split_unquoted_commas(input: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    for (idx, c) in input.char_indices() {
        match c {
            '"' => quoted = !quoted,
            ',' if !quoted => {
                tokens.push(&input[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    tokens.push(&input[start..]);
    tokens
        .into_iter()
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .collect()
}

fn unquote(value: &str) -> Option<&str> {
    let value = value.trim();
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
        .trim();
    (!value.is_empty() && !value.contains('"')).then_some(value)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionFlags {
    /// Drop events whose sender belongs to the locked organization.
    #[serde(default)]
    pub exclude_org_members: bool,
    /// Some repositories of the organization have notifications turned off.
    #[serde(default)]
    pub exclude_org_repos: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub channel_id: String,
    pub creator_id: String,
    /// Lower-cased `owner/repo`, or `owner/` for a whole organization.
    pub repository: String,
    pub features: Features,
    #[serde(default)]
    pub flags: SubscriptionFlags,
}

impl Subscription {
    pub fn has(&self, feature: Feature) -> bool {
        self.features.has(feature)
    }

    pub fn label(&self) -> Option<&str> {
        self.features.label()
    }

    pub fn is_org_level(&self) -> bool {
        self.repository.ends_with('/')
    }
}

/// Store key for a subscription target; an empty `repo` means the whole
/// organization.
pub fn subscription_key(owner: &str, repo: &str) -> String {
    format!("{}/{}", owner.to_lowercase(), repo.to_lowercase())
}

/// Splits `owner`, `owner/repo` or a repository URL into its lower-cased
/// owner and (possibly empty) repository name.
pub fn parse_target(target: &str, base_url: &str) -> Option<(String, String)> {
    let target = target.trim();
    let target = target.strip_prefix(base_url).unwrap_or(target);
    let target = target.trim_matches('/');
    let mut parts = target.split('/');
    let owner = parts.next().filter(|owner| !owner.is_empty())?;
    let repo = parts.next().unwrap_or_default();
    if parts.next().is_some() {
        return None;
    }
    Some((owner.to_lowercase(), repo.to_lowercase()))
}

/// A request to subscribe a channel to a repository or organization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscribeRequest {
    pub creator_id: String,
    pub channel_id: String,
    pub target: String,
    #[serde(default)]
    pub features: Option<String>,
    #[serde(default)]
    pub exclude_org_members: bool,
    /// Repositories of the organization that should stay silent.
    #[serde(default)]
    pub exclude: Vec<String>,
}

pub async fn subscribe(ctx: &Context, req: SubscribeRequest) -> anyhow::Result<String> {
    let (owner, repo) = parse_target(&req.target, &ctx.config.github_base_url)
        .ok_or_else(|| UserError::new("Invalid repository. Use `owner` or `owner/repo`."))?;

    if !ctx.config.check_org(&owner) {
        return Err(UserError(format!(
            "Only repositories in the `{}` organization are supported.",
            ctx.config.github_org.as_deref().unwrap_or_default()
        ))
        .into());
    }
    if req.exclude_org_members && ctx.config.github_org.is_none() {
        return Err(UserError::new(
            "Excluding organization members requires the bridge to be locked to an organization.",
        )
        .into());
    }

    let features = match req.features.as_deref().map(str::trim) {
        Some(features) if !features.is_empty() => Features::parse(features)?,
        _ => Features::parse(DEFAULT_FEATURES)?,
    };

    let names: Vec<&str> = req
        .exclude
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .collect();
    if !names.is_empty() && !repo.is_empty() {
        return Err(UserError::new(
            "Repositories can only be excluded from organization subscriptions.",
        )
        .into());
    }
    let mut exclude = Vec::with_capacity(names.len());
    for name in names {
        match parse_target(name, &ctx.config.github_base_url) {
            Some((ex_owner, ex_repo)) if ex_owner == owner && !ex_repo.is_empty() => {
                exclude.push(format!("{ex_owner}/{ex_repo}"));
            }
            _ => {
                return Err(UserError(format!(
                    "`{name}` is not a repository of the `{owner}` organization."
                ))
                .into());
            }
        }
    }
    exclude.dedup();

    let Some(creator) = db::users::user_info(&*ctx.store, &req.creator_id).await? else {
        return Err(
            UserError::new("You must connect your GitHub account before subscribing.").into(),
        );
    };

    let mut private = false;
    if repo.is_empty() {
        let exists = ctx
            .github
            .owner_exists(&creator.token, &owner)
            .await
            .with_context(|| format!("failed to look up `{owner}`"))?;
        if !exists {
            return Err(UserError(format!("Unable to find organization or user `{owner}`.")).into());
        }
    } else {
        let found = ctx
            .github
            .repository(&creator.token, &owner, &repo)
            .await
            .with_context(|| format!("failed to look up `{owner}/{repo}`"))?;
        match found {
            Some(found) => private = found.private,
            None => {
                return Err(UserError(format!(
                    "Unable to find repository `{owner}/{repo}`. \
                    Make sure it exists and that you have access to it."
                ))
                .into());
            }
        }
    }

    for name in &exclude {
        db::notifications_off::disable(&*ctx.store, name).await?;
    }

    let subscription = Subscription {
        channel_id: req.channel_id.clone(),
        creator_id: req.creator_id.clone(),
        repository: subscription_key(&owner, &repo),
        features,
        flags: SubscriptionFlags {
            exclude_org_members: req.exclude_org_members,
            exclude_org_repos: !exclude.is_empty(),
        },
    };
    db::subscriptions::add(&*ctx.store, subscription).await?;

    let target = if repo.is_empty() {
        owner.clone()
    } else {
        format!("{owner}/{repo}")
    };
    let mut message = format!("Successfully subscribed to {target}.");
    if !exclude.is_empty() {
        message.push_str(&format!(
            "\nNotifications are turned off for: {}.",
            exclude.join(", ")
        ));
    }
    if private && !ctx.config.enable_private_repos {
        message.push_str(
            "\n\n**Warning:** this repository is private and private repositories are \
            not enabled, so no notifications will be posted.",
        );
    } else if private {
        message.push_str(
            "\n\n**Warning:** this repository is private. \
            Everyone in the channel will see its activity.",
        );
    }

    if let Err(e) = ctx
        .chat
        .send_ephemeral_post(&req.creator_id, &req.channel_id, &message)
        .await
    {
        tracing::warn!("failed to confirm subscription to {}: {e:?}", req.creator_id);
    }
    Ok(message)
}

pub async fn unsubscribe(ctx: &Context, channel_id: &str, target: &str) -> anyhow::Result<String> {
    let (owner, repo) = parse_target(target, &ctx.config.github_base_url)
        .ok_or_else(|| UserError::new("Invalid repository. Use `owner` or `owner/repo`."))?;

    db::notifications_off::enable(&*ctx.store, &format!("{owner}/{repo}")).await?;
    let removed =
        db::subscriptions::remove(&*ctx.store, channel_id, &subscription_key(&owner, &repo))
            .await?;

    let target = if repo.is_empty() {
        owner
    } else {
        format!("{owner}/{repo}")
    };
    if removed {
        Ok(format!("Successfully unsubscribed from {target}."))
    } else {
        Ok(format!("This channel was not subscribed to {target}."))
    }
}

pub async fn channel_subscriptions(
    ctx: &Context,
    channel_id: &str,
) -> anyhow::Result<Vec<Subscription>> {
    db::subscriptions::for_channel(&*ctx.store, channel_id).await
}
