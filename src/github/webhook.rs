use std::{fmt, sync::Arc};

use anyhow::Context as _;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use bytes::Bytes;
use hmac::{Hmac, Mac};
use secrecy::ExposeSecret;
use sha1::Sha1;
use tracing::debug;

use crate::handlers::Context;

use super::*;

pub mod event;

const SIGNATURE_PREFIX: &str = "sha1=";
/// `sha1=` followed by the 40 hex digits of the digest.
const SIGNATURE_LEN: usize = 45;

/// The name of a webhook event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventName {
    /// <https://docs.github.com/en/webhooks/webhook-events-and-payloads#push>
    Push,
    /// <https://docs.github.com/en/webhooks/webhook-events-and-payloads#pull_request>
    PullRequest,
    /// <https://docs.github.com/en/webhooks/webhook-events-and-payloads#pull_request_review>
    PullRequestReview,
    /// <https://docs.github.com/en/webhooks/webhook-events-and-payloads#pull_request_review_comment>
    PullRequestReviewComment,
    /// <https://docs.github.com/en/webhooks/webhook-events-and-payloads#issues>
    Issue,
    /// An issue or PR comment.
    ///
    /// <https://docs.github.com/en/webhooks/webhook-events-and-payloads#issue_comment>
    IssueComment,
    /// <https://docs.github.com/en/webhooks/webhook-events-and-payloads#create>
    Create,
    /// <https://docs.github.com/en/webhooks/webhook-events-and-payloads#delete>
    Delete,
    /// <https://docs.github.com/en/webhooks/webhook-events-and-payloads#star>
    Star,
    /// All other unhandled webhooks, including `ping`.
    Other,
}

impl std::str::FromStr for EventName {
    type Err = std::convert::Infallible;
    fn from_str(s: &str) -> Result<EventName, Self::Err> {
        Ok(match s {
            "push" => EventName::Push,
            "pull_request" => EventName::PullRequest,
            "pull_request_review" => EventName::PullRequestReview,
            "pull_request_review_comment" => EventName::PullRequestReviewComment,
            "issues" => EventName::Issue,
            "issue_comment" => EventName::IssueComment,
            "create" => EventName::Create,
            "delete" => EventName::Delete,
            "star" => EventName::Star,
            _ => EventName::Other,
        })
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                EventName::Push => "push",
                EventName::PullRequest => "pull_request",
                EventName::PullRequestReview => "pull_request_review",
                EventName::PullRequestReviewComment => "pull_request_review_comment",
                EventName::Issue => "issues",
                EventName::IssueComment => "issue_comment",
                EventName::Create => "create",
                EventName::Delete => "delete",
                EventName::Star => "star",
                EventName::Other => "other",
            }
        )
    }
}

pub fn deserialize_payload<T: serde::de::DeserializeOwned>(v: &str) -> anyhow::Result<T> {
    let mut deserializer = serde_json::Deserializer::from_str(v);
    let res: Result<T, _> = serde_path_to_error::deserialize(&mut deserializer);
    match res {
        Ok(r) => Ok(r),
        Err(e) => Err(anyhow::anyhow!("webhook payload: {v}").context(e)),
    }
}

/// Checks a `X-Hub-Signature` header against the HMAC-SHA1 of `payload`.
///
/// A header of the wrong shape is simply not valid, while one that has the
/// right shape but does not hex-decode is reported as an error.
pub fn verify_signature(secret: &[u8], signature: &str, payload: &[u8]) -> anyhow::Result<bool> {
    if signature.len() != SIGNATURE_LEN {
        return Ok(false);
    }
    let Some(digest) = signature.strip_prefix(SIGNATURE_PREFIX) else {
        return Ok(false);
    };
    let digest = hex::decode(digest).context("signature is not hex encoded")?;

    let mut mac = Hmac::<Sha1>::new_from_slice(secret)
        .map_err(|_| anyhow::anyhow!("invalid webhook secret"))?;
    mac.update(payload);
    Ok(mac.verify_slice(&digest).is_ok())
}

pub async fn webhook(
    headers: HeaderMap,
    State(ctx): State<Arc<Context>>,
    body: Bytes,
) -> axum::response::Response {
    // Extract X-GitHub-Event header
    let Some(ev) = headers.get("X-GitHub-Event") else {
        tracing::error!("X-GitHub-Event header must be set");
        return (StatusCode::BAD_REQUEST, "X-GitHub-Event header must be set").into_response();
    };
    let Ok(ev) = ev.to_str() else {
        tracing::error!("X-GitHub-Event header must be UTF-8 encoded");
        return (
            StatusCode::BAD_REQUEST,
            "X-GitHub-Event header must be UTF-8 encoded",
        )
            .into_response();
    };
    let Ok(event) = ev.parse::<EventName>();

    debug!("event={event}");

    // A missing header is treated like a wrong one.
    let signature = headers
        .get("X-Hub-Signature")
        .and_then(|sig| sig.to_str().ok())
        .unwrap_or_default();

    match verify_signature(
        ctx.config.webhook_secret.expose_secret().as_bytes(),
        signature,
        &body,
    ) {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!("rejecting {event} delivery with an invalid signature");
            return (StatusCode::UNAUTHORIZED, "Wrong signature").into_response();
        }
        Err(err) => {
            tracing::error!("failed to verify signature: {err:?}");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Invalid signature").into_response();
        }
    }

    let Ok(payload) = std::str::from_utf8(&body) else {
        tracing::error!("payload not utf-8");
        return (StatusCode::BAD_REQUEST, "Payload must be UTF-8").into_response();
    };

    if ctx.config.enable_webhook_event_logging {
        debug!("webhook event {event}: {payload}");
    }

    let event = match parse_event(event, payload) {
        Ok(Some(event)) => event,
        Ok(None) => return ("ignored request",).into_response(),
        Err(err) => {
            tracing::error!("{err:?}");
            let body = format!("request failed: {err:?}");
            return (StatusCode::BAD_REQUEST, body).into_response();
        }
    };

    if crate::handlers::handle(&ctx, &event).await {
        ("processed request",).into_response()
    } else {
        ("ignored request",).into_response()
    }
}

/// Decodes the payload of a delivery, returning `None` for event kinds the
/// bridge does not handle.
pub fn parse_event(event: EventName, payload: &str) -> anyhow::Result<Option<Event>> {
    let event = match event {
        EventName::Push => Event::Push(
            deserialize_payload(payload).context("failed to deserialize to PushEvent")?,
        ),
        EventName::PullRequest => Event::PullRequest(
            deserialize_payload(payload).context("failed to deserialize to PullRequestEvent")?,
        ),
        EventName::PullRequestReview => Event::PullRequestReview(
            deserialize_payload(payload)
                .context("failed to deserialize to PullRequestReviewEvent")?,
        ),
        EventName::PullRequestReviewComment => Event::PullRequestReviewComment(
            deserialize_payload(payload)
                .context("failed to deserialize to PullRequestReviewCommentEvent")?,
        ),
        EventName::Issue => Event::Issue(
            deserialize_payload(payload).context("failed to deserialize to IssuesEvent")?,
        ),
        EventName::IssueComment => Event::IssueComment(
            deserialize_payload(payload).context("failed to deserialize to IssueCommentEvent")?,
        ),
        EventName::Create => Event::Create(
            deserialize_payload(payload).context("failed to deserialize to CreateEvent")?,
        ),
        EventName::Delete => Event::Delete(
            deserialize_payload(payload).context("failed to deserialize to DeleteEvent")?,
        ),
        EventName::Star => Event::Star(
            deserialize_payload(payload).context("failed to deserialize to StarEvent")?,
        ),
        // Other events need not be handled
        EventName::Other => return Ok(None),
    };
    debug!("handling {} event from {}", event_name(&event), event.repo().full_name);
    Ok(Some(event))
}

fn event_name(event: &Event) -> EventName {
    match event {
        Event::Push(_) => EventName::Push,
        Event::PullRequest(_) => EventName::PullRequest,
        Event::PullRequestReview(_) => EventName::PullRequestReview,
        Event::PullRequestReviewComment(_) => EventName::PullRequestReviewComment,
        Event::Issue(_) => EventName::Issue,
        Event::IssueComment(_) => EventName::IssueComment,
        Event::Create(_) => EventName::Create,
        Event::Delete(_) => EventName::Delete,
        Event::Star(_) => EventName::Star,
    }
}
