//! Token-protected management API, used by the chat plugin to drive
//! subscriptions, mute lists and account connections.

use axum::{
    Json, Router,
    extract::{Path, Request, State},
    http::{StatusCode, header},
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::db::{self, users::UserInfo};
use crate::errors::{AppError, UserError};
use crate::github::PullRequestDetails;
use crate::handlers::Context;
use crate::subscriptions::{self, SubscribeRequest, Subscription};

pub fn routes(ctx: Arc<Context>) -> Router<Arc<Context>> {
    Router::new()
        .route("/subscriptions", post(subscribe).delete(unsubscribe))
        .route(
            "/channels/{channel_id}/subscriptions",
            get(channel_subscriptions),
        )
        .route("/users/{user_id}", put(connect_user).delete(disconnect_user))
        .route("/users/{user_id}/mutes", get(muted_users).delete(unmute_all))
        .route("/users/{user_id}/mutes/{login}", put(mute).delete(unmute))
        .route(
            "/users/{user_id}/pulls/{owner}/{repo}/{number}",
            get(pull_request_details),
        )
        .route_layer(middleware::from_fn_with_state(ctx, require_admin_token))
}

/// Rejects requests without `Authorization: Bearer <ADMIN_TOKEN>`.
async fn require_admin_token(
    State(ctx): State<Arc<Context>>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));
    let expected = ctx.config.admin_token.expose_secret().as_bytes();
    match token {
        Some(token) if bool::from(token.as_bytes().ct_eq(expected)) => Ok(next.run(request).await),
        _ => {
            tracing::warn!("unauthorized request to {}", request.uri().path());
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

async fn subscribe(
    State(ctx): State<Arc<Context>>,
    Json(req): Json<SubscribeRequest>,
) -> Result<Json<Value>, AppError> {
    let message = subscriptions::subscribe(&ctx, req).await?;
    Ok(Json(json!({ "message": message })))
}

#[derive(Deserialize)]
struct UnsubscribeRequest {
    channel_id: String,
    target: String,
}

async fn unsubscribe(
    State(ctx): State<Arc<Context>>,
    Json(req): Json<UnsubscribeRequest>,
) -> Result<Json<Value>, AppError> {
    let message = subscriptions::unsubscribe(&ctx, &req.channel_id, &req.target).await?;
    Ok(Json(json!({ "message": message })))
}

async fn channel_subscriptions(
    State(ctx): State<Arc<Context>>,
    Path(channel_id): Path<String>,
) -> Result<Json<Vec<Subscription>>, AppError> {
    Ok(Json(
        subscriptions::channel_subscriptions(&ctx, &channel_id).await?,
    ))
}

#[derive(Deserialize)]
struct ConnectRequest {
    github_login: String,
    token: String,
}

async fn connect_user(
    State(ctx): State<Arc<Context>>,
    Path(user_id): Path<String>,
    Json(req): Json<ConnectRequest>,
) -> Result<StatusCode, AppError> {
    if req.github_login.trim().is_empty() || req.token.is_empty() {
        return Err(UserError::new("Both `github_login` and `token` are required.").into());
    }
    db::users::connect(
        &*ctx.store,
        &UserInfo {
            user_id,
            github_login: req.github_login.trim().to_string(),
            token: req.token.into(),
        },
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn disconnect_user(
    State(ctx): State<Arc<Context>>,
    Path(user_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let disconnected = db::users::disconnect(&*ctx.store, &user_id).await?;
    Ok(Json(json!({ "disconnected": disconnected })))
}

async fn muted_users(
    State(ctx): State<Arc<Context>>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<String>>, AppError> {
    Ok(Json(db::mutes::muted_users(&*ctx.store, &user_id).await?))
}

async fn mute(
    State(ctx): State<Arc<Context>>,
    Path((user_id, login)): Path<(String, String)>,
) -> Result<Json<Value>, AppError> {
    let added = db::mutes::mute(&*ctx.store, &user_id, &login).await?;
    Ok(Json(json!({ "added": added })))
}

async fn unmute(
    State(ctx): State<Arc<Context>>,
    Path((user_id, login)): Path<(String, String)>,
) -> Result<Json<Value>, AppError> {
    let removed = db::mutes::unmute(&*ctx.store, &user_id, &login).await?;
    Ok(Json(json!({ "removed": removed })))
}

async fn unmute_all(
    State(ctx): State<Arc<Context>>,
    Path(user_id): Path<String>,
) -> Result<StatusCode, AppError> {
    db::mutes::unmute_all(&*ctx.store, &user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn pull_request_details(
    State(ctx): State<Arc<Context>>,
    Path((user_id, owner, repo, number)): Path<(String, String, String, u64)>,
) -> Result<Json<PullRequestDetails>, AppError> {
    let Some(info) = db::users::user_info(&*ctx.store, &user_id).await? else {
        return Err(UserError::new("Connect your GitHub account first.").into());
    };
    let details = ctx
        .github
        .pull_request_details(&info.token, &owner, &repo, number)
        .await?;
    Ok(Json(details))
}
