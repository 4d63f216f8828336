//! A bridge relaying GitHub webhook events to chat channels and users.

use axum::{
    Router,
    http::HeaderName,
    routing::{get, post},
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

pub mod api;
pub mod chat;
pub mod config;
pub mod db;
pub mod errors;
pub mod github;
pub mod handlers;
pub mod messages;
pub mod permissions;
pub mod subscriptions;

#[cfg(test)]
mod tests;

pub use handlers::Context;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Builds the HTTP frontend: the webhook endpoint, the management API under
/// `/api/v1` and a health check.
pub fn router(ctx: Arc<Context>) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);
    Router::new()
        .route("/", get(|| async { "hubrelay is running" }))
        .route("/webhook", post(github::webhook))
        .nest("/api/v1", api::routes(ctx.clone()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::new(request_id))
                .layer(CatchPanicLayer::new()),
        )
        .with_state(ctx)
}
