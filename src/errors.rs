//! Errors handling

use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Represent a user error.
///
/// The message is shown to the user who issued the command, either as an
/// ephemeral chat post or in the body of a `400 Bad Request` answer.
#[derive(Debug)]
pub struct UserError(pub String);

impl UserError {
    pub fn new(msg: impl Into<String>) -> Self {
        UserError(msg.into())
    }
}

impl std::error::Error for UserError {}

impl fmt::Display for UserError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Represent a application error.
///
/// Useful for returning a error via the API. Wrapped [`UserError`]s are
/// answered with `400`, anything else with `500`.
#[derive(Debug)]
pub struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(user_error) = self.0.downcast_ref::<UserError>() {
            tracing::info!("user error: {user_error}");
            return (StatusCode::BAD_REQUEST, user_error.0.clone()).into_response();
        }
        tracing::error!("{:?}", &self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Something went wrong: {}", self.0),
        )
            .into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        AppError(err.into())
    }
}
