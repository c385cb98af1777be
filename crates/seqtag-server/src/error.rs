//! HTTP error adapter.
//!
//! The serving layer defines no error taxonomy of its own: tokenization or
//! prediction failures are not recoverable mid-request, so any error
//! propagates unchanged and surfaces as a generic 500 response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

/// Wrapper turning any error into a 500 response.
pub struct ServerError(anyhow::Error);

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        error!("request failed: {:#}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("internal server error: {}", self.0),
        )
            .into_response()
    }
}

impl<E> From<E> for ServerError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
