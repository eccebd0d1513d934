use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use lobby_store::StoreError;

use crate::notify::NotifyError;

/// Errors surfaced by the route handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request failed validation. The message goes to the client verbatim.
    #[error("{0}")]
    BadRequest(&'static str),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Relay delivery failed after the audit row was already persisted.
    #[error(transparent)]
    Relay(#[from] NotifyError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, Json(msg)).into_response(),
            ApiError::Store(err) => {
                // Full store detail stays in the log; clients get a fixed body.
                error!("data store failure: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json("ERROR: data store failure"),
                )
                    .into_response()
            }
            ApiError::Relay(err) => {
                error!("notification relay failure: {}", err);
                (
                    StatusCode::BAD_GATEWAY,
                    Json("ERROR: notification relay failed"),
                )
                    .into_response()
            }
        }
    }
}
