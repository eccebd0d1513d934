use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use lobby_types::api::PostNtfyRequest;

use crate::error::ApiError;
use crate::state::AppState;

/// POST /ntfy — persist the text as an audit row, then relay it verbatim.
/// The audit insert happens first, so a dead relay still leaves a record.
pub async fn relay_notification(
    State(state): State<AppState>,
    Json(req): Json<PostNtfyRequest>,
) -> Result<StatusCode, ApiError> {
    let text = match req.text {
        Some(t) if !t.is_empty() => t,
        _ => return Err(ApiError::BadRequest("ERROR: missing `text`")),
    };

    state.store.insert_notification(&text).await?;
    state.notifier.relay(&text).await?;

    Ok(StatusCode::OK)
}
