use axum::{
    Extension, Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};

use duet_types::api::{Claims, SendMessageRequest, SendMessageResponse};
use duet_types::models::UserId;

use crate::error::Result;
use crate::state::AppState;

/// Append a message from the caller to `peer_id`.
pub async fn send_message(
    State(state): State<AppState>,
    path: std::result::Result<Path<UserId>, PathRejection>,
    Extension(claims): Extension<Claims>,
    body: std::result::Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Path(peer_id) = path?;
    let Json(req) = body?;
    let message_id = state
        .run(move |svc| svc.send_message(&claims.sub, &peer_id, &req.content))
        .await?;

    Ok((StatusCode::CREATED, Json(SendMessageResponse { message_id })))
}

/// Full conversation between the caller and `peer_id`, oldest first.
/// Clients poll this; there is no push channel.
pub async fn get_history(
    State(state): State<AppState>,
    path: std::result::Result<Path<UserId>, PathRejection>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let Path(peer_id) = path?;
    let messages = state
        .run(move |svc| svc.fetch_history(&claims.sub, &peer_id))
        .await?;

    Ok(Json(messages))
}
