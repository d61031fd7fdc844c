use axum::{
    Extension, Json,
    extract::{Path, State, rejection::PathRejection},
    response::IntoResponse,
};

use duet_types::api::Claims;
use duet_types::models::UserId;

use crate::error::Result;
use crate::state::AppState;

/// Everyone the caller can message.
pub async fn list_peers(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let peers = state.run(move |svc| svc.list_peers(&claims.sub)).await?;
    Ok(Json(peers))
}

pub async fn get_user(
    State(state): State<AppState>,
    path: std::result::Result<Path<UserId>, PathRejection>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let Path(user_id) = path?;
    let user = state.run(move |svc| svc.user(&user_id)).await?;
    Ok(Json(user))
}
