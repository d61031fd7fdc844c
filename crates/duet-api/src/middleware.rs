use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};

use duet_types::api::Claims;

use crate::error::ChatError;
use crate::state::AppState;

/// Extract and validate the JWT from the Authorization header and hand the
/// resolved `Claims` to the handler as a request extension.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ChatError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ChatError::Unauthenticated)?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ChatError::Unauthenticated)?;

    req.extensions_mut().insert(token_data.claims);
    Ok(next.run(req).await)
}
