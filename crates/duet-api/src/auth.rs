use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};

use duet_types::api::{Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};
use duet_types::models::UserId;

use crate::error::Result;
use crate::state::AppState;

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse> {
    let username = req.username.clone();
    let user_id = state
        .run(move |svc| svc.register(&req.username, &req.password))
        .await?;

    let token = create_token(&state.jwt_secret, state.token_ttl, user_id, &username)?;

    Ok((StatusCode::CREATED, Json(RegisterResponse { user_id, token })))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse> {
    let user = state
        .run(move |svc| svc.login(&req.username, &req.password))
        .await?;

    let token = create_token(&state.jwt_secret, state.token_ttl, user.id, &user.username)?;

    Ok(Json(LoginResponse {
        user_id: user.id,
        username: user.username,
        token,
    }))
}

pub fn create_token(
    secret: &str,
    ttl: chrono::Duration,
    user_id: UserId,
    username: &str,
) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + ttl).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
