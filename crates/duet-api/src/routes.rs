use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::middleware::require_auth;
use crate::state::AppState;
use crate::{auth, messages, users};

/// All API routes. Transport layers (CORS, tracing) are added by the binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login));

    let protected_routes = Router::new()
        .route("/users", get(users::list_peers))
        .route("/users/{user_id}", get(users::get_user))
        .route(
            "/messages/{peer_id}",
            get(messages::get_history).post(messages::send_message),
        )
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
