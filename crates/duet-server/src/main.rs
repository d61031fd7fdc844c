mod config;

use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use duet_api::{AppState, AppStateInner, ConversationService};
use duet_db::Database;

use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "duet=debug,duet_api=debug,duet_db=info,tower_http=debug".into()
            }),
        )
        .init();

    let config = ServerConfig::from_env()?;

    // Storage lives for the whole process and closes when the last Arc drops
    let db = Arc::new(Database::open_with_readers(
        &config.db_path,
        config.reader_pool_size,
    )?);

    info!(
        "Loaded {} users and {} messages",
        db.count_users()?,
        db.count_messages()?
    );

    let app_state: AppState = Arc::new(AppStateInner {
        service: ConversationService::new(db),
        jwt_secret: config.jwt_secret.clone(),
        token_ttl: config.token_ttl,
    });

    let app = duet_api::router(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    info!("Duet server listening on {}", config.addr);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Duet server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
