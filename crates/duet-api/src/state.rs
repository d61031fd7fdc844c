use std::sync::Arc;

use tracing::error;

use crate::error::{ChatError, Result};
use crate::service::ConversationService;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub service: ConversationService,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
}

impl AppStateInner {
    /// Run a blocking service call off the async runtime.
    pub async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(ConversationService) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let service = self.service.clone();
        tokio::task::spawn_blocking(move || f(service))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                ChatError::Internal(e.into())
            })?
    }
}
