pub mod auth;
pub mod error;
pub mod messages;
pub mod middleware;
pub mod routes;
pub mod service;
pub mod state;
pub mod users;

pub use error::ChatError;
pub use routes::router;
pub use service::ConversationService;
pub use state::{AppState, AppStateInner};
