use std::sync::Arc;

use tracing::{info, warn};

use duet_crypto::DUMMY_CREDENTIAL;
use duet_db::Database;
use duet_db::models::UserRow;
use duet_types::models::{MessageId, MessageView, Peer, UserId};

use crate::error::{ChatError, Result};

pub const MAX_USERNAME_LEN: usize = 32;

/// Core operations of the messenger, composed over the user and message
/// tables. Every call takes the caller identity explicitly; resolving it from
/// a request is the auth middleware's job.
///
/// All methods block on SQLite. Call them from `spawn_blocking` in async code.
#[derive(Clone)]
pub struct ConversationService {
    db: Arc<Database>,
}

impl ConversationService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn register(&self, username: &str, password: &str) -> Result<UserId> {
        if username.trim().is_empty() {
            return Err(ChatError::InvalidInput("username must not be empty"));
        }
        if username.chars().count() > MAX_USERNAME_LEN {
            return Err(ChatError::InvalidInput("username must be at most 32 characters"));
        }
        if password.is_empty() {
            return Err(ChatError::InvalidInput("password must not be empty"));
        }

        // Skips the hash for the common case; the UNIQUE constraint still
        // decides races.
        if self.db.get_user_by_username(username)?.is_some() {
            return Err(ChatError::DuplicateUsername(username.to_string()));
        }

        let credential = duet_crypto::hash_password(password)?;
        let user_id = UserId::new();
        self.db.create_user(&user_id, username, &credential)?;

        Ok(user_id)
    }

    /// Unknown username and wrong password are both `InvalidCredentials`.
    pub fn login(&self, username: &str, password: &str) -> Result<Peer> {
        let Some(user) = self.db.get_user_by_username(username)? else {
            // Same Argon2 cost as a real check, so a miss is not faster
            let _ = duet_crypto::verify_password(password, DUMMY_CREDENTIAL);
            warn!("Login for unknown user '{}'", username);
            return Err(ChatError::InvalidCredentials);
        };

        if !duet_crypto::verify_password(password, &user.credential) {
            warn!("Wrong password for '{}'", username);
            return Err(ChatError::InvalidCredentials);
        }

        info!("User {} logged in", user.username);
        Ok(peer(user))
    }

    pub fn user(&self, id: &UserId) -> Result<Peer> {
        self.db
            .get_user_by_id(id)?
            .map(peer)
            .ok_or(ChatError::NotFound(*id))
    }

    pub fn list_peers(&self, caller: &UserId) -> Result<Vec<Peer>> {
        self.authenticate(caller)?;
        Ok(self.db.list_users_except(caller)?)
    }

    pub fn send_message(
        &self,
        caller: &UserId,
        receiver: &UserId,
        content: &str,
    ) -> Result<MessageId> {
        self.authenticate(caller)?;
        if content.trim().is_empty() {
            return Err(ChatError::EmptyContent);
        }
        if self.db.get_user_by_id(receiver)?.is_none() {
            return Err(ChatError::NoSuchUser(*receiver));
        }

        Ok(self.db.append_message(caller, receiver, content)?)
    }

    pub fn fetch_history(&self, caller: &UserId, peer: &UserId) -> Result<Vec<MessageView>> {
        self.authenticate(caller)?;

        let rows = self.db.get_messages_between(caller, peer)?;
        Ok(rows
            .into_iter()
            .map(|row| MessageView {
                content: row.content,
                timestamp: row.created_at,
                sender: row.sender_username,
            })
            .collect())
    }

    fn authenticate(&self, caller: &UserId) -> Result<UserRow> {
        self.db
            .get_user_by_id(caller)?
            .ok_or(ChatError::Unauthenticated)
    }
}

fn peer(user: UserRow) -> Peer {
    Peer {
        id: user.id,
        username: user.username,
    }
}
