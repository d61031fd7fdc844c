use chrono::Utc;
use duet_types::models::{Peer, UserId};
use rusqlite::{Connection, params};
use tracing::info;

use crate::models::{UserRow, format_timestamp};
use crate::{Database, DbError, OptionalExt, Result};

const USER_COLUMNS: &str = "id, username, credential, created_at";

impl Database {
    /// Insert a new user. The UNIQUE constraint on `username` is the only
    /// uniqueness check, so two racing registrations cannot both succeed.
    pub fn create_user(&self, id: &UserId, username: &str, credential: &str) -> Result<()> {
        let created_at = format_timestamp(&Utc::now());
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, credential, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![id.to_string(), username, credential, created_at],
            )
            .map_err(|e| {
                if DbError::is_unique_violation(&e) {
                    DbError::UsernameTaken(username.to_string())
                } else {
                    e.into()
                }
            })?;
            Ok(())
        })?;

        info!("Created user {} ({})", username, id);
        Ok(())
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_id(&self, id: &UserId) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", &id.to_string()))
    }

    /// Every user except `exclude`, in registration order.
    pub fn list_users_except(&self, exclude: &UserId) -> Result<Vec<Peer>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, username FROM users WHERE id != ?1 ORDER BY rowid")?;

            let rows = stmt
                .query_map([exclude.to_string()], |row| {
                    let raw: String = row.get(0)?;
                    Ok((raw, row.get::<_, String>(1)?))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.into_iter()
                .map(|(raw, username)| {
                    let id = raw
                        .parse()
                        .map_err(|e| DbError::Corrupt(format!("user id '{}': {}", raw, e)))?;
                    Ok(Peer { id, username })
                })
                .collect()
        })
    }

    pub fn count_users(&self) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?;
            Ok(count as u64)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {} FROM users WHERE {} = ?1", USER_COLUMNS, column);
    let mut stmt = conn.prepare(&sql)?;
    stmt.query_row([value], UserRow::from_row).optional()
}
