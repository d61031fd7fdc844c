use chrono::{DateTime, SubsecRound, Utc};
use duet_types::models::{MessageId, UserId};
use rusqlite::{Connection, params};

use crate::models::{MessageRow, format_timestamp};
use crate::{Database, DbError, OptionalExt, Result};

impl Database {
    /// Append a message and return its id. The timestamp is taken here, under
    /// the writer lock, and never moves backwards past the last stored message,
    /// so commit order and timestamp order agree.
    ///
    /// Sender and receiver are not checked against `users` here beyond the
    /// foreign keys; callers validate them first.
    pub fn append_message(
        &self,
        sender_id: &UserId,
        receiver_id: &UserId,
        content: &str,
    ) -> Result<MessageId> {
        if content.trim().is_empty() {
            return Err(DbError::EmptyContent);
        }

        let id = MessageId::new();
        self.with_conn_mut(|conn| {
            let created_at = next_timestamp(conn)?;
            conn.execute(
                "INSERT INTO messages (id, sender_id, receiver_id, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    id.to_string(),
                    sender_id.to_string(),
                    receiver_id.to_string(),
                    content,
                    format_timestamp(&created_at),
                ],
            )?;
            Ok(())
        })?;

        Ok(id)
    }

    /// Both directions of the conversation between `a` and `b`, oldest first.
    /// Equal timestamps fall back to insertion order.
    pub fn get_messages_between(&self, a: &UserId, b: &UserId) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| query_conversation(conn, a, b))
    }

    pub fn count_messages(&self) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM messages", [], |r| r.get(0))?;
            Ok(count as u64)
        })
    }
}

/// Now, truncated to the stored precision and clamped to the newest row.
fn next_timestamp(conn: &Connection) -> Result<DateTime<Utc>> {
    let now = Utc::now().trunc_subsecs(6);

    let last: Option<String> = conn
        .query_row(
            "SELECT created_at FROM messages ORDER BY rowid DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()?;

    let Some(last) = last else {
        return Ok(now);
    };

    let last = DateTime::parse_from_rfc3339(&last)
        .map_err(|e| DbError::Corrupt(format!("message timestamp '{}': {}", last, e)))?
        .with_timezone(&Utc);

    Ok(now.max(last))
}

fn query_conversation(conn: &Connection, a: &UserId, b: &UserId) -> Result<Vec<MessageRow>> {
    // sender_id is a foreign key, so the JOIN always finds the username
    let mut stmt = conn.prepare(
        "SELECT m.id, m.sender_id, m.receiver_id, u.username AS sender_username,
                m.content, m.created_at
         FROM messages m
         JOIN users u ON m.sender_id = u.id
         WHERE (m.sender_id = ?1 AND m.receiver_id = ?2)
            OR (m.sender_id = ?2 AND m.receiver_id = ?1)
         ORDER BY m.created_at ASC, m.rowid ASC",
    )?;

    let rows = stmt
        .query_map(params![a.to_string(), b.to_string()], MessageRow::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::open_temp;
    use std::sync::Arc;
    use std::thread;

    fn user(db: &Database, name: &str) -> UserId {
        let id = UserId::new();
        db.create_user(&id, name, "cred").unwrap();
        id
    }

    fn contents(rows: &[MessageRow]) -> Vec<&str> {
        rows.iter().map(|r| r.content.as_str()).collect()
    }

    #[test]
    fn conversation_is_in_send_order() {
        let (_dir, db) = open_temp();
        let a = user(&db, "alice");
        let b = user(&db, "bob");

        db.append_message(&a, &b, "hi").unwrap();
        db.append_message(&a, &b, "yo").unwrap();
        db.append_message(&b, &a, "sup").unwrap();

        let rows = db.get_messages_between(&a, &b).unwrap();
        assert_eq!(contents(&rows), vec!["hi", "yo", "sup"]);
        assert_eq!(rows[2].sender_username, "bob");
        assert_eq!(rows[0].receiver_id, b);
        assert!(rows.windows(2).all(|w| w[0].created_at <= w[1].created_at));
    }

    #[test]
    fn conversation_is_symmetric() {
        let (_dir, db) = open_temp();
        let a = user(&db, "alice");
        let b = user(&db, "bob");

        db.append_message(&a, &b, "one").unwrap();
        db.append_message(&b, &a, "two").unwrap();
        db.append_message(&a, &b, "three").unwrap();

        let ab = db.get_messages_between(&a, &b).unwrap();
        let ba = db.get_messages_between(&b, &a).unwrap();
        let ab_ids: Vec<_> = ab.iter().map(|r| r.id).collect();
        let ba_ids: Vec<_> = ba.iter().map(|r| r.id).collect();
        assert_eq!(ab_ids, ba_ids);
    }

    #[test]
    fn other_conversations_are_excluded() {
        let (_dir, db) = open_temp();
        let a = user(&db, "alice");
        let b = user(&db, "bob");
        let c = user(&db, "carol");

        db.append_message(&a, &b, "for bob").unwrap();
        db.append_message(&a, &c, "for carol").unwrap();
        db.append_message(&c, &b, "carol to bob").unwrap();

        let rows = db.get_messages_between(&a, &b).unwrap();
        assert_eq!(contents(&rows), vec!["for bob"]);
    }

    #[test]
    fn self_messages_are_a_conversation() {
        let (_dir, db) = open_temp();
        let a = user(&db, "alice");
        db.append_message(&a, &a, "note to self").unwrap();

        let rows = db.get_messages_between(&a, &a).unwrap();
        assert_eq!(contents(&rows), vec!["note to self"]);
    }

    #[test]
    fn blank_content_is_rejected_without_writing() {
        let (_dir, db) = open_temp();
        let a = user(&db, "alice");
        let b = user(&db, "bob");

        for blank in ["", "   ", "\n\t "] {
            let err = db.append_message(&a, &b, blank).unwrap_err();
            assert!(matches!(err, DbError::EmptyContent));
        }
        assert_eq!(db.count_messages().unwrap(), 0);
    }

    #[test]
    fn content_is_stored_verbatim() {
        let (_dir, db) = open_temp();
        let a = user(&db, "alice");
        let b = user(&db, "bob");

        db.append_message(&a, &b, "  padded  ").unwrap();
        let rows = db.get_messages_between(&a, &b).unwrap();
        assert_eq!(rows[0].content, "  padded  ");
    }

    #[test]
    fn unknown_sender_violates_foreign_key() {
        let (_dir, db) = open_temp();
        let b = user(&db, "bob");

        let err = db.append_message(&UserId::new(), &b, "hello").unwrap_err();
        assert!(matches!(err, DbError::Sqlite(_)));
        assert_eq!(db.count_messages().unwrap(), 0);
    }

    #[test]
    fn timestamp_never_moves_behind_the_newest_row() {
        let (_dir, db) = open_temp();
        let a = user(&db, "alice");
        let b = user(&db, "bob");

        // A row stamped ahead of the clock, as after a clock step backwards
        let future = "2999-01-01T00:00:00.000000Z";
        db.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO messages (id, sender_id, receiver_id, content, created_at)
                 VALUES (?1, ?2, ?3, 'future', ?4)",
                params![MessageId::new().to_string(), a.to_string(), b.to_string(), future],
            )?;
            Ok(())
        })
        .unwrap();

        db.append_message(&a, &b, "now").unwrap();

        let rows = db.get_messages_between(&a, &b).unwrap();
        assert_eq!(contents(&rows), vec!["future", "now"]);
        assert_eq!(rows[1].created_at, rows[0].created_at);
        assert_eq!(format_timestamp(&rows[1].created_at), future);
    }

    #[test]
    fn concurrent_appends_read_back_in_a_stable_order() {
        let (_dir, db) = open_temp();
        let db = Arc::new(db);
        let a = user(&db, "alice");
        let b = user(&db, "bob");

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let db = db.clone();
                thread::spawn(move || {
                    for i in 0..10 {
                        let (from, to) = if t % 2 == 0 { (a, b) } else { (b, a) };
                        db.append_message(&from, &to, &format!("{}-{}", t, i)).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let first = db.get_messages_between(&a, &b).unwrap();
        let second = db.get_messages_between(&b, &a).unwrap();
        assert_eq!(first.len(), 40);
        assert!(first.windows(2).all(|w| w[0].created_at <= w[1].created_at));

        let first_ids: Vec<_> = first.iter().map(|r| r.id).collect();
        let second_ids: Vec<_> = second.iter().map(|r| r.id).collect();
        assert_eq!(first_ids, second_ids);

        // Each writer's own messages keep their relative order.
        for t in 0..4 {
            let own: Vec<&str> = first
                .iter()
                .map(|r| r.content.as_str())
                .filter(|c| c.starts_with(&format!("{}-", t)))
                .collect();
            let expected: Vec<String> = (0..10).map(|i| format!("{}-{}", t, i)).collect();
            assert_eq!(own, expected);
        }
    }
}
