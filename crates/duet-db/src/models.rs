//! Database row types, built once at the storage boundary from named columns.
//! Distinct from duet-types API models to keep credentials out of the wire types.

use chrono::{DateTime, SecondsFormat, Utc};
use duet_types::models::{MessageId, UserId};
use rusqlite::Row;
use rusqlite::types::Type;

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: UserId,
    pub username: String,
    pub credential: String,
    pub created_at: DateTime<Utc>,
}

impl UserRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, "id")?,
            username: row.get("username")?,
            credential: row.get("credential")?,
            created_at: parse_timestamp(row, "created_at")?,
        })
    }
}

/// A message joined with its sender's username.
#[derive(Debug, Clone)]
pub struct MessageRow {
    pub id: MessageId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub sender_username: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl MessageRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, "id")?,
            sender_id: parse_id(row, "sender_id")?,
            receiver_id: parse_id(row, "receiver_id")?,
            sender_username: row.get("sender_username")?,
            content: row.get("content")?,
            created_at: parse_timestamp(row, "created_at")?,
        })
    }
}

/// Fixed-width RFC 3339 in UTC with microseconds, so text order is time order.
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_id<T>(row: &Row<'_>, column: &str) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = uuid::Error>,
{
    let raw: String = row.get(column)?;
    let idx = row.as_ref().column_index(column)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_timestamp(row: &Row<'_>, column: &str) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(column)?;
    let idx = row.as_ref().column_index(column)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamps_sort_as_text() {
        let early = Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap();
        let later = early + chrono::Duration::microseconds(1);
        let (a, b) = (format_timestamp(&early), format_timestamp(&later));
        assert_eq!(a.len(), b.len());
        assert!(a < b);
        assert_eq!(a, "2026-01-01T09:00:00.000000Z");
    }
}
