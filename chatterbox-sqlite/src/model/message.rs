use chrono::{DateTime, Utc};
use serde::Serialize;

/// A single message on the board, one row of the `messages` table.
///
/// Timestamps serialize as RFC 3339 so clients receive e.g.
/// `"2024-10-01T12:00:00Z"`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, sqlx::FromRow)]
pub struct Message {
    pub id: i64,
    pub body: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A message as it stands after an update.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MessageUpdate {
    pub id: i64,
    pub body: String,
}
