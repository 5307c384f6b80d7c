pub mod archive;
pub mod assignment;
pub mod attendee;
pub mod meeting;
pub mod requirement;
pub mod turn;
pub mod vote;

/// Timestamp format shared with the schema defaults (UTC, second precision).
pub(crate) fn now() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string()
}

pub(crate) fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}
