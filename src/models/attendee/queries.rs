use sqlx::SqlitePool;

use super::types::*;
use crate::errors::AppError;
use crate::models::meeting::{self, status};

const ATTENDANCE_STATUSES: &[&str] = &["invited", "present", "absent"];

/// Add an attendee to a meeting. Moderator-only; allowed at setup and while
/// the meeting runs, blocked once terminal.
pub async fn add(
    pool: &SqlitePool,
    meeting_id: i64,
    caller_id: i64,
    new: &NewAttendee,
) -> Result<Attendee, AppError> {
    let m = meeting::get(pool, meeting_id).await?;
    m.require_moderator(caller_id, "manage attendees")?;
    if status::is_terminal(&m.status) {
        return Err(AppError::InvalidState(format!(
            "attendees cannot be changed on a {} meeting",
            m.status
        )));
    }
    let attendance_status = new.attendance_status.as_deref().unwrap_or("invited");
    if !ATTENDANCE_STATUSES.contains(&attendance_status) {
        return Err(AppError::Validation(format!(
            "unknown attendance_status '{attendance_status}'"
        )));
    }

    let res = sqlx::query(
        "INSERT INTO attendees (meeting_id, user_id, display_name, attendance_status) \
         VALUES (?, ?, ?, ?)",
    )
    .bind(meeting_id)
    .bind(new.user_id)
    .bind(&new.display_name)
    .bind(attendance_status)
    .execute(pool)
    .await
    .map_err(|e| {
        if crate::models::is_unique_violation(&e) {
            AppError::Validation(format!(
                "user {} is already an attendee of meeting {meeting_id}",
                new.user_id
            ))
        } else {
            AppError::Db(e)
        }
    })?;

    let attendee = sqlx::query_as::<_, Attendee>(
        "SELECT id, meeting_id, user_id, display_name, attendance_status \
         FROM attendees WHERE id = ?",
    )
    .bind(res.last_insert_rowid())
    .fetch_one(pool)
    .await?;
    Ok(attendee)
}

/// Remove an attendee. Rejected when the attendee has already voted in the
/// meeting: votes are never deleted, so their voter id must stay resolvable.
pub async fn remove(
    pool: &SqlitePool,
    meeting_id: i64,
    attendee_id: i64,
    caller_id: i64,
) -> Result<(), AppError> {
    let m = meeting::get(pool, meeting_id).await?;
    m.require_moderator(caller_id, "manage attendees")?;
    if status::is_terminal(&m.status) {
        return Err(AppError::InvalidState(format!(
            "attendees cannot be changed on a {} meeting",
            m.status
        )));
    }

    let attendee = sqlx::query_as::<_, Attendee>(
        "SELECT id, meeting_id, user_id, display_name, attendance_status \
         FROM attendees WHERE id = ? AND meeting_id = ?",
    )
    .bind(attendee_id)
    .bind(meeting_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound)?;

    let has_voted = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM votes WHERE meeting_id = ? AND voter_id = ?)",
    )
    .bind(meeting_id)
    .bind(attendee.user_id)
    .fetch_one(pool)
    .await?;
    if has_voted {
        return Err(AppError::CannotUnassignVotedUser(vec![attendee.user_id]));
    }

    // Their assignments go with them; they have no votes to orphan.
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM voter_assignments WHERE meeting_id = ? AND voter_id = ?")
        .bind(meeting_id)
        .bind(attendee.user_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM attendees WHERE id = ?")
        .bind(attendee_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}

pub async fn list(pool: &SqlitePool, meeting_id: i64) -> Result<Vec<Attendee>, AppError> {
    let attendees = sqlx::query_as::<_, Attendee>(
        "SELECT id, meeting_id, user_id, display_name, attendance_status \
         FROM attendees WHERE meeting_id = ? ORDER BY id",
    )
    .bind(meeting_id)
    .fetch_all(pool)
    .await?;
    Ok(attendees)
}

/// Membership check used by open-voting mode.
pub async fn is_attendee(
    pool: &SqlitePool,
    meeting_id: i64,
    user_id: i64,
) -> Result<bool, AppError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM attendees WHERE meeting_id = ? AND user_id = ?)",
    )
    .bind(meeting_id)
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}
