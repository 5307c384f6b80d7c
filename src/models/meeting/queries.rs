use sqlx::{SqliteConnection, SqlitePool};

use super::types::*;
use crate::errors::AppError;
use crate::models::{archive, assignment, now};

const MEETING_SELECT: &str = "\
SELECT id, meeting_number, title, description, scheduled_at, started_at, ended_at, \
       moderator_id, status, allow_vote_change, anonymous_voting, require_vote_comment, \
       created_at, updated_at \
FROM meetings";

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Meeting>, AppError> {
    let sql = format!("{MEETING_SELECT} WHERE id = ?");
    let meeting = sqlx::query_as::<_, Meeting>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(meeting)
}

/// Find a meeting or fail with `NotFound`. Entry point for every
/// meeting-scoped operation.
pub async fn get(pool: &SqlitePool, id: i64) -> Result<Meeting, AppError> {
    find_by_id(pool, id).await?.ok_or(AppError::NotFound)
}

/// Create a meeting in `scheduled` state; the caller becomes moderator.
///
/// When no meeting number is supplied one is derived from the row id
/// (`RRM-0042`), which is unique by construction.
pub async fn create(
    pool: &SqlitePool,
    moderator_id: i64,
    new: &NewMeeting,
) -> Result<Meeting, AppError> {
    if new.title.trim().is_empty() {
        return Err(AppError::Validation("title must not be empty".into()));
    }
    if new.scheduled_at.trim().is_empty() {
        return Err(AppError::Validation("scheduled_at must not be empty".into()));
    }

    let ts = now();
    let provided_number = new
        .meeting_number
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());

    let mut tx = pool.begin().await?;

    // Placeholder avoids a UNIQUE clash with real numbers and with other
    // placeholders in flight; it is rewritten to the final form before
    // commit. Nanosecond precision because creates can land in the same
    // second.
    let placeholder = format!(
        "pending-{}-{moderator_id}",
        chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
    );
    let insert = sqlx::query(
        "INSERT INTO meetings (meeting_number, title, description, scheduled_at, moderator_id, \
                               status, allow_vote_change, anonymous_voting, require_vote_comment, \
                               created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, 'scheduled', ?, ?, ?, ?, ?)",
    )
    .bind(provided_number.map(str::to_string).unwrap_or(placeholder))
    .bind(new.title.trim())
    .bind(&new.description)
    .bind(new.scheduled_at.trim())
    .bind(moderator_id)
    .bind(new.allow_vote_change)
    .bind(new.anonymous_voting)
    .bind(new.require_vote_comment)
    .bind(&ts)
    .bind(&ts)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        if crate::models::is_unique_violation(&e) {
            AppError::Validation("meeting_number is already in use".into())
        } else {
            AppError::Db(e)
        }
    })?;

    let id = insert.last_insert_rowid();
    if provided_number.is_none() {
        sqlx::query("UPDATE meetings SET meeting_number = ? WHERE id = ?")
            .bind(format!("RRM-{id:04}"))
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    log::info!("Created meeting {id} (moderator {moderator_id})");
    get(pool, id).await
}

/// Paginated meeting list with status and date filters.
pub async fn find_paginated(
    pool: &SqlitePool,
    filter: &MeetingFilter,
) -> Result<MeetingPage, AppError> {
    let (page, page_size) = crate::api::clamp_paging(filter.page, filter.page_size);
    let offset = (page - 1) * page_size;

    let mut where_sql = String::from("1=1");
    let mut binds: Vec<String> = Vec::new();

    if let Some(status) = filter.status.as_deref().filter(|s| !s.is_empty()) {
        where_sql.push_str(" AND status = ?");
        binds.push(status.to_string());
    }
    match filter.date_filter.as_deref() {
        Some("upcoming") => {
            where_sql.push_str(" AND scheduled_at >= ?");
            binds.push(now());
        }
        Some("past") => {
            where_sql.push_str(" AND scheduled_at < ?");
            binds.push(now());
        }
        Some("today") => {
            where_sql.push_str(" AND DATE(scheduled_at) = DATE(?)");
            binds.push(now());
        }
        Some(other) if !other.is_empty() => {
            return Err(AppError::Validation(format!(
                "unknown date_filter '{other}' (expected upcoming, past or today)"
            )));
        }
        _ => {}
    }

    let count_sql = format!("SELECT COUNT(*) FROM meetings WHERE {where_sql}");
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    for b in &binds {
        count_query = count_query.bind(b);
    }
    let total_count = count_query.fetch_one(pool).await?;

    let data_sql = format!(
        "{MEETING_SELECT} WHERE {where_sql} ORDER BY scheduled_at DESC, id DESC LIMIT ? OFFSET ?"
    );
    let mut data_query = sqlx::query_as::<_, Meeting>(&data_sql);
    for b in &binds {
        data_query = data_query.bind(b);
    }
    let meetings = data_query
        .bind(page_size)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    Ok(MeetingPage { meetings, page, page_size, total_count })
}

/// Partial metadata/settings update. Moderator-only; blocked once terminal.
pub async fn update(
    pool: &SqlitePool,
    id: i64,
    caller_id: i64,
    changes: &MeetingUpdate,
) -> Result<Meeting, AppError> {
    let meeting = get(pool, id).await?;
    meeting.require_moderator(caller_id, "update the meeting")?;
    if status::is_terminal(&meeting.status) {
        return Err(AppError::InvalidState(format!(
            "meeting is {} and can no longer be updated",
            meeting.status
        )));
    }
    if let Some(title) = &changes.title {
        if title.trim().is_empty() {
            return Err(AppError::Validation("title must not be empty".into()));
        }
    }

    sqlx::query(
        "UPDATE meetings SET \
             title = COALESCE(?, title), \
             description = COALESCE(?, description), \
             scheduled_at = COALESCE(?, scheduled_at), \
             allow_vote_change = COALESCE(?, allow_vote_change), \
             anonymous_voting = COALESCE(?, anonymous_voting), \
             require_vote_comment = COALESCE(?, require_vote_comment), \
             updated_at = ? \
         WHERE id = ?",
    )
    .bind(changes.title.as_deref().map(str::trim))
    .bind(changes.description.as_deref())
    .bind(changes.scheduled_at.as_deref())
    .bind(changes.allow_vote_change)
    .bind(changes.anonymous_voting)
    .bind(changes.require_vote_comment)
    .bind(now())
    .bind(id)
    .execute(pool)
    .await?;

    get(pool, id).await
}

/// scheduled -> in_progress. The guarded UPDATE (`WHERE status = ...`)
/// makes a lost start/start race surface as `InvalidState`.
pub async fn start(pool: &SqlitePool, id: i64, caller_id: i64) -> Result<Meeting, AppError> {
    let meeting = get(pool, id).await?;
    meeting.require_moderator(caller_id, "start the meeting")?;
    if meeting.status != status::SCHEDULED {
        return Err(AppError::InvalidState(format!(
            "cannot start a meeting that is {}",
            meeting.status
        )));
    }

    let ts = now();
    let res = sqlx::query(
        "UPDATE meetings SET status = 'in_progress', started_at = ?, updated_at = ? \
         WHERE id = ? AND status = 'scheduled'",
    )
    .bind(&ts)
    .bind(&ts)
    .bind(id)
    .execute(pool)
    .await?;
    if res.rows_affected() == 0 {
        return Err(AppError::InvalidState("meeting is no longer scheduled".into()));
    }

    log::info!("Meeting {id} started by moderator {caller_id}");
    get(pool, id).await
}

/// scheduled -> cancelled. Terminal; a started meeting cannot be cancelled,
/// only ended.
pub async fn cancel(pool: &SqlitePool, id: i64, caller_id: i64) -> Result<Meeting, AppError> {
    let meeting = get(pool, id).await?;
    meeting.require_moderator(caller_id, "cancel the meeting")?;
    if meeting.status != status::SCHEDULED {
        return Err(AppError::InvalidState(format!(
            "cannot cancel a meeting that is {}",
            meeting.status
        )));
    }

    let res = sqlx::query(
        "UPDATE meetings SET status = 'cancelled', updated_at = ? \
         WHERE id = ? AND status = 'scheduled'",
    )
    .bind(now())
    .bind(id)
    .execute(pool)
    .await?;
    if res.rows_affected() == 0 {
        return Err(AppError::InvalidState("meeting is no longer scheduled".into()));
    }

    log::info!("Meeting {id} cancelled by moderator {caller_id}");
    get(pool, id).await
}

/// in_progress -> completed, with pending-vote reconciliation.
///
/// Without `auto_abstain`, outstanding assigned voters abort the call via
/// `PendingVotes`. With it, a single transaction inserts a synthetic
/// abstain for every pending pair, flips the status, and archives every
/// requirement. The synthetic inserts go through the same UNIQUE guard as
/// castVote, so a real vote that lands in the race window wins and the
/// synthetic insert degrades to a no-op.
pub async fn end(
    pool: &SqlitePool,
    id: i64,
    caller_id: i64,
    auto_abstain: bool,
) -> Result<MeetingEndSummary, AppError> {
    let meeting = get(pool, id).await?;
    meeting.require_moderator(caller_id, "end the meeting")?;
    meeting.require_in_progress()?;

    let ts = now();
    let mut tx = pool.begin().await?;

    let pending = assignment::pending_voters_conn(&mut tx, id).await?;
    if !pending.is_empty() && !auto_abstain {
        return Err(AppError::PendingVotes(pending));
    }

    let mut auto_abstained = 0_i64;
    for p in &pending {
        auto_abstained += insert_auto_abstain(&mut tx, id, p.requirement_id, p.voter_id, &ts).await?;
    }

    let res = sqlx::query(
        "UPDATE meetings SET status = 'completed', ended_at = ?, updated_at = ? \
         WHERE id = ? AND status = 'in_progress'",
    )
    .bind(&ts)
    .bind(&ts)
    .bind(id)
    .execute(&mut *tx)
    .await?;
    if res.rows_affected() == 0 {
        return Err(AppError::InvalidState("meeting is no longer in progress".into()));
    }

    let archived_requirements = archive::archive_meeting_conn(&mut tx, id, &ts).await?;
    tx.commit().await?;

    log::info!(
        "Meeting {id} ended by moderator {caller_id}: {auto_abstained} auto-abstained, \
         {archived_requirements} requirements archived"
    );
    let meeting = get(pool, id).await?;
    Ok(MeetingEndSummary { meeting, auto_abstained, archived_requirements })
}

/// Synthetic abstain for a pending voter. Returns 1 if inserted, 0 if a
/// real vote won the race.
async fn insert_auto_abstain(
    conn: &mut SqliteConnection,
    meeting_id: i64,
    requirement_id: i64,
    voter_id: i64,
    ts: &str,
) -> Result<i64, AppError> {
    let res = sqlx::query(
        "INSERT INTO votes (meeting_id, requirement_id, voter_id, vote_option, comment, \
                            auto_generated, voted_at) \
         VALUES (?, ?, ?, 'abstain', NULL, 1, ?) \
         ON CONFLICT(meeting_id, requirement_id, voter_id) DO NOTHING",
    )
    .bind(meeting_id)
    .bind(requirement_id)
    .bind(voter_id)
    .bind(ts)
    .execute(&mut *conn)
    .await?;
    Ok(res.rows_affected() as i64)
}

/// Delete a meeting and its dependent rows (attendees, requirements,
/// assignments, votes cascade via FK). Blocked while in progress; archives
/// are kept.
pub async fn delete(pool: &SqlitePool, id: i64, caller_id: i64) -> Result<(), AppError> {
    let meeting = get(pool, id).await?;
    meeting.require_moderator(caller_id, "delete the meeting")?;
    if meeting.status == status::IN_PROGRESS {
        return Err(AppError::InvalidState(
            "an in-progress meeting cannot be deleted".into(),
        ));
    }

    sqlx::query("DELETE FROM meetings WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    log::info!("Meeting {id} deleted by moderator {caller_id}");
    Ok(())
}
