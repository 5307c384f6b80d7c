use sqlx::{SqliteConnection, SqlitePool};

use super::types::*;
use crate::errors::AppError;
use crate::models::{meeting, requirement, turn};

/// Assignment rows joined with the ledger, in assignment order.
pub async fn assigned_rows(
    pool: &SqlitePool,
    meeting_id: i64,
    requirement_id: i64,
) -> Result<Vec<AssignedVoterRow>, AppError> {
    let rows = sqlx::query_as::<_, AssignedVoterRow>(
        "SELECT a.voter_id, \
                COALESCE(att.display_name, '') AS display_name, \
                v.voter_id IS NOT NULL AS has_voted, \
                v.vote_option AS vote_option, \
                v.voted_at AS voted_at, \
                a.skipped AS skipped \
         FROM voter_assignments a \
         LEFT JOIN attendees att \
             ON att.meeting_id = a.meeting_id AND att.user_id = a.voter_id \
         LEFT JOIN votes v \
             ON v.meeting_id = a.meeting_id \
            AND v.requirement_id = a.requirement_id \
            AND v.voter_id = a.voter_id \
         WHERE a.meeting_id = ? AND a.requirement_id = ? \
         ORDER BY a.assign_order, a.id",
    )
    .bind(meeting_id)
    .bind(requirement_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Derived voter status for a requirement: assignment set joined with the
/// ledger, totals, completion and the advisory turn pointer. `anonymous`
/// masks per-voter options (the meeting's `anonymous_voting` flag).
pub async fn voter_status(
    pool: &SqlitePool,
    meeting_id: i64,
    requirement_id: i64,
    anonymous: bool,
) -> Result<VoterStatus, AppError> {
    let rows = assigned_rows(pool, meeting_id, requirement_id).await?;
    Ok(status_from_rows(&rows, anonymous))
}

/// Pure assembly of the derived status; factored out for the turn module.
pub fn status_from_rows(rows: &[AssignedVoterRow], anonymous: bool) -> VoterStatus {
    let total_assigned = rows.len() as i64;
    let total_voted = rows.iter().filter(|r| r.has_voted).count() as i64;
    let is_complete = total_assigned > 0 && total_voted == total_assigned;

    let current = turn::current_position(rows);
    let voters = rows
        .iter()
        .map(|r| VoterState {
            attendee_id: r.voter_id,
            display_name: r.display_name.clone(),
            has_voted: r.has_voted,
            vote_option: if anonymous { None } else { r.vote_option.clone() },
            voted_at: if anonymous { None } else { r.voted_at.clone() },
        })
        .collect();

    VoterStatus {
        assigned_voter_ids: rows.iter().map(|r| r.voter_id).collect(),
        voters,
        total_assigned,
        total_voted,
        is_complete,
        current_voter_index: current.map(|i| i as i64),
        current_voter_id: current.map(|i| rows[i].voter_id),
    }
}

/// Replace the full assigned-voter set for a requirement, atomically.
///
/// Voters who have already voted must remain in the new set; the replacement
/// is a delete-and-insert inside one transaction so concurrent readers never
/// observe a partial set. Skip flags reset with the new ordering.
pub async fn replace_voters(
    pool: &SqlitePool,
    meeting_id: i64,
    requirement_id: i64,
    voter_ids: &[i64],
    caller_id: i64,
) -> Result<VoterStatus, AppError> {
    let m = meeting::get(pool, meeting_id).await?;
    m.require_moderator(caller_id, "assign voters")?;
    if m.status == meeting::status::COMPLETED || m.status == meeting::status::CANCELLED {
        return Err(AppError::InvalidState(format!(
            "voters cannot be assigned on a {} meeting",
            m.status
        )));
    }
    requirement::get(pool, meeting_id, requirement_id)
        .await?
        .ok_or(AppError::NotFound)?;

    // Dedup while keeping the moderator's ordering.
    let mut ids: Vec<i64> = Vec::with_capacity(voter_ids.len());
    for &id in voter_ids {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }

    let attendee_ids = sqlx::query_scalar::<_, i64>(
        "SELECT user_id FROM attendees WHERE meeting_id = ?",
    )
    .bind(meeting_id)
    .fetch_all(pool)
    .await?;
    let outsiders: Vec<i64> = ids
        .iter()
        .copied()
        .filter(|id| !attendee_ids.contains(id))
        .collect();
    if !outsiders.is_empty() {
        return Err(AppError::Validation(format!(
            "voter ids are not attendees of this meeting: {outsiders:?}"
        )));
    }

    let mut tx = pool.begin().await?;

    let voted_ids = sqlx::query_scalar::<_, i64>(
        "SELECT voter_id FROM votes WHERE meeting_id = ? AND requirement_id = ?",
    )
    .bind(meeting_id)
    .bind(requirement_id)
    .fetch_all(&mut *tx)
    .await?;
    let dropped: Vec<i64> = voted_ids
        .iter()
        .copied()
        .filter(|id| !ids.contains(id))
        .collect();
    if !dropped.is_empty() {
        return Err(AppError::CannotUnassignVotedUser(dropped));
    }

    sqlx::query("DELETE FROM voter_assignments WHERE meeting_id = ? AND requirement_id = ?")
        .bind(meeting_id)
        .bind(requirement_id)
        .execute(&mut *tx)
        .await?;
    for (order, voter_id) in ids.iter().enumerate() {
        sqlx::query(
            "INSERT INTO voter_assignments (meeting_id, requirement_id, voter_id, assign_order) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(meeting_id)
        .bind(requirement_id)
        .bind(voter_id)
        .bind(order as i64)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    log::info!(
        "Meeting {meeting_id} requirement {requirement_id}: voter set replaced \
         ({} voters) by moderator {caller_id}",
        ids.len()
    );
    voter_status(pool, meeting_id, requirement_id, m.anonymous_voting).await
}

/// Assigned-but-unvoted pairs across the whole meeting, in review order.
/// Drives the end-meeting confirmation flow.
pub async fn pending_voters(
    pool: &SqlitePool,
    meeting_id: i64,
) -> Result<Vec<PendingVoter>, AppError> {
    let mut conn = pool.acquire().await?;
    pending_voters_conn(&mut conn, meeting_id).await
}

/// Connection-level variant so `end()` can run the same query inside its
/// transaction.
pub async fn pending_voters_conn(
    conn: &mut SqliteConnection,
    meeting_id: i64,
) -> Result<Vec<PendingVoter>, AppError> {
    let pending = sqlx::query_as::<_, PendingVoter>(
        "SELECT a.requirement_id, \
                COALESCE(mr.review_order, 0) AS review_order, \
                a.voter_id, \
                COALESCE(att.display_name, '') AS display_name \
         FROM voter_assignments a \
         JOIN meeting_requirements mr \
             ON mr.meeting_id = a.meeting_id AND mr.requirement_id = a.requirement_id \
         LEFT JOIN attendees att \
             ON att.meeting_id = a.meeting_id AND att.user_id = a.voter_id \
         LEFT JOIN votes v \
             ON v.meeting_id = a.meeting_id \
            AND v.requirement_id = a.requirement_id \
            AND v.voter_id = a.voter_id \
         WHERE a.meeting_id = ? AND v.voter_id IS NULL \
         ORDER BY mr.review_order, a.assign_order",
    )
    .bind(meeting_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(pending)
}

pub async fn assigned_count(
    pool: &SqlitePool,
    meeting_id: i64,
    requirement_id: i64,
) -> Result<i64, AppError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM voter_assignments WHERE meeting_id = ? AND requirement_id = ?",
    )
    .bind(meeting_id)
    .bind(requirement_id)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

pub async fn is_assigned(
    pool: &SqlitePool,
    meeting_id: i64,
    requirement_id: i64,
    voter_id: i64,
) -> Result<bool, AppError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM voter_assignments \
         WHERE meeting_id = ? AND requirement_id = ? AND voter_id = ?)",
    )
    .bind(meeting_id)
    .bind(requirement_id)
    .bind(voter_id)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}
