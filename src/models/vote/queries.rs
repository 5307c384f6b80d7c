use sqlx::{SqliteConnection, SqlitePool};

use super::types::*;
use crate::errors::AppError;
use crate::models::{assignment, attendee, meeting, now, requirement};

const VOTE_SELECT: &str = "\
SELECT id, meeting_id, requirement_id, voter_id, vote_option, comment, auto_generated, voted_at \
FROM votes";

/// Cast (or, when the meeting allows it, change) a vote.
///
/// Exactly-once semantics ride on the ledger's UNIQUE constraint: the
/// insert is conflict-ignoring, so of N concurrent duplicate submissions
/// exactly one creates a row and the rest fall through to the
/// already-voted path, which returns the stored vote — never the submitted
/// one — in the `AlreadyVoted` error.
///
/// The in_progress check is re-evaluated inside the INSERT and UPDATE
/// statements themselves: once a concurrent `end()` commits the completed
/// flip, both write zero rows, so no vote can land after the archive
/// snapshot is taken.
pub async fn cast(
    pool: &SqlitePool,
    meeting_id: i64,
    requirement_id: i64,
    voter_id: i64,
    form: &VoteForm,
) -> Result<Vote, AppError> {
    let m = meeting::get(pool, meeting_id).await?;
    m.require_in_progress()?;
    requirement::get(pool, meeting_id, requirement_id)
        .await?
        .ok_or(AppError::NotFound)?;

    if !option::is_valid(&form.vote_option) {
        return Err(AppError::Validation(format!(
            "unknown vote_option '{}' (expected approve, reject or abstain)",
            form.vote_option
        )));
    }
    if m.require_vote_comment
        && form.comment.as_deref().map(str::trim).unwrap_or("").is_empty()
    {
        return Err(AppError::Validation(
            "this meeting requires a comment with every vote".into(),
        ));
    }

    // Assigned set gates voting; an empty set means open voting, where any
    // attendee may cast.
    let assigned = assignment::assigned_count(pool, meeting_id, requirement_id).await?;
    let authorized = if assigned > 0 {
        assignment::is_assigned(pool, meeting_id, requirement_id, voter_id).await?
    } else {
        attendee::is_attendee(pool, meeting_id, voter_id).await?
    };
    if !authorized {
        return Err(AppError::NotAssignedVoter);
    }

    let res = sqlx::query(
        "INSERT INTO votes (meeting_id, requirement_id, voter_id, vote_option, comment, \
                            auto_generated, voted_at) \
         SELECT ?, ?, ?, ?, ?, 0, ? \
         WHERE (SELECT status FROM meetings WHERE id = ?) = 'in_progress' \
         ON CONFLICT(meeting_id, requirement_id, voter_id) DO NOTHING",
    )
    .bind(meeting_id)
    .bind(requirement_id)
    .bind(voter_id)
    .bind(&form.vote_option)
    .bind(form.comment.as_deref())
    .bind(now())
    .bind(meeting_id)
    .execute(pool)
    .await?;

    if res.rows_affected() == 1 {
        log::debug!(
            "Vote recorded: meeting {meeting_id}, requirement {requirement_id}, voter {voter_id}"
        );
        return get(pool, meeting_id, requirement_id, voter_id)
            .await?
            .ok_or(AppError::NotFound);
    }

    // Zero rows: either this voter already has a row, or the meeting left
    // in_progress under us. Votes are never deleted, so the fetch decides.
    let existing = match get(pool, meeting_id, requirement_id, voter_id).await? {
        Some(v) => v,
        None => {
            return Err(AppError::InvalidState(
                "meeting is no longer in progress".into(),
            ));
        }
    };

    if !m.allow_vote_change {
        return Err(AppError::AlreadyVoted(existing));
    }

    let res = sqlx::query(
        "UPDATE votes SET vote_option = ?, comment = ?, auto_generated = 0, voted_at = ? \
         WHERE meeting_id = ? AND requirement_id = ? AND voter_id = ? \
           AND (SELECT status FROM meetings WHERE id = ?) = 'in_progress'",
    )
    .bind(&form.vote_option)
    .bind(form.comment.as_deref())
    .bind(now())
    .bind(meeting_id)
    .bind(requirement_id)
    .bind(voter_id)
    .bind(meeting_id)
    .execute(pool)
    .await?;
    if res.rows_affected() == 0 {
        return Err(AppError::InvalidState(
            "meeting is no longer in progress".into(),
        ));
    }

    log::debug!(
        "Vote changed: meeting {meeting_id}, requirement {requirement_id}, voter {voter_id}"
    );
    get(pool, meeting_id, requirement_id, voter_id)
        .await?
        .ok_or(AppError::NotFound)
}

/// A voter's stored vote, if any. Absence is distinct from an abstain row.
pub async fn get(
    pool: &SqlitePool,
    meeting_id: i64,
    requirement_id: i64,
    voter_id: i64,
) -> Result<Option<Vote>, AppError> {
    let sql = format!("{VOTE_SELECT} WHERE meeting_id = ? AND requirement_id = ? AND voter_id = ?");
    let vote = sqlx::query_as::<_, Vote>(&sql)
        .bind(meeting_id)
        .bind(requirement_id)
        .bind(voter_id)
        .fetch_optional(pool)
        .await?;
    Ok(vote)
}

/// All votes for a requirement, oldest first. Feeds the archive snapshot.
pub async fn list_for_requirement_conn(
    conn: &mut SqliteConnection,
    meeting_id: i64,
    requirement_id: i64,
) -> Result<Vec<Vote>, AppError> {
    let sql = format!(
        "{VOTE_SELECT} WHERE meeting_id = ? AND requirement_id = ? ORDER BY voted_at, id"
    );
    let votes = sqlx::query_as::<_, Vote>(&sql)
        .bind(meeting_id)
        .bind(requirement_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(votes)
}

pub async fn statistics(
    pool: &SqlitePool,
    meeting_id: i64,
    requirement_id: i64,
) -> Result<VoteStatistics, AppError> {
    let mut conn = pool.acquire().await?;
    statistics_conn(&mut conn, meeting_id, requirement_id).await
}

/// Scan-and-count tally straight off the ledger. Connection-level so the
/// archival snapshot can run it inside the end-meeting transaction.
pub async fn statistics_conn(
    conn: &mut SqliteConnection,
    meeting_id: i64,
    requirement_id: i64,
) -> Result<VoteStatistics, AppError> {
    let (total_votes, approve_count, reject_count, abstain_count) =
        sqlx::query_as::<_, (i64, i64, i64, i64)>(
            "SELECT COUNT(*), \
                    COALESCE(SUM(vote_option = 'approve'), 0), \
                    COALESCE(SUM(vote_option = 'reject'), 0), \
                    COALESCE(SUM(vote_option = 'abstain'), 0) \
             FROM votes WHERE meeting_id = ? AND requirement_id = ?",
        )
        .bind(meeting_id)
        .bind(requirement_id)
        .fetch_one(&mut *conn)
        .await?;

    let total_assigned = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM voter_assignments WHERE meeting_id = ? AND requirement_id = ?",
    )
    .bind(meeting_id)
    .bind(requirement_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(VoteStatistics {
        total_votes,
        approve_count,
        reject_count,
        abstain_count,
        approve_percentage: percent(approve_count, total_votes),
        reject_percentage: percent(reject_count, total_votes),
        abstain_percentage: percent(abstain_count, total_votes),
        completion_percentage: percent(total_votes, total_assigned),
    })
}

/// Share of `part` in `whole` as a percentage rounded to one decimal.
/// Zero denominator yields 0.0, not NaN.
fn percent(part: i64, whole: i64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        (part as f64 * 1000.0 / whole as f64).round() / 10.0
    }
}
