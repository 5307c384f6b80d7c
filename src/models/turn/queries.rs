//! Sequential-voting turn pointer.
//!
//! The "current voter" is not process state: it is re-derived on every read
//! from assignment order, the vote ledger, and per-assignment skip flags.
//! The skip flag is the only persisted bit, because "the moderator skipped
//! an absent voter" cannot be derived from the ledger alone. The pointer is
//! advisory — any assigned voter may cast out of turn.

use sqlx::SqlitePool;

use crate::errors::AppError;
use crate::models::assignment::{self, AssignedVoterRow, VoterStatus};
use crate::models::meeting;

/// Index of the voter whose turn it is: the first assignee (in assignment
/// order) who has neither voted nor been skipped. When every remaining
/// unvoted assignee is skipped, the pointer wraps to the first unvoted one
/// regardless of skips. `None` once everyone has voted (or nobody is
/// assigned).
pub fn current_position(rows: &[AssignedVoterRow]) -> Option<usize> {
    rows.iter()
        .position(|r| !r.has_voted && !r.skipped)
        .or_else(|| rows.iter().position(|r| !r.has_voted))
}

/// Moderator skips the current voter (absent, unreachable). Fails with
/// `AllVotersComplete` when there is nothing left to advance past.
pub async fn move_to_next_voter(
    pool: &SqlitePool,
    meeting_id: i64,
    requirement_id: i64,
    caller_id: i64,
) -> Result<VoterStatus, AppError> {
    let m = meeting::get(pool, meeting_id).await?;
    m.require_moderator(caller_id, "advance the voting turn")?;
    m.require_in_progress()?;

    crate::models::requirement::get(pool, meeting_id, requirement_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let rows = assignment::assigned_rows(pool, meeting_id, requirement_id).await?;
    if rows.is_empty() {
        return Err(AppError::Validation(
            "no voters are assigned to this requirement".into(),
        ));
    }
    let current = match current_position(&rows) {
        Some(i) => i,
        None => return Err(AppError::AllVotersComplete),
    };

    // Wrapped onto an already-skipped voter: clear the round's skip flags
    // first, so repeated skips keep rotating through the unvoted voters
    // instead of sticking on this one.
    if rows[current].skipped {
        sqlx::query(
            "UPDATE voter_assignments SET skipped = 0 \
             WHERE meeting_id = ? AND requirement_id = ?",
        )
        .bind(meeting_id)
        .bind(requirement_id)
        .execute(pool)
        .await?;
    }

    sqlx::query(
        "UPDATE voter_assignments SET skipped = 1 \
         WHERE meeting_id = ? AND requirement_id = ? AND voter_id = ?",
    )
    .bind(meeting_id)
    .bind(requirement_id)
    .bind(rows[current].voter_id)
    .execute(pool)
    .await?;

    log::debug!(
        "Meeting {meeting_id} requirement {requirement_id}: moderator skipped voter {}",
        rows[current].voter_id
    );
    assignment::voter_status(pool, meeting_id, requirement_id, m.anonymous_voting).await
}
