use sqlx::SqlitePool;

use super::types::*;
use crate::errors::AppError;
use crate::models::meeting::{self, status};

const REQUIREMENT_SELECT: &str = "\
SELECT id, meeting_id, requirement_id, review_order, notes \
FROM meeting_requirements";

/// Queue a requirement for review. `review_order` defaults to the end of
/// the queue; an explicit duplicate order is rejected.
pub async fn add(
    pool: &SqlitePool,
    meeting_id: i64,
    caller_id: i64,
    new: &NewRequirement,
) -> Result<MeetingRequirement, AppError> {
    let m = meeting::get(pool, meeting_id).await?;
    m.require_moderator(caller_id, "manage the requirement queue")?;
    if m.status == status::COMPLETED {
        return Err(AppError::InvalidState(
            "requirements cannot be changed on a completed meeting".into(),
        ));
    }

    let mut tx = pool.begin().await?;
    let review_order = match new.review_order {
        Some(order) => order,
        None => {
            sqlx::query_scalar::<_, i64>(
                "SELECT COALESCE(MAX(review_order), 0) + 1 FROM meeting_requirements \
                 WHERE meeting_id = ?",
            )
            .bind(meeting_id)
            .fetch_one(&mut *tx)
            .await?
        }
    };

    let res = sqlx::query(
        "INSERT INTO meeting_requirements (meeting_id, requirement_id, review_order, notes) \
         VALUES (?, ?, ?, ?)",
    )
    .bind(meeting_id)
    .bind(new.requirement_id)
    .bind(review_order)
    .bind(&new.notes)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        if crate::models::is_unique_violation(&e) {
            AppError::Validation(format!(
                "requirement {} is already queued, or review_order {review_order} is taken",
                new.requirement_id
            ))
        } else {
            AppError::Db(e)
        }
    })?;
    let id = res.last_insert_rowid();
    tx.commit().await?;

    let sql = format!("{REQUIREMENT_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, MeetingRequirement>(&sql)
        .bind(id)
        .fetch_one(pool)
        .await?;
    Ok(row)
}

pub async fn update(
    pool: &SqlitePool,
    meeting_id: i64,
    requirement_id: i64,
    caller_id: i64,
    changes: &RequirementUpdate,
) -> Result<MeetingRequirement, AppError> {
    let m = meeting::get(pool, meeting_id).await?;
    m.require_moderator(caller_id, "manage the requirement queue")?;
    if m.status == status::COMPLETED {
        return Err(AppError::InvalidState(
            "requirements cannot be changed on a completed meeting".into(),
        ));
    }
    let existing = get(pool, meeting_id, requirement_id)
        .await?
        .ok_or(AppError::NotFound)?;

    sqlx::query(
        "UPDATE meeting_requirements SET \
             review_order = COALESCE(?, review_order), \
             notes = COALESCE(?, notes) \
         WHERE id = ?",
    )
    .bind(changes.review_order)
    .bind(changes.notes.as_deref())
    .bind(existing.id)
    .execute(pool)
    .await
    .map_err(|e| {
        if crate::models::is_unique_violation(&e) {
            AppError::Validation("review_order is already taken in this meeting".into())
        } else {
            AppError::Db(e)
        }
    })?;

    get(pool, meeting_id, requirement_id)
        .await?
        .ok_or(AppError::NotFound)
}

/// Unqueue a requirement. Blocked once votes exist for it: votes are never
/// deleted, so the link they hang off must stay.
pub async fn remove(
    pool: &SqlitePool,
    meeting_id: i64,
    requirement_id: i64,
    caller_id: i64,
) -> Result<(), AppError> {
    let m = meeting::get(pool, meeting_id).await?;
    m.require_moderator(caller_id, "manage the requirement queue")?;
    if m.status == status::COMPLETED {
        return Err(AppError::InvalidState(
            "requirements cannot be changed on a completed meeting".into(),
        ));
    }
    let existing = get(pool, meeting_id, requirement_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let has_votes = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM votes WHERE meeting_id = ? AND requirement_id = ?)",
    )
    .bind(meeting_id)
    .bind(requirement_id)
    .fetch_one(pool)
    .await?;
    if has_votes {
        return Err(AppError::InvalidState(
            "requirement has recorded votes and cannot be removed".into(),
        ));
    }

    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM voter_assignments WHERE meeting_id = ? AND requirement_id = ?")
        .bind(meeting_id)
        .bind(requirement_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM meeting_requirements WHERE id = ?")
        .bind(existing.id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}

/// Review queue in order.
pub async fn list(
    pool: &SqlitePool,
    meeting_id: i64,
) -> Result<Vec<MeetingRequirement>, AppError> {
    let sql = format!("{REQUIREMENT_SELECT} WHERE meeting_id = ? ORDER BY review_order");
    let rows = sqlx::query_as::<_, MeetingRequirement>(&sql)
        .bind(meeting_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn get(
    pool: &SqlitePool,
    meeting_id: i64,
    requirement_id: i64,
) -> Result<Option<MeetingRequirement>, AppError> {
    let sql = format!("{REQUIREMENT_SELECT} WHERE meeting_id = ? AND requirement_id = ?");
    let row = sqlx::query_as::<_, MeetingRequirement>(&sql)
        .bind(meeting_id)
        .bind(requirement_id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}
