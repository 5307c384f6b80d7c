use sqlx::{SqliteConnection, SqlitePool};

use super::types::*;
use crate::errors::AppError;
use crate::models::vote;

const ARCHIVE_SELECT: &str = "\
SELECT id, meeting_id, requirement_id, final_decision, total_votes, approve_count, \
       reject_count, abstain_count, vote_details, archived_at \
FROM vote_result_archives";

fn final_decision(approve: i64, reject: i64, total: i64) -> &'static str {
    if approve > reject {
        decision::APPROVED
    } else if reject > approve {
        decision::REJECTED
    } else if total > 0 {
        decision::TIED
    } else {
        decision::NO_VOTES
    }
}

/// Snapshot one requirement's outcome. Conflict-ignoring insert: a repeat
/// call is a no-op and can never produce a second, divergent archive.
/// Returns whether a new snapshot was written.
pub async fn archive_requirement_conn(
    conn: &mut SqliteConnection,
    meeting_id: i64,
    requirement_id: i64,
    archived_at: &str,
) -> Result<bool, AppError> {
    let stats = vote::statistics_conn(&mut *conn, meeting_id, requirement_id).await?;
    let votes = vote::list_for_requirement_conn(&mut *conn, meeting_id, requirement_id).await?;

    let details: Vec<ArchivedVote> = votes
        .into_iter()
        .map(|v| ArchivedVote {
            voter_id: v.voter_id,
            vote_option: v.vote_option,
            comment: v.comment,
            auto_generated: v.auto_generated,
        })
        .collect();
    let vote_details = serde_json::to_string(&details)?;

    let res = sqlx::query(
        "INSERT INTO vote_result_archives (meeting_id, requirement_id, final_decision, \
                                           total_votes, approve_count, reject_count, \
                                           abstain_count, vote_details, archived_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT(meeting_id, requirement_id) DO NOTHING",
    )
    .bind(meeting_id)
    .bind(requirement_id)
    .bind(final_decision(stats.approve_count, stats.reject_count, stats.total_votes))
    .bind(stats.total_votes)
    .bind(stats.approve_count)
    .bind(stats.reject_count)
    .bind(stats.abstain_count)
    .bind(&vote_details)
    .bind(archived_at)
    .execute(&mut *conn)
    .await?;

    Ok(res.rows_affected() == 1)
}

/// Archive every requirement of a meeting that has at least one vote or one
/// assignment. Runs inside the end-meeting transaction. Returns the number
/// of snapshots written.
pub async fn archive_meeting_conn(
    conn: &mut SqliteConnection,
    meeting_id: i64,
    archived_at: &str,
) -> Result<i64, AppError> {
    let requirement_ids = sqlx::query_scalar::<_, i64>(
        "SELECT mr.requirement_id FROM meeting_requirements mr \
         WHERE mr.meeting_id = ? \
           AND (EXISTS(SELECT 1 FROM votes v \
                       WHERE v.meeting_id = mr.meeting_id \
                         AND v.requirement_id = mr.requirement_id) \
             OR EXISTS(SELECT 1 FROM voter_assignments a \
                       WHERE a.meeting_id = mr.meeting_id \
                         AND a.requirement_id = mr.requirement_id)) \
         ORDER BY mr.review_order",
    )
    .bind(meeting_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut archived = 0_i64;
    for requirement_id in requirement_ids {
        if archive_requirement_conn(&mut *conn, meeting_id, requirement_id, archived_at).await? {
            archived += 1;
        }
    }
    Ok(archived)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<VoteResultArchive>, AppError> {
    let sql = format!("{ARCHIVE_SELECT} WHERE id = ?");
    let archive = sqlx::query_as::<_, VoteResultArchive>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(archive)
}

pub async fn find_paginated(
    pool: &SqlitePool,
    filter: &ArchiveFilter,
) -> Result<ArchivePage, AppError> {
    let (page, page_size) = crate::api::clamp_paging(filter.page, filter.page_size);
    let offset = (page - 1) * page_size;

    let (where_sql, meeting_bind) = match filter.meeting_id {
        Some(id) => ("meeting_id = ?", Some(id)),
        None => ("1=1", None),
    };

    let count_sql = format!("SELECT COUNT(*) FROM vote_result_archives WHERE {where_sql}");
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    if let Some(id) = meeting_bind {
        count_query = count_query.bind(id);
    }
    let total_count = count_query.fetch_one(pool).await?;

    let data_sql = format!(
        "{ARCHIVE_SELECT} WHERE {where_sql} ORDER BY archived_at DESC, id DESC LIMIT ? OFFSET ?"
    );
    let mut data_query = sqlx::query_as::<_, VoteResultArchive>(&data_sql);
    if let Some(id) = meeting_bind {
        data_query = data_query.bind(id);
    }
    let archives = data_query
        .bind(page_size)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    Ok(ArchivePage { archives, page, page_size, total_count })
}

/// All archives of one meeting, in requirement order.
pub async fn find_for_meeting(
    pool: &SqlitePool,
    meeting_id: i64,
) -> Result<Vec<VoteResultArchive>, AppError> {
    let sql = format!("{ARCHIVE_SELECT} WHERE meeting_id = ? ORDER BY requirement_id");
    let archives = sqlx::query_as::<_, VoteResultArchive>(&sql)
        .bind(meeting_id)
        .fetch_all(pool)
        .await?;
    Ok(archives)
}
