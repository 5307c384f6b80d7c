use actix_web::{HttpRequest, HttpResponse, web};
use sqlx::SqlitePool;

use crate::api::MutationResponse;
use crate::auth::identity::caller_id;
use crate::errors::AppError;
use crate::models::{assignment, meeting, requirement, turn, vote};
use crate::models::assignment::VoterPatch;
use crate::models::vote::VoteForm;

/// POST /requirement-review-meetings/{id}/requirements/{reqId}/vote
pub async fn cast(
    pool: web::Data<SqlitePool>,
    req: HttpRequest,
    path: web::Path<(i64, i64)>,
    body: web::Json<VoteForm>,
) -> Result<HttpResponse, AppError> {
    let caller = caller_id(&req)?;
    let (meeting_id, requirement_id) = path.into_inner();
    let recorded = vote::cast(&pool, meeting_id, requirement_id, caller, &body).await?;
    Ok(HttpResponse::Ok().json(MutationResponse::with_message(recorded, "Vote recorded")))
}

/// GET /requirement-review-meetings/{id}/requirements/{reqId}/my-vote
///
/// 404 when the caller has not voted — distinct from an abstain vote.
pub async fn my_vote(
    pool: web::Data<SqlitePool>,
    req: HttpRequest,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse, AppError> {
    let caller = caller_id(&req)?;
    let (meeting_id, requirement_id) = path.into_inner();
    let v = vote::get(&pool, meeting_id, requirement_id, caller)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(HttpResponse::Ok().json(v))
}

/// GET /requirement-review-meetings/{id}/requirements/{reqId}/votes - tally.
pub async fn statistics(
    pool: web::Data<SqlitePool>,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse, AppError> {
    let (meeting_id, requirement_id) = path.into_inner();
    meeting::get(&pool, meeting_id).await?;
    requirement::get(&pool, meeting_id, requirement_id)
        .await?
        .ok_or(AppError::NotFound)?;
    let stats = vote::statistics(&pool, meeting_id, requirement_id).await?;
    Ok(HttpResponse::Ok().json(stats))
}

/// GET /requirement-review-meetings/{id}/requirements/{reqId}/voters
pub async fn voter_status(
    pool: web::Data<SqlitePool>,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse, AppError> {
    let (meeting_id, requirement_id) = path.into_inner();
    let m = meeting::get(&pool, meeting_id).await?;
    requirement::get(&pool, meeting_id, requirement_id)
        .await?
        .ok_or(AppError::NotFound)?;
    let status =
        assignment::voter_status(&pool, meeting_id, requirement_id, m.anonymous_voting).await?;
    Ok(HttpResponse::Ok().json(status))
}

/// PATCH /requirement-review-meetings/{id}/requirements/{reqId}/voters
pub async fn update_voters(
    pool: web::Data<SqlitePool>,
    req: HttpRequest,
    path: web::Path<(i64, i64)>,
    body: web::Json<VoterPatch>,
) -> Result<HttpResponse, AppError> {
    let caller = caller_id(&req)?;
    let (meeting_id, requirement_id) = path.into_inner();
    let status = assignment::replace_voters(
        &pool,
        meeting_id,
        requirement_id,
        &body.assigned_voter_ids,
        caller,
    )
    .await?;
    Ok(HttpResponse::Ok().json(MutationResponse::with_message(status, "Voters updated")))
}

/// POST /requirement-review-meetings/{id}/requirements/{reqId}/next-voter
pub async fn next_voter(
    pool: web::Data<SqlitePool>,
    req: HttpRequest,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse, AppError> {
    let caller = caller_id(&req)?;
    let (meeting_id, requirement_id) = path.into_inner();
    let status = turn::move_to_next_voter(&pool, meeting_id, requirement_id, caller).await?;
    Ok(HttpResponse::Ok().json(MutationResponse::with_message(status, "Moved to next voter")))
}
