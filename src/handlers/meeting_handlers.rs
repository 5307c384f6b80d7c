use actix_web::{HttpRequest, HttpResponse, web};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::api::{MutationResponse, Page};
use crate::auth::identity::caller_id;
use crate::errors::AppError;
use crate::models::{assignment, meeting};
use crate::models::meeting::{MeetingFilter, MeetingUpdate, NewMeeting};

/// GET /requirement-review-meetings - paginated list with status/date filters.
pub async fn list(
    pool: web::Data<SqlitePool>,
    query: web::Query<MeetingFilter>,
) -> Result<HttpResponse, AppError> {
    let page = meeting::find_paginated(&pool, &query).await?;
    Ok(HttpResponse::Ok().json(Page::new(
        page.meetings,
        page.total_count,
        page.page,
        page.page_size,
    )))
}

/// POST /requirement-review-meetings - create; the caller becomes moderator.
pub async fn create(
    pool: web::Data<SqlitePool>,
    req: HttpRequest,
    body: web::Json<NewMeeting>,
) -> Result<HttpResponse, AppError> {
    let caller = caller_id(&req)?;
    let created = meeting::create(&pool, caller, &body).await?;
    Ok(HttpResponse::Created().json(MutationResponse::with_message(created, "Meeting created")))
}

/// GET /requirement-review-meetings/{id}
pub async fn read(
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let m = meeting::get(&pool, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(m))
}

/// PUT /requirement-review-meetings/{id}
pub async fn update(
    pool: web::Data<SqlitePool>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<MeetingUpdate>,
) -> Result<HttpResponse, AppError> {
    let caller = caller_id(&req)?;
    let updated = meeting::update(&pool, path.into_inner(), caller, &body).await?;
    Ok(HttpResponse::Ok().json(MutationResponse::with_message(updated, "Meeting updated")))
}

/// DELETE /requirement-review-meetings/{id}
pub async fn delete(
    pool: web::Data<SqlitePool>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let caller = caller_id(&req)?;
    let id = path.into_inner();
    meeting::delete(&pool, id, caller).await?;
    Ok(HttpResponse::Ok().json(MutationResponse::with_message(
        serde_json::json!({ "id": id }),
        "Meeting deleted",
    )))
}

/// POST /requirement-review-meetings/{id}/start
pub async fn start(
    pool: web::Data<SqlitePool>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let caller = caller_id(&req)?;
    let m = meeting::start(&pool, path.into_inner(), caller).await?;
    Ok(HttpResponse::Ok().json(MutationResponse::with_message(m, "Meeting started")))
}

/// POST /requirement-review-meetings/{id}/cancel
pub async fn cancel(
    pool: web::Data<SqlitePool>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let caller = caller_id(&req)?;
    let m = meeting::cancel(&pool, path.into_inner(), caller).await?;
    Ok(HttpResponse::Ok().json(MutationResponse::with_message(m, "Meeting cancelled")))
}

/// POST /requirement-review-meetings/{id}/end body.
///
/// `autoAbstain` is what the reference clients send; the snake_case alias
/// keeps the body consistent with the rest of the API.
#[derive(Debug, Default, Deserialize)]
pub struct EndForm {
    #[serde(default, alias = "autoAbstain")]
    pub auto_abstain: bool,
}

/// POST /requirement-review-meetings/{id}/end
///
/// Fails with 409 PendingVotes (carrying the pending pairs) unless
/// `auto_abstain` is set; the caller re-invokes with the flag to force
/// completion.
pub async fn end(
    pool: web::Data<SqlitePool>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: Option<web::Json<EndForm>>,
) -> Result<HttpResponse, AppError> {
    let caller = caller_id(&req)?;
    let auto_abstain = body.map(|b| b.auto_abstain).unwrap_or(false);
    let summary = meeting::end(&pool, path.into_inner(), caller, auto_abstain).await?;
    Ok(HttpResponse::Ok().json(MutationResponse::with_message(summary, "Meeting ended")))
}

/// GET /requirement-review-meetings/{id}/pending-voters
pub async fn pending_voters(
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let meeting_id = path.into_inner();
    meeting::get(&pool, meeting_id).await?;
    let pending = assignment::pending_voters(&pool, meeting_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "total_pending": pending.len(),
        "pending": pending,
    })))
}
