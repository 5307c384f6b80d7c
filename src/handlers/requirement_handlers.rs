use actix_web::{HttpRequest, HttpResponse, web};
use sqlx::SqlitePool;

use crate::api::MutationResponse;
use crate::auth::identity::caller_id;
use crate::errors::AppError;
use crate::models::{meeting, requirement};
use crate::models::requirement::{NewRequirement, RequirementUpdate};

/// GET /requirement-review-meetings/{id}/requirements - the review queue.
pub async fn list(
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let meeting_id = path.into_inner();
    meeting::get(&pool, meeting_id).await?;
    let requirements = requirement::list(&pool, meeting_id).await?;
    Ok(HttpResponse::Ok().json(requirements))
}

/// POST /requirement-review-meetings/{id}/requirements
pub async fn create(
    pool: web::Data<SqlitePool>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<NewRequirement>,
) -> Result<HttpResponse, AppError> {
    let caller = caller_id(&req)?;
    let added = requirement::add(&pool, path.into_inner(), caller, &body).await?;
    Ok(HttpResponse::Created().json(MutationResponse::with_message(added, "Requirement queued")))
}

/// PUT /requirement-review-meetings/{id}/requirements/{reqId}
pub async fn update(
    pool: web::Data<SqlitePool>,
    req: HttpRequest,
    path: web::Path<(i64, i64)>,
    body: web::Json<RequirementUpdate>,
) -> Result<HttpResponse, AppError> {
    let caller = caller_id(&req)?;
    let (meeting_id, requirement_id) = path.into_inner();
    let updated = requirement::update(&pool, meeting_id, requirement_id, caller, &body).await?;
    Ok(HttpResponse::Ok().json(MutationResponse::with_message(updated, "Requirement updated")))
}

/// DELETE /requirement-review-meetings/{id}/requirements/{reqId}
pub async fn delete(
    pool: web::Data<SqlitePool>,
    req: HttpRequest,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse, AppError> {
    let caller = caller_id(&req)?;
    let (meeting_id, requirement_id) = path.into_inner();
    requirement::remove(&pool, meeting_id, requirement_id, caller).await?;
    Ok(HttpResponse::Ok().json(MutationResponse::with_message(
        serde_json::json!({ "requirement_id": requirement_id }),
        "Requirement removed",
    )))
}
