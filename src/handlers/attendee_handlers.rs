use actix_web::{HttpRequest, HttpResponse, web};
use sqlx::SqlitePool;

use crate::api::MutationResponse;
use crate::auth::identity::caller_id;
use crate::errors::AppError;
use crate::models::{attendee, meeting};
use crate::models::attendee::NewAttendee;

/// GET /requirement-review-meetings/{id}/attendees
pub async fn list(
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let meeting_id = path.into_inner();
    meeting::get(&pool, meeting_id).await?;
    let attendees = attendee::list(&pool, meeting_id).await?;
    Ok(HttpResponse::Ok().json(attendees))
}

/// POST /requirement-review-meetings/{id}/attendees
pub async fn create(
    pool: web::Data<SqlitePool>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<NewAttendee>,
) -> Result<HttpResponse, AppError> {
    let caller = caller_id(&req)?;
    let added = attendee::add(&pool, path.into_inner(), caller, &body).await?;
    Ok(HttpResponse::Created().json(MutationResponse::with_message(added, "Attendee added")))
}

/// DELETE /requirement-review-meetings/{id}/attendees/{attendeeId}
pub async fn delete(
    pool: web::Data<SqlitePool>,
    req: HttpRequest,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse, AppError> {
    let caller = caller_id(&req)?;
    let (meeting_id, attendee_id) = path.into_inner();
    attendee::remove(&pool, meeting_id, attendee_id, caller).await?;
    Ok(HttpResponse::Ok().json(MutationResponse::with_message(
        serde_json::json!({ "id": attendee_id }),
        "Attendee removed",
    )))
}
