use actix_web::{HttpResponse, web};
use sqlx::SqlitePool;

use crate::api::Page;
use crate::errors::AppError;
use crate::models::{archive, meeting};
use crate::models::archive::{ArchiveFilter, ArchiveView};

/// GET /requirement-review-meetings/archive/vote-results[?meeting_id=]
pub async fn list(
    pool: web::Data<SqlitePool>,
    query: web::Query<ArchiveFilter>,
) -> Result<HttpResponse, AppError> {
    let page = archive::find_paginated(&pool, &query).await?;
    let items = page
        .archives
        .into_iter()
        .map(|a| a.into_view())
        .collect::<Result<Vec<ArchiveView>, _>>()?;
    Ok(HttpResponse::Ok().json(Page::new(
        items,
        page.total_count,
        page.page,
        page.page_size,
    )))
}

/// GET /requirement-review-meetings/archive/vote-results/{id}
pub async fn read(
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let a = archive::find_by_id(&pool, path.into_inner())
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(HttpResponse::Ok().json(a.into_view()?))
}

/// GET /requirement-review-meetings/{id}/archive/vote-results
pub async fn list_for_meeting(
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let meeting_id = path.into_inner();
    // 404s for meetings that never existed; archives of deleted meetings
    // remain reachable through the flat archive listing.
    meeting::get(&pool, meeting_id).await?;
    let archives = archive::find_for_meeting(&pool, meeting_id).await?;
    let views = archives
        .into_iter()
        .map(|a| a.into_view())
        .collect::<Result<Vec<ArchiveView>, _>>()?;
    Ok(HttpResponse::Ok().json(views))
}
