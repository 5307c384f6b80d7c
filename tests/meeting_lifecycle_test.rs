//! Lifecycle state machine tests: role gating, transition guards,
//! deletion rules and list filters.

mod common;

use common::*;
use quorum::errors::AppError;
use quorum::models::meeting::{self, MeetingFilter, MeetingUpdate, status};

#[tokio::test]
async fn test_create_generates_meeting_number() {
    let db = setup_test_db().await;
    let pool = db.pool();

    let m = create_meeting(pool).await;
    assert_eq!(m.status, status::SCHEDULED);
    assert_eq!(m.moderator_id, MODERATOR);
    assert!(m.meeting_number.starts_with("RRM-"), "got {}", m.meeting_number);
    assert!(m.started_at.is_none());
    assert!(m.ended_at.is_none());
}

#[tokio::test]
async fn test_create_keeps_provided_meeting_number() {
    let db = setup_test_db().await;
    let pool = db.pool();

    let m = meeting::create(
        pool,
        MODERATOR,
        &quorum::models::meeting::NewMeeting {
            meeting_number: Some("IPD-2026-007".to_string()),
            title: "Numbered review".to_string(),
            description: String::new(),
            scheduled_at: "2026-09-02T09:00:00".to_string(),
            allow_vote_change: false,
            anonymous_voting: false,
            require_vote_comment: false,
        },
    )
    .await
    .expect("create");
    assert_eq!(m.meeting_number, "IPD-2026-007");
}

#[tokio::test]
async fn test_start_requires_moderator() {
    let db = setup_test_db().await;
    let pool = db.pool();

    let m = create_meeting(pool).await;
    let err = meeting::start(pool, m.id, 99).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)), "got {err:?}");

    // The failed attempt must not have moved the state machine.
    let unchanged = meeting::get(pool, m.id).await.unwrap();
    assert_eq!(unchanged.status, status::SCHEDULED);
}

#[tokio::test]
async fn test_start_sets_started_at_and_status() {
    let db = setup_test_db().await;
    let pool = db.pool();

    let m = create_meeting(pool).await;
    let started = meeting::start(pool, m.id, MODERATOR).await.unwrap();
    assert_eq!(started.status, status::IN_PROGRESS);
    assert!(started.started_at.is_some());
}

#[tokio::test]
async fn test_start_twice_is_invalid_state() {
    let db = setup_test_db().await;
    let pool = db.pool();

    let m = create_meeting(pool).await;
    meeting::start(pool, m.id, MODERATOR).await.unwrap();
    let err = meeting::start(pool, m.id, MODERATOR).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)), "got {err:?}");
}

#[tokio::test]
async fn test_cancel_only_from_scheduled() {
    let db = setup_test_db().await;
    let pool = db.pool();

    let m = create_meeting(pool).await;
    let cancelled = meeting::cancel(pool, m.id, MODERATOR).await.unwrap();
    assert_eq!(cancelled.status, status::CANCELLED);

    // Terminal: no transition out of cancelled.
    let err = meeting::start(pool, m.id, MODERATOR).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)), "got {err:?}");

    let m2 = create_meeting_with(pool, false, false, false).await;
    meeting::start(pool, m2.id, MODERATOR).await.unwrap();
    let err = meeting::cancel(pool, m2.id, MODERATOR).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)), "got {err:?}");
}

#[tokio::test]
async fn test_end_requires_moderator_and_in_progress() {
    let db = setup_test_db().await;
    let pool = db.pool();

    let m = create_meeting(pool).await;
    // Not started yet.
    let err = meeting::end(pool, m.id, MODERATOR, false).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)), "got {err:?}");

    meeting::start(pool, m.id, MODERATOR).await.unwrap();
    let err = meeting::end(pool, m.id, 99, false).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)), "got {err:?}");
}

#[tokio::test]
async fn test_end_without_pending_votes_completes() {
    let db = setup_test_db().await;
    let pool = db.pool();

    let m = create_meeting(pool).await;
    meeting::start(pool, m.id, MODERATOR).await.unwrap();

    let summary = meeting::end(pool, m.id, MODERATOR, false).await.unwrap();
    assert_eq!(summary.meeting.status, status::COMPLETED);
    assert!(summary.meeting.ended_at.is_some());
    assert_eq!(summary.auto_abstained, 0);
}

#[tokio::test]
async fn test_delete_blocked_while_in_progress() {
    let db = setup_test_db().await;
    let pool = db.pool();

    let m = create_meeting(pool).await;
    meeting::start(pool, m.id, MODERATOR).await.unwrap();
    let err = meeting::delete(pool, m.id, MODERATOR).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)), "got {err:?}");
}

#[tokio::test]
async fn test_delete_cascades_to_dependents() {
    let db = setup_test_db().await;
    let pool = db.pool();

    let m = voting_fixture(pool).await;
    cast(pool, m.id, REQUIREMENT, 2, "approve").await;
    meeting::end(pool, m.id, MODERATOR, true).await.unwrap();

    meeting::delete(pool, m.id, MODERATOR).await.unwrap();

    assert!(meeting::find_by_id(pool, m.id).await.unwrap().is_none());
    let votes: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM votes WHERE meeting_id = ?")
            .bind(m.id)
            .fetch_one(pool)
            .await
            .unwrap();
    assert_eq!(votes, 0);
    let attendees: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM attendees WHERE meeting_id = ?")
            .bind(m.id)
            .fetch_one(pool)
            .await
            .unwrap();
    assert_eq!(attendees, 0);
}

#[tokio::test]
async fn test_update_blocked_on_terminal_meeting() {
    let db = setup_test_db().await;
    let pool = db.pool();

    let m = create_meeting(pool).await;
    meeting::cancel(pool, m.id, MODERATOR).await.unwrap();

    let err = meeting::update(
        pool,
        m.id,
        MODERATOR,
        &MeetingUpdate { title: Some("New title".into()), ..Default::default() },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)), "got {err:?}");
}

#[tokio::test]
async fn test_update_changes_settings() {
    let db = setup_test_db().await;
    let pool = db.pool();

    let m = create_meeting(pool).await;
    let updated = meeting::update(
        pool,
        m.id,
        MODERATOR,
        &MeetingUpdate {
            allow_vote_change: Some(true),
            description: Some("Amended agenda".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert!(updated.allow_vote_change);
    assert_eq!(updated.description, "Amended agenda");
    // Untouched fields survive a partial update.
    assert_eq!(updated.title, m.title);
}

#[tokio::test]
async fn test_list_filters_by_status() {
    let db = setup_test_db().await;
    let pool = db.pool();

    let a = create_meeting(pool).await;
    let _b = create_meeting(pool).await;
    meeting::start(pool, a.id, MODERATOR).await.unwrap();

    let page = meeting::find_paginated(
        pool,
        &MeetingFilter { status: Some("in_progress".into()), ..Default::default() },
    )
    .await
    .unwrap();
    assert_eq!(page.total_count, 1);
    assert_eq!(page.meetings[0].id, a.id);
}

#[tokio::test]
async fn test_list_pagination() {
    let db = setup_test_db().await;
    let pool = db.pool();

    for _ in 0..5 {
        create_meeting(pool).await;
    }

    let page = meeting::find_paginated(
        pool,
        &MeetingFilter { page: Some(2), page_size: Some(2), ..Default::default() },
    )
    .await
    .unwrap();
    assert_eq!(page.total_count, 5);
    assert_eq!(page.meetings.len(), 2);
    assert_eq!(page.page, 2);
}

#[tokio::test]
async fn test_list_with_huge_page_returns_empty_page() {
    let db = setup_test_db().await;
    let pool = db.pool();

    create_meeting(pool).await;

    let page = meeting::find_paginated(
        pool,
        &MeetingFilter {
            page: Some(i64::MAX),
            page_size: Some(i64::MAX),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(page.total_count, 1);
    assert!(page.meetings.is_empty());
}

#[tokio::test]
async fn test_list_date_filter_upcoming_and_past() {
    let db = setup_test_db().await;
    let pool = db.pool();

    // Fixture meetings are scheduled in 2026-09; past cutoff is "now".
    create_meeting(pool).await;

    let upcoming = meeting::find_paginated(
        pool,
        &MeetingFilter { date_filter: Some("upcoming".into()), ..Default::default() },
    )
    .await
    .unwrap();
    let past = meeting::find_paginated(
        pool,
        &MeetingFilter { date_filter: Some("past".into()), ..Default::default() },
    )
    .await
    .unwrap();
    assert_eq!(upcoming.total_count + past.total_count, 1);

    let err = meeting::find_paginated(
        pool,
        &MeetingFilter { date_filter: Some("sometime".into()), ..Default::default() },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "got {err:?}");
}
