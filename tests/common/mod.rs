//! Shared test infrastructure for model layer tests.
//!
//! `setup_test_db()` creates a temporary SQLite database with the full
//! schema; the fixture helpers build the standard meeting shape used
//! across the voting tests (moderator 1, attendees 2/3/4, requirement
//! 101 assigned to all three attendees).

// Not every test binary uses every helper.
#![allow(dead_code)]

use sqlx::SqlitePool;
use tempfile::TempDir;

use quorum::db;
use quorum::models::assignment;
use quorum::models::attendee::{self, NewAttendee};
use quorum::models::meeting::{self, Meeting, NewMeeting};
use quorum::models::requirement::{self, MeetingRequirement, NewRequirement};
use quorum::models::vote::{self, Vote, VoteForm};

pub const MODERATOR: i64 = 1;
pub const VOTERS: [i64; 3] = [2, 3, 4];
pub const REQUIREMENT: i64 = 101;

pub struct TestDb {
    _dir: TempDir,
    pool: SqlitePool,
}

impl TestDb {
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Temp-file-backed database so multiple pooled connections share state.
/// The TempDir must stay alive for the pool to remain valid.
pub async fn setup_test_db() -> TestDb {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("test.db");
    let url = format!("sqlite:{}", path.display());

    let pool = db::init_pool(&url).await.expect("init pool");
    db::run_migrations(&pool).await.expect("run migrations");

    TestDb { _dir: dir, pool }
}

/// Create a scheduled meeting with default settings (no vote changes,
/// no anonymity, no required comments).
pub async fn create_meeting(pool: &SqlitePool) -> Meeting {
    create_meeting_with(pool, false, false, false).await
}

pub async fn create_meeting_with(
    pool: &SqlitePool,
    allow_vote_change: bool,
    anonymous_voting: bool,
    require_vote_comment: bool,
) -> Meeting {
    meeting::create(
        pool,
        MODERATOR,
        &NewMeeting {
            meeting_number: None,
            title: "Sprint 12 requirement review".to_string(),
            description: "Review queue for sprint 12".to_string(),
            scheduled_at: "2026-09-01T10:00:00".to_string(),
            allow_vote_change,
            anonymous_voting,
            require_vote_comment,
        },
    )
    .await
    .expect("create meeting")
}

pub async fn add_attendee(pool: &SqlitePool, meeting_id: i64, user_id: i64) {
    attendee::add(
        pool,
        meeting_id,
        MODERATOR,
        &NewAttendee {
            user_id,
            display_name: format!("User {user_id}"),
            attendance_status: None,
        },
    )
    .await
    .expect("add attendee");
}

pub async fn add_requirement(
    pool: &SqlitePool,
    meeting_id: i64,
    requirement_id: i64,
) -> MeetingRequirement {
    requirement::add(
        pool,
        meeting_id,
        MODERATOR,
        &NewRequirement {
            requirement_id,
            review_order: None,
            notes: String::new(),
        },
    )
    .await
    .expect("add requirement")
}

pub async fn assign_voters(pool: &SqlitePool, meeting_id: i64, requirement_id: i64, ids: &[i64]) {
    assignment::replace_voters(pool, meeting_id, requirement_id, ids, MODERATOR)
        .await
        .expect("assign voters");
}

pub async fn cast(
    pool: &SqlitePool,
    meeting_id: i64,
    requirement_id: i64,
    voter_id: i64,
    option: &str,
) -> Vote {
    vote::cast(
        pool,
        meeting_id,
        requirement_id,
        voter_id,
        &VoteForm { vote_option: option.to_string(), comment: None },
    )
    .await
    .expect("cast vote")
}

/// Standard in-progress meeting: moderator 1, attendees 2/3/4, requirement
/// 101 assigned to all three. Returns the started meeting.
pub async fn voting_fixture(pool: &SqlitePool) -> Meeting {
    voting_fixture_with(pool, false, false, false).await
}

pub async fn voting_fixture_with(
    pool: &SqlitePool,
    allow_vote_change: bool,
    anonymous_voting: bool,
    require_vote_comment: bool,
) -> Meeting {
    let m = create_meeting_with(pool, allow_vote_change, anonymous_voting, require_vote_comment)
        .await;
    for voter in VOTERS {
        add_attendee(pool, m.id, voter).await;
    }
    add_requirement(pool, m.id, REQUIREMENT).await;
    assign_voters(pool, m.id, REQUIREMENT, &VOTERS).await;
    meeting::start(pool, m.id, MODERATOR).await.expect("start meeting")
}
