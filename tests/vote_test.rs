//! Vote ledger tests: exactly-once casting, vote changes, eligibility
//! gating and the derived tally.

mod common;

use common::*;
use quorum::errors::AppError;
use quorum::models::{archive, meeting, vote};
use quorum::models::vote::VoteForm;

#[tokio::test]
async fn test_cast_records_vote() {
    let db = setup_test_db().await;
    let pool = db.pool();
    let m = voting_fixture(pool).await;

    let v = vote::cast(
        pool,
        m.id,
        REQUIREMENT,
        2,
        &VoteForm { vote_option: "approve".into(), comment: Some("Looks solid".into()) },
    )
    .await
    .unwrap();

    assert_eq!(v.voter_id, 2);
    assert_eq!(v.vote_option, "approve");
    assert_eq!(v.comment.as_deref(), Some("Looks solid"));
    assert!(!v.auto_generated);
}

#[tokio::test]
async fn test_duplicate_cast_returns_stored_vote_unchanged() {
    let db = setup_test_db().await;
    let pool = db.pool();
    let m = voting_fixture(pool).await;

    cast(pool, m.id, REQUIREMENT, 2, "approve").await;

    let err = vote::cast(
        pool,
        m.id,
        REQUIREMENT,
        2,
        &VoteForm { vote_option: "reject".into(), comment: None },
    )
    .await
    .unwrap_err();

    // The error carries the stored vote, never the rejected submission.
    match err {
        AppError::AlreadyVoted(existing) => assert_eq!(existing.vote_option, "approve"),
        other => panic!("expected AlreadyVoted, got {other:?}"),
    }
    let stored = vote::get(pool, m.id, REQUIREMENT, 2).await.unwrap().unwrap();
    assert_eq!(stored.vote_option, "approve");
}

#[tokio::test]
async fn test_concurrent_duplicate_casts_record_exactly_one_vote() {
    let db = setup_test_db().await;
    let pool = db.pool();
    let m = voting_fixture(pool).await;

    let form = VoteForm { vote_option: "approve".into(), comment: None };
    let (a, b, c) = tokio::join!(
        vote::cast(pool, m.id, REQUIREMENT, 2, &form),
        vote::cast(pool, m.id, REQUIREMENT, 2, &form),
        vote::cast(pool, m.id, REQUIREMENT, 2, &form),
    );

    let successes = [&a, &b, &c].iter().filter(|r| r.is_ok()).count();
    assert!(successes >= 1, "at least one cast must win: {a:?} {b:?} {c:?}");
    for res in [a, b, c] {
        if let Err(e) = res {
            assert!(matches!(e, AppError::AlreadyVoted(_)), "got {e:?}");
        }
    }

    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM votes WHERE meeting_id = ? AND requirement_id = ? AND voter_id = 2",
    )
    .bind(m.id)
    .bind(REQUIREMENT)
    .fetch_one(pool)
    .await
    .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_vote_change_when_meeting_allows_it() {
    let db = setup_test_db().await;
    let pool = db.pool();
    let m = voting_fixture_with(pool, true, false, false).await;

    cast(pool, m.id, REQUIREMENT, 2, "approve").await;
    let changed = vote::cast(
        pool,
        m.id,
        REQUIREMENT,
        2,
        &VoteForm { vote_option: "reject".into(), comment: Some("Changed my mind".into()) },
    )
    .await
    .unwrap();
    assert_eq!(changed.vote_option, "reject");

    // Still one row per voter; a change updates in place.
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM votes WHERE meeting_id = ? AND requirement_id = ? AND voter_id = 2",
    )
    .bind(m.id)
    .bind(REQUIREMENT)
    .fetch_one(pool)
    .await
    .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_unassigned_attendee_cannot_vote() {
    let db = setup_test_db().await;
    let pool = db.pool();
    let m = voting_fixture(pool).await;
    add_attendee(pool, m.id, 5).await;

    let err = vote::cast(
        pool,
        m.id,
        REQUIREMENT,
        5,
        &VoteForm { vote_option: "approve".into(), comment: None },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotAssignedVoter), "got {err:?}");
}

#[tokio::test]
async fn test_open_voting_when_no_voters_assigned() {
    let db = setup_test_db().await;
    let pool = db.pool();

    let m = create_meeting(pool).await;
    add_attendee(pool, m.id, 2).await;
    add_requirement(pool, m.id, REQUIREMENT).await;
    meeting::start(pool, m.id, MODERATOR).await.unwrap();

    // No assignment set: any attendee may vote.
    let v = cast(pool, m.id, REQUIREMENT, 2, "approve").await;
    assert_eq!(v.voter_id, 2);

    // Non-attendees are still shut out.
    let err = vote::cast(
        pool,
        m.id,
        REQUIREMENT,
        77,
        &VoteForm { vote_option: "approve".into(), comment: None },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotAssignedVoter), "got {err:?}");
}

#[tokio::test]
async fn test_vote_requires_in_progress_meeting() {
    let db = setup_test_db().await;
    let pool = db.pool();

    let m = create_meeting(pool).await;
    add_attendee(pool, m.id, 2).await;
    add_requirement(pool, m.id, REQUIREMENT).await;
    assign_voters(pool, m.id, REQUIREMENT, &[2]).await;

    let err = vote::cast(
        pool,
        m.id,
        REQUIREMENT,
        2,
        &VoteForm { vote_option: "approve".into(), comment: None },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)), "got {err:?}");
}

#[tokio::test]
async fn test_vote_rejects_unknown_option() {
    let db = setup_test_db().await;
    let pool = db.pool();
    let m = voting_fixture(pool).await;

    let err = vote::cast(
        pool,
        m.id,
        REQUIREMENT,
        2,
        &VoteForm { vote_option: "maybe".into(), comment: None },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "got {err:?}");
}

#[tokio::test]
async fn test_required_comment_is_enforced() {
    let db = setup_test_db().await;
    let pool = db.pool();
    let m = voting_fixture_with(pool, false, false, true).await;

    let err = vote::cast(
        pool,
        m.id,
        REQUIREMENT,
        2,
        &VoteForm { vote_option: "approve".into(), comment: Some("   ".into()) },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "got {err:?}");

    let v = vote::cast(
        pool,
        m.id,
        REQUIREMENT,
        2,
        &VoteForm { vote_option: "approve".into(), comment: Some("meets NFR-12".into()) },
    )
    .await
    .unwrap();
    assert_eq!(v.voter_id, 2);
}

#[tokio::test]
async fn test_vote_on_unknown_requirement_is_not_found() {
    let db = setup_test_db().await;
    let pool = db.pool();
    let m = voting_fixture(pool).await;

    let err = vote::cast(
        pool,
        m.id,
        999,
        2,
        &VoteForm { vote_option: "approve".into(), comment: None },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound), "got {err:?}");
}

#[tokio::test]
async fn test_my_vote_absent_before_casting() {
    let db = setup_test_db().await;
    let pool = db.pool();
    let m = voting_fixture(pool).await;

    assert!(vote::get(pool, m.id, REQUIREMENT, 2).await.unwrap().is_none());
    cast(pool, m.id, REQUIREMENT, 2, "abstain").await;
    let v = vote::get(pool, m.id, REQUIREMENT, 2).await.unwrap().unwrap();
    assert_eq!(v.vote_option, "abstain");
}

#[tokio::test]
async fn test_statistics_tally_and_percentages() {
    let db = setup_test_db().await;
    let pool = db.pool();
    let m = voting_fixture(pool).await;

    cast(pool, m.id, REQUIREMENT, 2, "approve").await;
    cast(pool, m.id, REQUIREMENT, 3, "approve").await;
    cast(pool, m.id, REQUIREMENT, 4, "reject").await;

    let stats = vote::statistics(pool, m.id, REQUIREMENT).await.unwrap();
    assert_eq!(stats.total_votes, 3);
    assert_eq!(stats.approve_count, 2);
    assert_eq!(stats.reject_count, 1);
    assert_eq!(stats.abstain_count, 0);
    assert_eq!(stats.approve_percentage, 66.7);
    assert_eq!(stats.reject_percentage, 33.3);
    assert_eq!(stats.completion_percentage, 100.0);
}

#[tokio::test]
async fn test_statistics_empty_ledger_is_all_zero() {
    let db = setup_test_db().await;
    let pool = db.pool();
    let m = voting_fixture(pool).await;

    let stats = vote::statistics(pool, m.id, REQUIREMENT).await.unwrap();
    assert_eq!(stats.total_votes, 0);
    assert_eq!(stats.approve_percentage, 0.0);
    assert_eq!(stats.completion_percentage, 0.0);
}

#[tokio::test]
async fn test_cast_racing_meeting_end_keeps_ledger_and_archive_consistent() {
    let db = setup_test_db().await;
    let pool = db.pool();

    // Open voting: with no assignment rows there is no auto-abstain row to
    // occupy the unique slot, so a cast landing after end() would be the
    // only thing standing between the ledger and the archive snapshot.
    let m = create_meeting(pool).await;
    for voter in VOTERS {
        add_attendee(pool, m.id, voter).await;
    }
    add_requirement(pool, m.id, REQUIREMENT).await;
    meeting::start(pool, m.id, MODERATOR).await.unwrap();

    let casts = async {
        let mut results = Vec::new();
        for voter in [2, 3, 4, 2, 3] {
            results.push(
                vote::cast(
                    pool,
                    m.id,
                    REQUIREMENT,
                    voter,
                    &VoteForm { vote_option: "approve".into(), comment: None },
                )
                .await,
            );
        }
        results
    };
    let (results, ended) = tokio::join!(casts, meeting::end(pool, m.id, MODERATOR, true));
    ended.unwrap();

    for r in results {
        assert!(
            matches!(
                r,
                Ok(_) | Err(AppError::AlreadyVoted(_)) | Err(AppError::InvalidState(_))
            ),
            "got {r:?}"
        );
    }

    // Whatever the interleaving, the completed meeting's snapshot must
    // agree with the ledger: no vote may land after the archive is taken.
    let ledger: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM votes WHERE meeting_id = ? AND requirement_id = ?",
    )
    .bind(m.id)
    .bind(REQUIREMENT)
    .fetch_one(pool)
    .await
    .unwrap();

    let archives = archive::find_for_meeting(pool, m.id).await.unwrap();
    match archives.first() {
        Some(a) => assert_eq!(a.total_votes, ledger),
        None => assert_eq!(ledger, 0),
    }
}

#[tokio::test]
async fn test_vote_change_blocked_once_meeting_completes() {
    let db = setup_test_db().await;
    let pool = db.pool();
    let m = voting_fixture_with(pool, true, false, false).await;

    cast(pool, m.id, REQUIREMENT, 2, "approve").await;
    meeting::end(pool, m.id, MODERATOR, true).await.unwrap();

    let err = vote::cast(
        pool,
        m.id,
        REQUIREMENT,
        2,
        &VoteForm { vote_option: "reject".into(), comment: None },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)), "got {err:?}");

    let stored = vote::get(pool, m.id, REQUIREMENT, 2).await.unwrap().unwrap();
    assert_eq!(stored.vote_option, "approve");
}

#[tokio::test]
async fn test_statistics_partial_completion() {
    let db = setup_test_db().await;
    let pool = db.pool();
    let m = voting_fixture(pool).await;

    cast(pool, m.id, REQUIREMENT, 2, "abstain").await;

    let stats = vote::statistics(pool, m.id, REQUIREMENT).await.unwrap();
    assert_eq!(stats.total_votes, 1);
    assert_eq!(stats.abstain_count, 1);
    assert_eq!(stats.abstain_percentage, 100.0);
    assert_eq!(stats.completion_percentage, 33.3);
}
