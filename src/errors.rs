use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use std::fmt;

use crate::models::assignment::PendingVoter;
use crate::models::vote::Vote;

/// Every recoverable failure the voting core can report. Each variant maps
/// to one HTTP status and carries enough structured detail for the caller
/// to decide the next action without re-querying (e.g. the pending-voter
/// list, or the vote that already exists).
#[derive(Debug)]
pub enum AppError {
    Db(sqlx::Error),
    Json(serde_json::Error),
    /// Caller identity missing or malformed (X-User-Id header).
    Identity(String),
    Validation(String),
    NotFound,
    /// Caller is not the moderator; payload names the gated action.
    Forbidden(&'static str),
    InvalidState(String),
    /// Duplicate cast with vote changes disallowed; carries the stored vote.
    AlreadyVoted(Vote),
    NotAssignedVoter,
    /// Assignment update would drop voters who already voted.
    CannotUnassignVotedUser(Vec<i64>),
    /// End-meeting without auto-abstain while assigned voters are outstanding.
    PendingVotes(Vec<PendingVoter>),
    AlreadyArchived,
    AllVotersComplete,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Db(e) => write!(f, "Database error: {e}"),
            AppError::Json(e) => write!(f, "JSON error: {e}"),
            AppError::Identity(msg) => write!(f, "Identity error: {msg}"),
            AppError::Validation(msg) => write!(f, "Validation failed: {msg}"),
            AppError::NotFound => write!(f, "Not found"),
            AppError::Forbidden(action) => {
                write!(f, "Only the meeting moderator may {action}")
            }
            AppError::InvalidState(msg) => write!(f, "Invalid meeting state: {msg}"),
            AppError::AlreadyVoted(v) => write!(
                f,
                "Voter {} has already voted on requirement {}",
                v.voter_id, v.requirement_id
            ),
            AppError::NotAssignedVoter => {
                write!(f, "Caller is not an assigned voter for this requirement")
            }
            AppError::CannotUnassignVotedUser(ids) => {
                write!(f, "Cannot unassign voters who have already voted: {ids:?}")
            }
            AppError::PendingVotes(pending) => {
                write!(f, "{} assigned voters have not voted yet", pending.len())
            }
            AppError::AlreadyArchived => write!(f, "Vote results already archived"),
            AppError::AllVotersComplete => write!(f, "All assigned voters have voted"),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Db(_) | AppError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Identity(_) => StatusCode::UNAUTHORIZED,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) | AppError::NotAssignedVoter => StatusCode::FORBIDDEN,
            AppError::InvalidState(_)
            | AppError::AlreadyVoted(_)
            | AppError::CannotUnassignVotedUser(_)
            | AppError::PendingVotes(_)
            | AppError::AlreadyArchived
            | AppError::AllVotersComplete => StatusCode::CONFLICT,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut body = json!({ "error": self.to_string() });

        // Variant-specific detail payloads, per the error contract.
        match self {
            AppError::AlreadyVoted(vote) => {
                body["existing_vote"] = serde_json::to_value(vote).unwrap_or_default();
            }
            AppError::PendingVotes(pending) => {
                body["pending"] = serde_json::to_value(pending).unwrap_or_default();
            }
            AppError::CannotUnassignVotedUser(ids) => {
                body["voted_voter_ids"] = serde_json::to_value(ids).unwrap_or_default();
            }
            AppError::Db(e) => {
                log::error!("Database error: {e}");
                body = json!({ "error": "Internal Server Error" });
            }
            AppError::Json(e) => {
                log::error!("JSON error: {e}");
                body = json!({ "error": "Internal Server Error" });
            }
            _ => {}
        }

        HttpResponse::build(self.status_code()).json(body)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Db(e)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Json(e)
    }
}
