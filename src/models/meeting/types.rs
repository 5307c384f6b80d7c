use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Meeting lifecycle states. `completed` and `cancelled` are terminal.
pub mod status {
    pub const SCHEDULED: &str = "scheduled";
    pub const IN_PROGRESS: &str = "in_progress";
    pub const COMPLETED: &str = "completed";
    pub const CANCELLED: &str = "cancelled";

    pub fn is_terminal(s: &str) -> bool {
        s == COMPLETED || s == CANCELLED
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Meeting {
    pub id: i64,
    pub meeting_number: String,
    pub title: String,
    pub description: String,
    pub scheduled_at: String,
    pub started_at: Option<String>,
    pub ended_at: Option<String>,
    pub moderator_id: i64,
    pub status: String,
    pub allow_vote_change: bool,
    pub anonymous_voting: bool,
    pub require_vote_comment: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Meeting {
    /// Single authorization predicate for moderator-gated actions.
    /// `action` is the human-readable verb used in the Forbidden payload.
    pub fn require_moderator(&self, caller_id: i64, action: &'static str) -> Result<(), AppError> {
        if self.moderator_id == caller_id {
            Ok(())
        } else {
            Err(AppError::Forbidden(action))
        }
    }

    pub fn require_in_progress(&self) -> Result<(), AppError> {
        if self.status == status::IN_PROGRESS {
            Ok(())
        } else {
            Err(AppError::InvalidState(format!(
                "meeting is {}, not in_progress",
                self.status
            )))
        }
    }
}

/// Create-meeting request body. The caller becomes the moderator.
#[derive(Debug, Clone, Deserialize)]
pub struct NewMeeting {
    #[serde(default)]
    pub meeting_number: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub scheduled_at: String,
    #[serde(default)]
    pub allow_vote_change: bool,
    #[serde(default)]
    pub anonymous_voting: bool,
    #[serde(default)]
    pub require_vote_comment: bool,
}

/// Partial update; absent fields are left unchanged. Status is never set
/// here — lifecycle transitions own it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MeetingUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub scheduled_at: Option<String>,
    pub allow_vote_change: Option<bool>,
    pub anonymous_voting: Option<bool>,
    pub require_vote_comment: Option<bool>,
}

/// List query params: `?status=`, `?date_filter=upcoming|past|today`,
/// plus pagination.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MeetingFilter {
    pub status: Option<String>,
    pub date_filter: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct MeetingPage {
    pub meetings: Vec<Meeting>,
    pub page: i64,
    pub page_size: i64,
    pub total_count: i64,
}

/// Outcome of `end()`: the completed meeting plus reconciliation counters.
#[derive(Debug, Clone, Serialize)]
pub struct MeetingEndSummary {
    pub meeting: Meeting,
    pub auto_abstained: i64,
    pub archived_requirements: i64,
}
