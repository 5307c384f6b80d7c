use serde::{Deserialize, Serialize};

/// Raw assignment row joined with the vote ledger, in assignment order.
/// Everything derived (status, tally completion, turn pointer) is computed
/// from a fresh fetch of these rows — there is no stored counter to drift.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AssignedVoterRow {
    pub voter_id: i64,
    pub display_name: String,
    pub has_voted: bool,
    pub vote_option: Option<String>,
    pub voted_at: Option<String>,
    pub skipped: bool,
}

/// Per-voter view in the voter-status read. With anonymous voting the
/// option and timestamp are masked; `has_voted` always shows.
#[derive(Debug, Clone, Serialize)]
pub struct VoterState {
    pub attendee_id: i64,
    pub display_name: String,
    pub has_voted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vote_option: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voted_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VoterStatus {
    pub assigned_voter_ids: Vec<i64>,
    pub voters: Vec<VoterState>,
    pub total_assigned: i64,
    pub total_voted: i64,
    pub is_complete: bool,
    /// Advisory turn pointer (index into `voters`); never an authorization
    /// gate — any assigned voter may cast out of turn.
    pub current_voter_index: Option<i64>,
    pub current_voter_id: Option<i64>,
}

/// One outstanding (requirement, voter) pair, as reported to the
/// end-meeting confirmation flow.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PendingVoter {
    pub requirement_id: i64,
    pub review_order: i64,
    pub voter_id: i64,
    pub display_name: String,
}

/// PATCH body for replacing the assigned-voter set.
#[derive(Debug, Clone, Deserialize)]
pub struct VoterPatch {
    pub assigned_voter_ids: Vec<i64>,
}
