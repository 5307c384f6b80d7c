use serde::{Deserialize, Serialize};

pub mod option {
    pub const APPROVE: &str = "approve";
    pub const REJECT: &str = "reject";
    pub const ABSTAIN: &str = "abstain";

    pub fn is_valid(s: &str) -> bool {
        s == APPROVE || s == REJECT || s == ABSTAIN
    }
}

/// One row in the vote ledger. The (meeting_id, requirement_id, voter_id)
/// triple is unique; rows are never deleted. `auto_generated` marks the
/// synthetic abstains inserted by forced meeting end.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Vote {
    pub id: i64,
    pub meeting_id: i64,
    pub requirement_id: i64,
    pub voter_id: i64,
    pub vote_option: String,
    pub comment: Option<String>,
    pub auto_generated: bool,
    pub voted_at: String,
}

/// POST body for casting a vote.
#[derive(Debug, Clone, Deserialize)]
pub struct VoteForm {
    pub vote_option: String,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Tally derived from the ledger on every read. Percentages are rounded to
/// one decimal; all zero when no votes exist (never NaN).
#[derive(Debug, Clone, Serialize)]
pub struct VoteStatistics {
    pub total_votes: i64,
    pub approve_count: i64,
    pub reject_count: i64,
    pub abstain_count: i64,
    pub approve_percentage: f64,
    pub reject_percentage: f64,
    pub abstain_percentage: f64,
    pub completion_percentage: f64,
}
