use serde::{Deserialize, Serialize};

use crate::errors::AppError;

pub mod decision {
    pub const APPROVED: &str = "approved";
    pub const REJECTED: &str = "rejected";
    pub const TIED: &str = "tied";
    pub const NO_VOTES: &str = "no_votes";
}

/// Immutable snapshot row. `vote_details` holds the itemized vote list as a
/// JSON array; the source votes may keep living their read-only life, but
/// this row never changes once written.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VoteResultArchive {
    pub id: i64,
    pub meeting_id: i64,
    pub requirement_id: i64,
    pub final_decision: String,
    pub total_votes: i64,
    pub approve_count: i64,
    pub reject_count: i64,
    pub abstain_count: i64,
    pub vote_details: String,
    pub archived_at: String,
}

/// One itemized vote inside the snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchivedVote {
    pub voter_id: i64,
    pub vote_option: String,
    pub comment: Option<String>,
    pub auto_generated: bool,
}

/// API view of an archive with `vote_details` parsed out of the column.
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveView {
    pub id: i64,
    pub meeting_id: i64,
    pub requirement_id: i64,
    pub final_decision: String,
    pub total_votes: i64,
    pub approve_count: i64,
    pub reject_count: i64,
    pub abstain_count: i64,
    pub vote_details: Vec<ArchivedVote>,
    pub archived_at: String,
}

impl VoteResultArchive {
    pub fn into_view(self) -> Result<ArchiveView, AppError> {
        let vote_details: Vec<ArchivedVote> = serde_json::from_str(&self.vote_details)?;
        Ok(ArchiveView {
            id: self.id,
            meeting_id: self.meeting_id,
            requirement_id: self.requirement_id,
            final_decision: self.final_decision,
            total_votes: self.total_votes,
            approve_count: self.approve_count,
            reject_count: self.reject_count,
            abstain_count: self.abstain_count,
            vote_details,
            archived_at: self.archived_at,
        })
    }
}

/// List query params for the archive endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArchiveFilter {
    pub meeting_id: Option<i64>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct ArchivePage {
    pub archives: Vec<VoteResultArchive>,
    pub page: i64,
    pub page_size: i64,
    pub total_count: i64,
}
