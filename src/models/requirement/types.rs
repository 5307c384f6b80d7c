use serde::{Deserialize, Serialize};

/// A requirement queued for review in a meeting. `requirement_id` points
/// into the external requirements store; this subsystem only needs the link
/// and its position in the review queue.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MeetingRequirement {
    pub id: i64,
    pub meeting_id: i64,
    pub requirement_id: i64,
    pub review_order: i64,
    pub notes: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewRequirement {
    pub requirement_id: i64,
    #[serde(default)]
    pub review_order: Option<i64>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequirementUpdate {
    pub review_order: Option<i64>,
    pub notes: Option<String>,
}
