use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Attendee {
    pub id: i64,
    pub meeting_id: i64,
    pub user_id: i64,
    pub display_name: String,
    pub attendance_status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAttendee {
    pub user_id: i64,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub attendance_status: Option<String>,
}
