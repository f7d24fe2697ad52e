use serde::{Deserialize, Serialize};

pub const EVENT_CHANGED: &str = "event_changed";
pub const MEMBER_JOINED: &str = "member_joined";
pub const EVENT_ANNOUNCEMENT: &str = "event_announcement";

/// Published when an organizer moves an event in time or space
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct EventChangedMessage {
    pub event_type: String,
    pub event_id: String,
    pub event_name: String,
    pub old_start_date: Option<String>,
    pub new_start_date: Option<String>,
    #[serde(default)]
    pub old_end_date: Option<String>,
    #[serde(default)]
    pub new_end_date: Option<String>,
    pub old_location_name: Option<String>,
    pub new_location_name: Option<String>,
    pub timestamp: String,
}

/// Published after a join code created a membership edge
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct MemberJoinedMessage {
    pub event_type: String,
    pub event_id: String,
    pub member_email: String,
    pub role: String,
    #[serde(default)]
    pub task_id: Option<String>,
    pub timestamp: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AnnouncementKind {
    /// General heads-up
    Tip,
    /// What members need to bring or know
    Requirements,
    /// Changes to who is attending
    Attendance,
}

/// Organizer broadcast to every member of an event
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct EventAnnouncementMessage {
    pub event_type: String,
    pub event_id: String,
    pub event_name: String,
    pub kind: AnnouncementKind,
    pub message: String,
    pub timestamp: String,
}

/// Envelope used by consumers to dispatch on `event_type`
#[derive(Deserialize, Debug, Clone)]
pub struct MessageKind {
    pub event_type: String,
}
