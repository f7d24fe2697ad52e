//! Request and response bodies shared by the services and the API client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::events::AnnouncementKind;
use super::{Event, GeoPoint, Task};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MessageResponse {
    pub message: String,
}

/// Error body rendered by every service
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ErrorBody {
    pub detail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SignupRequest {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UserPublic {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SignupResponse {
    pub message: String,
    pub user: UserPublic,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ResetRequest {
    pub email: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ResetConfirmRequest {
    pub token: String,
    pub new_password: String,
}

/// Body of `PATCH /event`. Without `_id` a new event is created.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct EventUpsert {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub location: GeoPoint,
    #[serde(default)]
    pub location_name: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delegate_join_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volunteer_join_code: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TaskPayload {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub location_name: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub max_volunteers: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_delegate: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AssignRequest {
    pub assigned_delegate: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AnnounceRequest {
    pub kind: AnnouncementKind,
    pub message: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RegisterDelegateRequest {
    pub organization: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DelegateCodeResponse {
    pub event_id: Option<String>,
    pub delegate_org_code: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LeaveTaskRequest {
    pub task_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RemoveDelegateRequest {
    pub delegate_email: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RemoveVolunteerRequest {
    pub volunteer_email: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct LeaveGroupRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delegate_org_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct VolunteerSummary {
    pub email: String,
    #[serde(default)]
    pub organization: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DelegateSummary {
    pub email: String,
    pub organization: String,
    pub delegate_org_code: String,
    pub volunteer_count: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Contact {
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DelegateProfile {
    pub email: String,
    pub organization: String,
    pub delegate_org_code: String,
    pub event_id: Option<String>,
    pub volunteers: Vec<VolunteerSummary>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct VolunteerProfile {
    pub email: String,
    pub delegate_email: Option<String>,
    pub delegate_org_code: Option<String>,
    pub event_id: Option<String>,
    pub volunteers: Vec<VolunteerSummary>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OrganizerEventDetail {
    pub event: Event,
    pub tasks: Vec<Task>,
    pub delegates: Vec<DelegateSummary>,
    pub task_count: u32,
    pub delegate_count: u32,
    pub volunteer_count: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DelegateEventDetail {
    pub event: Event,
    pub delegate_org_code: String,
    pub assigned_task: Option<Task>,
    pub volunteers: Vec<VolunteerSummary>,
    pub organizer: Contact,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct VolunteerEventDetail {
    pub event: Event,
    pub task: Task,
    pub delegate: Option<Contact>,
    pub group: Vec<VolunteerSummary>,
}

/// Role-shaped projection returned by `GET /events/{id}`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum EventDetail {
    Organizer(OrganizerEventDetail),
    Delegate(DelegateEventDetail),
    Volunteer(VolunteerEventDetail),
}

impl EventDetail {
    pub fn event(&self) -> &Event {
        match self {
            EventDetail::Organizer(d) => &d.event,
            EventDetail::Delegate(d) => &d.event,
            EventDetail::Volunteer(d) => &d.event,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GeocodeResult {
    pub lat: f64,
    pub lng: f64,
    pub display_name: String,
}
