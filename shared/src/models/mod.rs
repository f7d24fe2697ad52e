use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod api;
pub mod events;

pub use api::*;

/// Returns the current time as an RFC 3339 string
pub fn now_str() -> String {
    Utc::now().to_rfc3339()
}

fn point_type() -> String {
    "Point".to_string()
}

/// GeoJSON point, coordinates are `[lng, lat]`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GeoPoint {
    #[serde(rename = "type", default = "point_type")]
    pub kind: String,
    pub coordinates: [f64; 2],
}

impl GeoPoint {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self {
            kind: point_type(),
            coordinates: [lng, lat],
        }
    }

    pub fn lng(&self) -> f64 {
        self.coordinates[0]
    }

    pub fn lat(&self) -> f64 {
        self.coordinates[1]
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Organizer,
    Delegate,
    Volunteer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Organizer => write!(f, "organizer"),
            Role::Delegate => write!(f, "delegate"),
            Role::Volunteer => write!(f, "volunteer"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Event {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub location: GeoPoint,
    #[serde(default)]
    pub location_name: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub delegate_join_code: String,
    pub volunteer_join_code: String,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub reminder_sent_at: Option<String>,
}

impl Event {
    /// An event stops accepting join codes once it has ended
    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        self.end_date < now
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Task {
    #[serde(rename = "_id")]
    pub id: String,
    pub event_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub location_name: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub max_volunteers: u32,
    #[serde(default)]
    pub assigned_delegate: Option<String>,
    pub task_join_code: String,
    /// Filled in from memberships whenever a task is returned
    #[serde(default)]
    pub volunteer_count: u32,
    pub created_at: String,
    pub updated_at: String,
}

impl Task {
    pub fn is_full(&self) -> bool {
        self.volunteer_count >= self.max_volunteers
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DelegateRegistration {
    pub email: String,
    pub organization: String,
    pub delegate_org_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    pub created_at: String,
}

/// Sparse index keys are skipped when unset so DynamoDB never sees a NULL key.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct VolunteerMembership {
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delegate_org_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    pub joined_at: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub hashed_password: String,
    pub created_at: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PasswordResetToken {
    pub token: String,
    pub email: String,
    pub expires_at: String,
}

impl PasswordResetToken {
    pub fn is_expired(&self) -> bool {
        match DateTime::parse_from_rfc3339(&self.expires_at) {
            Ok(expires_at) => expires_at.with_timezone(&Utc) < Utc::now(),
            Err(_) => true,
        }
    }
}
