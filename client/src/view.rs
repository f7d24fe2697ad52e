//! Screen state built from API results by pure functions. Nothing here
//! performs I/O or holds state between calls.

use chrono::{DateTime, Utc};
use gather_shared::models::{
    Contact, DelegateEventDetail, DelegateSummary, Event, EventDetail, OrganizerEventDetail, Task,
    VolunteerEventDetail, VolunteerSummary,
};

use crate::error::ClientError;

#[derive(Debug, Clone, PartialEq)]
pub struct TaskRow {
    pub id: String,
    pub name: String,
    pub assigned_delegate: Option<String>,
    pub filled: u32,
    pub capacity: u32,
    pub spots_left: u32,
    pub join_code: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrganizerView {
    pub event_id: String,
    pub event_name: String,
    pub delegate_code: String,
    pub volunteer_code: String,
    pub tasks: Vec<TaskRow>,
    pub delegates: Vec<DelegateSummary>,
    pub unassigned_tasks: usize,
    pub volunteer_count: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DelegateView {
    pub event_id: String,
    pub event_name: String,
    pub org_code: String,
    pub assigned_task: Option<TaskRow>,
    pub volunteers: Vec<String>,
    pub organizer: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VolunteerView {
    pub event_id: String,
    pub event_name: String,
    pub task: TaskRow,
    pub delegate: Option<String>,
    pub group: Vec<String>,
}

/// What the event screen shows
#[derive(Debug, Clone, PartialEq)]
pub enum EventScreen {
    Organizer(OrganizerView),
    Delegate(DelegateView),
    Volunteer(VolunteerView),
    /// Joined but no task yet
    Pending { message: String },
    Error { message: String, retryable: bool },
}

pub fn task_row(task: &Task) -> TaskRow {
    TaskRow {
        id: task.id.clone(),
        name: task.name.clone(),
        assigned_delegate: task.assigned_delegate.clone(),
        filled: task.volunteer_count,
        capacity: task.max_volunteers,
        spots_left: task.max_volunteers.saturating_sub(task.volunteer_count),
        join_code: task.task_join_code.clone(),
    }
}

/// "First Last", falling back to the email
pub fn contact_name(contact: &Contact) -> String {
    let name = [contact.first_name.as_deref(), contact.last_name.as_deref()]
        .iter()
        .flatten()
        .copied()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if name.is_empty() {
        contact.email.clone()
    } else {
        name
    }
}

fn emails(volunteers: &[VolunteerSummary]) -> Vec<String> {
    volunteers.iter().map(|v| v.email.clone()).collect()
}

fn organizer_view(detail: &OrganizerEventDetail) -> OrganizerView {
    OrganizerView {
        event_id: detail.event.id.clone(),
        event_name: detail.event.name.clone(),
        delegate_code: detail.event.delegate_join_code.clone(),
        volunteer_code: detail.event.volunteer_join_code.clone(),
        tasks: detail.tasks.iter().map(task_row).collect(),
        delegates: detail.delegates.clone(),
        unassigned_tasks: detail
            .tasks
            .iter()
            .filter(|t| t.assigned_delegate.is_none())
            .count(),
        volunteer_count: detail.volunteer_count,
    }
}

fn delegate_view(detail: &DelegateEventDetail) -> DelegateView {
    DelegateView {
        event_id: detail.event.id.clone(),
        event_name: detail.event.name.clone(),
        org_code: detail.delegate_org_code.clone(),
        assigned_task: detail.assigned_task.as_ref().map(task_row),
        volunteers: emails(&detail.volunteers),
        organizer: contact_name(&detail.organizer),
    }
}

fn volunteer_view(detail: &VolunteerEventDetail) -> VolunteerView {
    VolunteerView {
        event_id: detail.event.id.clone(),
        event_name: detail.event.name.clone(),
        task: task_row(&detail.task),
        delegate: detail.delegate.as_ref().map(contact_name),
        group: emails(&detail.group),
    }
}

pub fn event_screen(result: &Result<EventDetail, ClientError>) -> EventScreen {
    match result {
        Ok(EventDetail::Organizer(detail)) => EventScreen::Organizer(organizer_view(detail)),
        Ok(EventDetail::Delegate(detail)) => EventScreen::Delegate(delegate_view(detail)),
        Ok(EventDetail::Volunteer(detail)) => EventScreen::Volunteer(volunteer_view(detail)),
        Err(e) if e.is_not_assigned() => EventScreen::Pending {
            message: e.to_string(),
        },
        Err(e) => EventScreen::Error {
            message: e.to_string(),
            retryable: matches!(e, ClientError::Transport { .. }),
        },
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventLists {
    /// Soonest first
    pub upcoming: Vec<Event>,
    /// Most recent first
    pub past: Vec<Event>,
}

/// Events still running count as upcoming
pub fn split_events(events: Vec<Event>, now: DateTime<Utc>) -> EventLists {
    let (mut past, mut upcoming): (Vec<Event>, Vec<Event>) =
        events.into_iter().partition(|e| e.has_ended(now));
    upcoming.sort_by(|a, b| a.start_date.cmp(&b.start_date));
    past.sort_by(|a, b| b.start_date.cmp(&a.start_date));
    EventLists { upcoming, past }
}
