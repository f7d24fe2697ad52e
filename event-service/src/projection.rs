//! Pure builders for the role-shaped event views. Handlers load records,
//! these functions decide what each role sees.

use gather_shared::models::{
    Contact, DelegateEventDetail, DelegateRegistration, DelegateSummary, Event,
    OrganizerEventDetail, Task, VolunteerEventDetail, VolunteerMembership, VolunteerSummary,
};
use std::collections::HashSet;

pub fn organizer_detail(
    event: Event,
    tasks: Vec<Task>,
    delegates: &[DelegateRegistration],
    memberships: &[VolunteerMembership],
) -> OrganizerEventDetail {
    let delegates: Vec<DelegateSummary> = delegates
        .iter()
        .map(|d| {
            let members: HashSet<&str> = memberships
                .iter()
                .filter(|m| m.delegate_org_code.as_deref() == Some(d.delegate_org_code.as_str()))
                .map(|m| m.email.as_str())
                .collect();
            DelegateSummary {
                email: d.email.clone(),
                organization: d.organization.clone(),
                delegate_org_code: d.delegate_org_code.clone(),
                volunteer_count: members.len() as u32,
            }
        })
        .collect();

    let volunteers: HashSet<&str> = memberships.iter().map(|m| m.email.as_str()).collect();

    OrganizerEventDetail {
        event,
        task_count: tasks.len() as u32,
        delegate_count: delegates.len() as u32,
        volunteer_count: volunteers.len() as u32,
        tasks,
        delegates,
    }
}

/// The task of `tasks` currently assigned to `email`
pub fn assigned_task<'a>(tasks: &'a [Task], email: &str) -> Option<&'a Task> {
    tasks
        .iter()
        .find(|t| t.assigned_delegate.as_deref() == Some(email))
}

pub fn delegate_detail(
    event: Event,
    delegate: &DelegateRegistration,
    tasks: &[Task],
    volunteers: Vec<VolunteerSummary>,
    organizer: Contact,
) -> DelegateEventDetail {
    DelegateEventDetail {
        event,
        delegate_org_code: delegate.delegate_org_code.clone(),
        assigned_task: assigned_task(tasks, &delegate.email).cloned(),
        volunteers,
        organizer,
    }
}

/// A volunteer's task: the one they joined directly, else the one their
/// delegate is assigned to
pub fn volunteer_task<'a>(
    membership: &VolunteerMembership,
    tasks: &'a [Task],
    delegate: Option<&DelegateRegistration>,
) -> Option<&'a Task> {
    if let Some(task_id) = membership.task_id.as_deref() {
        if let Some(task) = tasks.iter().find(|t| t.id == task_id) {
            return Some(task);
        }
    }
    delegate.and_then(|d| assigned_task(tasks, &d.email))
}

/// None while no task resolves for the volunteer
pub fn volunteer_detail(
    event: Event,
    membership: &VolunteerMembership,
    tasks: &[Task],
    delegate: Option<(&DelegateRegistration, Contact)>,
    group: Vec<VolunteerSummary>,
) -> Option<VolunteerEventDetail> {
    let registration = delegate.as_ref().map(|(d, _)| *d);
    let task = volunteer_task(membership, tasks, registration)?.clone();
    Some(VolunteerEventDetail {
        event,
        task,
        delegate: delegate.map(|(_, contact)| contact),
        group,
    })
}
