//! Store-backed helpers shared by the handlers: code allocation, ownership
//! checks, rosters and the delegate detach cascade.

use gather_shared::codes;
use gather_shared::error::StoreError;
use gather_shared::models::{
    now_str, Contact, DelegateRegistration, Event, Task, VolunteerMembership, VolunteerSummary,
};
use gather_shared::store::MembershipStore;
use log::{debug, info};

use crate::error::{AppError, Result};

const MAX_CODE_ATTEMPTS: usize = 16;

/// True when `code` already resolves to an event, task or delegate group
pub async fn code_in_use<S: MembershipStore>(store: &S, code: &str) -> Result<bool> {
    Ok(store.get_event_by_delegate_code(code).await?.is_some()
        || store.get_event_by_volunteer_code(code).await?.is_some()
        || store.get_task_by_code(code).await?.is_some()
        || store.get_delegate_by_org_code(code).await?.is_some())
}

/// Allocates a join code.
///
/// A requested code is normalized and accepted when it is free or equals
/// `current` (the code the record already holds). Without a request a fresh
/// code is generated. `reserved` holds codes claimed earlier in the same
/// request that are not stored yet.
pub async fn claim_code<S: MembershipStore>(
    store: &S,
    requested: Option<&str>,
    current: Option<&str>,
    reserved: &[&str],
) -> Result<String> {
    if let Some(raw) = requested {
        let code = codes::parse(raw).ok_or_else(|| {
            AppError::bad_request(format!(
                "Join code '{}' must be 1 to {} letters or digits",
                raw.trim(),
                codes::MAX_CODE_LEN
            ))
        })?;
        if reserved.contains(&code.as_str()) {
            return Err(AppError::bad_request(
                "Delegate and volunteer join codes must differ".into(),
            ));
        }
        if current == Some(code.as_str()) {
            return Ok(code);
        }
        if code_in_use(store, &code).await? {
            return Err(AppError::Conflict(format!("Join code {} is already in use", code)));
        }
        return Ok(code);
    }

    if let Some(existing) = current {
        return Ok(existing.to_string());
    }

    for _ in 0..MAX_CODE_ATTEMPTS {
        let candidate = codes::generate();
        if reserved.contains(&candidate.as_str()) {
            continue;
        }
        if !code_in_use(store, &candidate).await? {
            debug!("Allocated join code {}", candidate);
            return Ok(candidate);
        }
    }
    Err(AppError::internal_server_error(
        "Could not allocate a unique join code".into(),
    ))
}

/// Loads the event and checks the caller created it
pub async fn require_organizer<S: MembershipStore>(
    store: &S,
    event_id: &str,
    user_id: &str,
) -> Result<Event> {
    let event = store.get_event(event_id).await?;
    if event.created_by != user_id {
        return Err(AppError::forbidden(
            "Only the event organizer can do this".into(),
        ));
    }
    Ok(event)
}

/// Fills in the derived volunteer count
pub async fn with_volunteer_count<S: MembershipStore>(store: &S, mut task: Task) -> Result<Task> {
    task.volunteer_count = store.get_memberships_by_task(&task.id).await?.len() as u32;
    Ok(task)
}

pub async fn tasks_with_counts<S: MembershipStore>(store: &S, event_id: &str) -> Result<Vec<Task>> {
    let tasks = store.get_tasks_by_event(event_id).await?;
    let mut counted = Vec::with_capacity(tasks.len());
    for task in tasks {
        counted.push(with_volunteer_count(store, task).await?);
    }
    Ok(counted)
}

/// Loads a task and checks it belongs to `event_id`
pub async fn task_in_event<S: MembershipStore>(
    store: &S,
    event_id: &str,
    task_id: &str,
) -> Result<Task> {
    let task = store.get_task(task_id).await?;
    if task.event_id != event_id {
        return Err(AppError::not_found(format!(
            "Task {} not found in event {}",
            task_id, event_id
        )));
    }
    Ok(task)
}

/// A task may only be assigned to a delegate registered for its event
pub async fn require_event_delegate<S: MembershipStore>(
    store: &S,
    event_id: &str,
    email: &str,
) -> Result<DelegateRegistration> {
    let email = email.trim();
    match store.get_delegate(email).await? {
        Some(delegate) if delegate.event_id.as_deref() == Some(event_id) => Ok(delegate),
        _ => Err(AppError::bad_request(format!(
            "{} is not a delegate registered for this event",
            email
        ))),
    }
}

/// Resolves an event id, or an event's delegate join code
pub async fn resolve_event_ref<S: MembershipStore>(store: &S, event_ref: &str) -> Result<Event> {
    let event_ref = event_ref.trim();
    match store.get_event(event_ref).await {
        Ok(event) => return Ok(event),
        Err(StoreError::NotFound(_)) => {}
        Err(e) => return Err(e.into()),
    }
    if let Some(code) = codes::parse(event_ref) {
        if let Some(event) = store.get_event_by_delegate_code(&code).await? {
            return Ok(event);
        }
    }
    Err(AppError::not_found(format!("Event {} not found", event_ref)))
}

pub async fn group_roster<S: MembershipStore>(
    store: &S,
    delegate: &DelegateRegistration,
) -> Result<Vec<VolunteerSummary>> {
    let memberships = store
        .get_memberships_by_org_code(&delegate.delegate_org_code)
        .await?;
    let mut roster: Vec<VolunteerSummary> = Vec::with_capacity(memberships.len());
    for m in memberships {
        if roster.iter().any(|v| v.email == m.email) {
            continue;
        }
        roster.push(VolunteerSummary {
            email: m.email,
            organization: Some(delegate.organization.clone()),
        });
    }
    Ok(roster)
}

/// Contact card for an account; unknown accounts get a bare email
pub async fn contact_for<S: MembershipStore>(
    store: &S,
    email: &str,
    organization: Option<String>,
) -> Result<Contact> {
    let user = store.get_user(email).await?;
    Ok(Contact {
        email: email.to_string(),
        first_name: user.as_ref().map(|u| u.first_name.clone()),
        last_name: user.as_ref().map(|u| u.last_name.clone()),
        organization,
    })
}

/// Binds a delegate to an event and carries the event over to group
/// memberships that have none yet.
///
/// A volunteer keeps one membership per event: a plain event membership is
/// merged with the group membership, and a volunteer already in another
/// group of the event blocks the attach.
pub async fn attach_to_event<S: MembershipStore>(
    store: &S,
    mut delegate: DelegateRegistration,
    event: &Event,
) -> Result<DelegateRegistration> {
    let mut moves = Vec::new();
    for membership in store
        .get_memberships_by_org_code(&delegate.delegate_org_code)
        .await?
    {
        if membership.event_id.is_some() {
            continue;
        }
        let existing = store
            .get_memberships_by_email(&membership.email)
            .await?
            .into_iter()
            .find(|m| m.event_id.as_deref() == Some(event.id.as_str()));
        if let Some(other) = existing
            .as_ref()
            .and_then(|m| m.delegate_org_code.as_deref())
            .filter(|code| *code != delegate.delegate_org_code)
        {
            return Err(AppError::AlreadyMember(format!(
                "{} already belongs to group {} in {}; remove them from your group first",
                membership.email, other, event.name
            )));
        }
        moves.push((membership, existing));
    }

    delegate.event_id = Some(event.id.clone());
    let delegate = store.save_delegate(delegate).await?;

    for (mut membership, existing) in moves {
        match existing {
            Some(mut merged) => {
                merged.delegate_org_code = Some(delegate.delegate_org_code.clone());
                if merged.task_id.is_none() {
                    merged.task_id = membership.task_id.take();
                }
                debug!(
                    "Merging group membership {} into {} for {}",
                    membership.id, merged.id, merged.email
                );
                store.save_membership(merged).await?;
                store.delete_membership(&membership.id).await?;
            }
            None => {
                membership.event_id = Some(event.id.clone());
                store.save_membership(membership).await?;
            }
        }
    }

    info!(
        "Delegate {} attached to event {}",
        delegate.email, event.id
    );
    Ok(delegate)
}

/// Removes a delegate from its event. Tasks of that event assigned to the
/// delegate are unassigned and the group's event/task links are cleared.
pub async fn detach_from_event<S: MembershipStore>(
    store: &S,
    mut delegate: DelegateRegistration,
) -> Result<DelegateRegistration> {
    let event_id = match delegate.event_id.take() {
        Some(id) => id,
        None => return Ok(delegate),
    };

    for mut task in store.get_tasks_by_event(&event_id).await? {
        if task.assigned_delegate.as_deref() == Some(delegate.email.as_str()) {
            task.assigned_delegate = None;
            task.updated_at = now_str();
            info!("Unassigned task {} from departing delegate {}", task.id, delegate.email);
            store.update_task(task).await?;
        }
    }

    for mut membership in store
        .get_memberships_by_org_code(&delegate.delegate_org_code)
        .await?
    {
        if membership.event_id.as_deref() == Some(event_id.as_str()) {
            membership.event_id = None;
            membership.task_id = None;
            store.save_membership(membership).await?;
        }
    }

    let delegate = store.save_delegate(delegate).await?;
    info!("Delegate {} detached from event {}", delegate.email, event_id);
    Ok(delegate)
}

/// The caller's membership in an event, optionally narrowed to one group.
/// Memberships holding a task, then a group, win over bare event ones.
pub fn membership_for_event<'a>(
    memberships: &'a [VolunteerMembership],
    event_id: &str,
    org_code: Option<&str>,
) -> Option<&'a VolunteerMembership> {
    memberships
        .iter()
        .filter(|m| {
            m.event_id.as_deref() == Some(event_id)
                && org_code.map_or(true, |code| m.delegate_org_code.as_deref() == Some(code))
        })
        .max_by_key(|m| (m.task_id.is_some(), m.delegate_org_code.is_some()))
}
