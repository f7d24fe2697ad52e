//! Join-code redemption. Each successful redemption creates or updates
//! exactly one membership edge; repeating a redemption for the same target
//! is a no-op that returns the same entity.

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use chrono::Utc;
use gather_shared::codes;
use gather_shared::models::{
    now_str, Event, LeaveTaskRequest, MessageResponse, Role, Task, VolunteerMembership,
    VolunteerProfile,
};
use gather_shared::store::MembershipStore;
use log::{debug, error, info};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::handlers::volunteer_handlers::build_volunteer_profile;
use crate::membership::{attach_to_event, with_volunteer_count};
use crate::publisher;

fn parse_code(raw: &str) -> Result<String> {
    codes::parse(raw).ok_or_else(|| {
        AppError::MalformedCode(format!(
            "Invalid code: join codes are 1 to {} letters or digits",
            codes::MAX_CODE_LEN
        ))
    })
}

fn invalid_code(code: &str) -> AppError {
    AppError::InvalidCode(format!("Invalid code {}", code))
}

fn ensure_open(event: &Event) -> Result<()> {
    if event.has_ended(Utc::now()) {
        return Err(AppError::CodeExpired(format!(
            "{} has ended and no longer accepts new members",
            event.name
        )));
    }
    Ok(())
}

async fn announce_join(event_id: &str, email: &str, role: Role, task_id: Option<&str>) {
    if let Err(e) = publisher::publish_member_joined(event_id, email, role, task_id).await {
        error!("Failed to publish member_joined for {}: {:?}", email, e);
    }
}

fn new_membership(
    email: &str,
    delegate_org_code: Option<String>,
    event_id: Option<String>,
    task_id: Option<String>,
) -> VolunteerMembership {
    VolunteerMembership {
        id: Uuid::new_v4().to_string(),
        email: email.to_string(),
        delegate_org_code,
        event_id,
        task_id,
        joined_at: now_str(),
    }
}

// POST /event/join/:code
// A delegate code attaches the caller's delegate registration to the event,
// a volunteer code enrolls the caller as a volunteer of the event.
pub async fn join_event<S>(
    State(store): State<Arc<S>>,
    Path(code): Path<String>,
    Extension(user_id): Extension<String>,
) -> Result<Json<Event>>
where
    S: MembershipStore,
{
    let code = parse_code(&code)?;

    if let Some(event) = store.get_event_by_delegate_code(&code).await? {
        ensure_open(&event)?;
        let delegate = store.get_delegate(&user_id).await?.ok_or_else(|| {
            AppError::bad_request(
                "Register as a delegate before joining an event with a delegate code".into(),
            )
        })?;

        match delegate.event_id.as_deref() {
            Some(current) if current == event.id => {
                debug!("Delegate {} already attached to {}", user_id, event.id);
                return Ok(Json(event));
            }
            Some(_) => {
                return Err(AppError::AlreadyMember(
                    "You are already attached to another event; leave it first".into(),
                ))
            }
            None => {}
        }

        attach_to_event(&*store, delegate, &event).await?;
        announce_join(&event.id, &user_id, Role::Delegate, None).await;
        return Ok(Json(event));
    }

    if let Some(event) = store.get_event_by_volunteer_code(&code).await? {
        ensure_open(&event)?;
        let memberships = store.get_memberships_by_email(&user_id).await?;
        if memberships
            .iter()
            .any(|m| m.event_id.as_deref() == Some(event.id.as_str()))
        {
            debug!("Volunteer {} already in event {}", user_id, event.id);
            return Ok(Json(event));
        }

        store
            .save_membership(new_membership(&user_id, None, Some(event.id.clone()), None))
            .await?;
        info!("Volunteer {} joined event {}", user_id, event.id);
        announce_join(&event.id, &user_id, Role::Volunteer, None).await;
        return Ok(Json(event));
    }

    Err(invalid_code(&code))
}

// POST /tasks/join/:code
pub async fn join_task<S>(
    State(store): State<Arc<S>>,
    Path(code): Path<String>,
    Extension(user_id): Extension<String>,
) -> Result<Json<Task>>
where
    S: MembershipStore,
{
    let code = parse_code(&code)?;
    let task = store
        .get_task_by_code(&code)
        .await?
        .ok_or_else(|| invalid_code(&code))?;
    let event = store.get_event(&task.event_id).await?;
    ensure_open(&event)?;

    let memberships = store.get_memberships_by_email(&user_id).await?;
    if memberships
        .iter()
        .any(|m| m.task_id.as_deref() == Some(task.id.as_str()))
    {
        debug!("Volunteer {} already on task {}", user_id, task.id);
        return Ok(Json(with_volunteer_count(&*store, task).await?));
    }

    let in_event = memberships
        .iter()
        .find(|m| m.event_id.as_deref() == Some(event.id.as_str()));
    if in_event.map_or(false, |m| m.task_id.is_some()) {
        return Err(AppError::AlreadyMember(
            "You are already on another task for this event; leave it first".into(),
        ));
    }

    let task = with_volunteer_count(&*store, task).await?;
    if task.is_full() {
        return Err(AppError::TaskFull(format!(
            "{} already has {} of {} volunteers",
            task.name, task.volunteer_count, task.max_volunteers
        )));
    }

    let membership = match in_event {
        Some(existing) => VolunteerMembership {
            task_id: Some(task.id.clone()),
            ..existing.clone()
        },
        None => new_membership(&user_id, None, Some(event.id.clone()), Some(task.id.clone())),
    };
    store.save_membership(membership).await?;
    info!("Volunteer {} joined task {}", user_id, task.id);
    announce_join(&event.id, &user_id, Role::Volunteer, Some(&task.id)).await;

    Ok(Json(with_volunteer_count(&*store, task).await?))
}

// POST /tasks/leave
pub async fn leave_task<S>(
    State(store): State<Arc<S>>,
    Extension(user_id): Extension<String>,
    Json(payload): Json<LeaveTaskRequest>,
) -> Result<Json<MessageResponse>>
where
    S: MembershipStore,
{
    let mut membership = store
        .get_memberships_by_email(&user_id)
        .await?
        .into_iter()
        .find(|m| m.task_id.as_deref() == Some(payload.task_id.as_str()))
        .ok_or_else(|| AppError::not_found("You are not part of this task".into()))?;

    membership.task_id = None;
    store.save_membership(membership).await?;
    info!("Volunteer {} left task {}", user_id, payload.task_id);

    Ok(Json(MessageResponse {
        message: "Left task".to_string(),
    }))
}

// POST /delegate/join/:code
// Enrolls the caller in a delegate's volunteer group
pub async fn join_delegate_group<S>(
    State(store): State<Arc<S>>,
    Path(code): Path<String>,
    Extension(user_id): Extension<String>,
) -> Result<Json<VolunteerProfile>>
where
    S: MembershipStore,
{
    let code = parse_code(&code)?;
    let delegate = store
        .get_delegate_by_org_code(&code)
        .await?
        .ok_or_else(|| invalid_code(&code))?;

    if delegate.email == user_id {
        return Err(AppError::bad_request(
            "You cannot join your own volunteer group".into(),
        ));
    }
    if let Some(event_id) = delegate.event_id.as_deref() {
        ensure_open(&store.get_event(event_id).await?)?;
    }

    let memberships = store.get_memberships_by_email(&user_id).await?;
    if let Some(existing) = memberships
        .iter()
        .find(|m| m.delegate_org_code.as_deref() == Some(code.as_str()))
    {
        debug!("Volunteer {} already in group {}", user_id, code);
        let profile = build_volunteer_profile(&*store, &user_id, existing).await?;
        return Ok(Json(profile));
    }

    // One group per event: memberships sharing the delegate's event scope
    let same_scope = memberships
        .iter()
        .find(|m| m.event_id == delegate.event_id);
    let membership = match same_scope {
        Some(m) if m.delegate_org_code.is_some() => {
            return Err(AppError::AlreadyMember(
                "You already belong to a delegate group for this event; leave it first".into(),
            ))
        }
        Some(m) => VolunteerMembership {
            delegate_org_code: Some(code.clone()),
            ..m.clone()
        },
        None => new_membership(&user_id, Some(code.clone()), delegate.event_id.clone(), None),
    };

    let membership = store.save_membership(membership).await?;
    info!("Volunteer {} joined group {}", user_id, code);
    if let Some(event_id) = delegate.event_id.as_deref() {
        announce_join(event_id, &user_id, Role::Volunteer, None).await;
    }

    let profile = build_volunteer_profile(&*store, &user_id, &membership).await?;
    Ok(Json(profile))
}
