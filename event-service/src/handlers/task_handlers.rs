use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use gather_shared::models::{now_str, AssignRequest, Task, TaskPayload};
use gather_shared::store::MembershipStore;
use log::info;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::membership::{
    claim_code, require_event_delegate, require_organizer, task_in_event, tasks_with_counts,
    with_volunteer_count,
};

fn validate_task(payload: &TaskPayload) -> Result<()> {
    if payload.name.trim().is_empty() {
        return Err(AppError::bad_request("Task name is required".into()));
    }
    if payload.end_date < payload.start_date {
        return Err(AppError::bad_request(
            "Task end time must not be before its start time".into(),
        ));
    }
    if payload.max_volunteers == 0 {
        return Err(AppError::bad_request(
            "A task needs room for at least one volunteer".into(),
        ));
    }
    Ok(())
}

/// Organizer, delegates of the event and its volunteers may read the task list
async fn can_view_tasks<S: MembershipStore>(
    store: &S,
    event_id: &str,
    created_by: &str,
    user_id: &str,
) -> Result<bool> {
    if created_by == user_id {
        return Ok(true);
    }
    if let Some(delegate) = store.get_delegate(user_id).await? {
        if delegate.event_id.as_deref() == Some(event_id) {
            return Ok(true);
        }
    }
    Ok(store
        .get_memberships_by_email(user_id)
        .await?
        .iter()
        .any(|m| m.event_id.as_deref() == Some(event_id)))
}

// GET /events/:id/tasks
pub async fn list_tasks<S>(
    State(store): State<Arc<S>>,
    Path(event_id): Path<String>,
    Extension(user_id): Extension<String>,
) -> Result<Json<Vec<Task>>>
where
    S: MembershipStore,
{
    let event = store.get_event(&event_id).await?;
    if !can_view_tasks(&*store, &event.id, &event.created_by, &user_id).await? {
        return Err(AppError::forbidden(
            "You don't have permission to view tasks for this event".into(),
        ));
    }

    Ok(Json(tasks_with_counts(&*store, &event.id).await?))
}

// POST /events/:id/tasks
pub async fn create_task<S>(
    State(store): State<Arc<S>>,
    Path(event_id): Path<String>,
    Extension(user_id): Extension<String>,
    Json(payload): Json<TaskPayload>,
) -> Result<(StatusCode, Json<Task>)>
where
    S: MembershipStore,
{
    let event = require_organizer(&*store, &event_id, &user_id).await?;
    validate_task(&payload)?;

    let assigned_delegate = match payload.assigned_delegate.as_deref() {
        Some(email) if !email.trim().is_empty() => {
            Some(require_event_delegate(&*store, &event.id, email).await?.email)
        }
        _ => None,
    };

    let now = now_str();
    let task = Task {
        id: Uuid::new_v4().to_string(),
        event_id: event.id.clone(),
        name: payload.name.trim().to_string(),
        description: payload.description.unwrap_or_default(),
        location: payload.location,
        location_name: payload.location_name,
        start_date: payload.start_date,
        end_date: payload.end_date,
        max_volunteers: payload.max_volunteers,
        assigned_delegate,
        task_join_code: claim_code(&*store, None, None, &[]).await?,
        volunteer_count: 0,
        created_at: now.clone(),
        updated_at: now,
    };

    let created = store.create_task(task).await?;
    info!("Created task {} in event {}", created.id, event.id);

    Ok((StatusCode::CREATED, Json(created)))
}

// PATCH /events/:id/tasks/:task_id
pub async fn update_task<S>(
    State(store): State<Arc<S>>,
    Path((event_id, task_id)): Path<(String, String)>,
    Extension(user_id): Extension<String>,
    Json(payload): Json<TaskPayload>,
) -> Result<Json<Task>>
where
    S: MembershipStore,
{
    let event = require_organizer(&*store, &event_id, &user_id).await?;
    validate_task(&payload)?;

    let task = with_volunteer_count(&*store, task_in_event(&*store, &event.id, &task_id).await?)
        .await?;
    if payload.max_volunteers < task.volunteer_count {
        return Err(AppError::bad_request(format!(
            "Task already has {} volunteers; capacity cannot drop below that",
            task.volunteer_count
        )));
    }

    let assigned_delegate = match payload.assigned_delegate.as_deref() {
        Some(email) if !email.trim().is_empty() => {
            Some(require_event_delegate(&*store, &event.id, email).await?.email)
        }
        Some(_) => None,
        None => task.assigned_delegate.clone(),
    };

    let updated = Task {
        name: payload.name.trim().to_string(),
        description: payload.description.unwrap_or_default(),
        location: payload.location,
        location_name: payload.location_name,
        start_date: payload.start_date,
        end_date: payload.end_date,
        max_volunteers: payload.max_volunteers,
        assigned_delegate,
        updated_at: now_str(),
        ..task
    };

    let updated = store.update_task(updated).await?;
    info!("Updated task {} in event {}", updated.id, event.id);

    Ok(Json(updated))
}

// PATCH /events/:id/tasks/:task_id/assign
pub async fn assign_delegate<S>(
    State(store): State<Arc<S>>,
    Path((event_id, task_id)): Path<(String, String)>,
    Extension(user_id): Extension<String>,
    Json(payload): Json<AssignRequest>,
) -> Result<Json<Task>>
where
    S: MembershipStore,
{
    let event = require_organizer(&*store, &event_id, &user_id).await?;
    let mut task = task_in_event(&*store, &event.id, &task_id).await?;
    let delegate = require_event_delegate(&*store, &event.id, &payload.assigned_delegate).await?;

    if task.assigned_delegate.as_deref() != Some(delegate.email.as_str()) {
        info!(
            "Assigning task {} to delegate {} (was {:?})",
            task.id, delegate.email, task.assigned_delegate
        );
        task.assigned_delegate = Some(delegate.email);
        task.updated_at = now_str();
        task = store.update_task(task).await?;
    }

    Ok(Json(with_volunteer_count(&*store, task).await?))
}

// PATCH /events/:id/tasks/:task_id/unassign
pub async fn unassign_delegate<S>(
    State(store): State<Arc<S>>,
    Path((event_id, task_id)): Path<(String, String)>,
    Extension(user_id): Extension<String>,
) -> Result<Json<Task>>
where
    S: MembershipStore,
{
    let event = require_organizer(&*store, &event_id, &user_id).await?;
    let mut task = task_in_event(&*store, &event.id, &task_id).await?;

    if task.assigned_delegate.is_some() {
        info!("Unassigning delegate from task {}", task.id);
        task.assigned_delegate = None;
        task.updated_at = now_str();
        task = store.update_task(task).await?;
    }

    Ok(Json(with_volunteer_count(&*store, task).await?))
}
