use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use gather_shared::codes;
use gather_shared::models::{
    now_str, AnnounceRequest, Event, EventDetail, EventUpsert, MessageResponse, Role,
};
use gather_shared::store::MembershipStore;
use log::{error, info};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::membership::{
    claim_code, contact_for, group_roster, membership_for_event, require_organizer,
    tasks_with_counts,
};
use crate::models::{EventDetailQuery, RoleQuery};
use crate::projection;
use crate::publisher;

fn validate_upsert(payload: &EventUpsert) -> Result<()> {
    if payload.name.trim().is_empty() {
        return Err(AppError::bad_request("Event name is required".into()));
    }
    if payload.end_date < payload.start_date {
        return Err(AppError::bad_request(
            "Event end date must not be before its start date".into(),
        ));
    }
    Ok(())
}

// PATCH /event
// Creates the event when `_id` is absent, otherwise replaces its editable fields
pub async fn upsert_event<S>(
    State(store): State<Arc<S>>,
    Extension(user_id): Extension<String>,
    Json(payload): Json<EventUpsert>,
) -> Result<(StatusCode, Json<Event>)>
where
    S: MembershipStore,
{
    validate_upsert(&payload)?;

    let existing = match payload.id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => {
            let event = store.get_event(id).await?;
            if event.created_by != user_id {
                return Err(AppError::forbidden(
                    "You don't have permission to update this event".into(),
                ));
            }
            Some(event)
        }
        _ => None,
    };

    let delegate_code = claim_code(
        &*store,
        payload.delegate_join_code.as_deref(),
        existing.as_ref().map(|e| e.delegate_join_code.as_str()),
        &[],
    )
    .await?;
    let volunteer_code = claim_code(
        &*store,
        payload.volunteer_join_code.as_deref(),
        existing.as_ref().map(|e| e.volunteer_join_code.as_str()),
        &[delegate_code.as_str()],
    )
    .await?;

    let now = now_str();
    match existing {
        Some(before) => {
            let updated = Event {
                name: payload.name.trim().to_string(),
                description: payload.description.unwrap_or_default(),
                location: payload.location,
                location_name: payload.location_name,
                start_date: payload.start_date,
                end_date: payload.end_date,
                delegate_join_code: delegate_code,
                volunteer_join_code: volunteer_code,
                updated_at: now,
                ..before.clone()
            };
            let updated = store.update_event(updated).await?;
            info!("Updated event {} by {}", updated.id, user_id);

            if let Some(message) = publisher::event_changed_message(&before, &updated) {
                if let Err(e) = publisher::publish_event_changed(&message).await {
                    error!("Failed to publish event_changed for {}: {:?}", updated.id, e);
                }
            }

            Ok((StatusCode::OK, Json(updated)))
        }
        None => {
            let event = Event {
                id: Uuid::new_v4().to_string(),
                name: payload.name.trim().to_string(),
                description: payload.description.unwrap_or_default(),
                location: payload.location,
                location_name: payload.location_name,
                start_date: payload.start_date,
                end_date: payload.end_date,
                delegate_join_code: delegate_code,
                volunteer_join_code: volunteer_code,
                created_by: user_id.clone(),
                created_at: now.clone(),
                updated_at: now,
                reminder_sent_at: None,
            };
            let created = store.create_event(event).await?;
            info!("Created event {} for organizer {}", created.id, user_id);
            Ok((StatusCode::CREATED, Json(created)))
        }
    }
}

// GET /events?role=
pub async fn list_events<S>(
    State(store): State<Arc<S>>,
    Extension(user_id): Extension<String>,
    Query(query): Query<RoleQuery>,
) -> Result<Json<Vec<Event>>>
where
    S: MembershipStore,
{
    let events = match query.role {
        Role::Organizer => store.get_events_by_creator(&user_id).await?,
        Role::Delegate => match store.get_delegate(&user_id).await? {
            Some(delegate) => match delegate.event_id {
                Some(event_id) => vec![store.get_event(&event_id).await?],
                None => vec![],
            },
            None => vec![],
        },
        Role::Volunteer => {
            let mut events: Vec<Event> = Vec::new();
            for membership in store.get_memberships_by_email(&user_id).await? {
                let event_id = match membership.event_id {
                    Some(id) => id,
                    None => continue,
                };
                if events.iter().any(|e| e.id == event_id) {
                    continue;
                }
                events.push(store.get_event(&event_id).await?);
            }
            events.sort_by(|a, b| a.start_date.cmp(&b.start_date));
            events
        }
    };

    Ok(Json(events))
}

// GET /events/:id?role=&delegate_org_code=
pub async fn get_event_detail<S>(
    State(store): State<Arc<S>>,
    Path(id): Path<String>,
    Extension(user_id): Extension<String>,
    Query(query): Query<EventDetailQuery>,
) -> Result<Json<EventDetail>>
where
    S: MembershipStore,
{
    let event = store.get_event(&id).await?;

    let detail = match query.role {
        Role::Organizer => {
            if event.created_by != user_id {
                return Err(AppError::forbidden(
                    "You don't have permission to view this event as organizer".into(),
                ));
            }
            let tasks = tasks_with_counts(&*store, &event.id).await?;
            let delegates = store.get_delegates_by_event(&event.id).await?;
            let memberships = store.get_memberships_by_event(&event.id).await?;
            EventDetail::Organizer(projection::organizer_detail(
                event,
                tasks,
                &delegates,
                &memberships,
            ))
        }
        Role::Delegate => {
            let delegate = match store.get_delegate(&user_id).await? {
                Some(d) if d.event_id.as_deref() == Some(event.id.as_str()) => d,
                _ => {
                    return Err(AppError::forbidden(
                        "You are not a delegate for this event".into(),
                    ))
                }
            };
            if let Some(code) = query.delegate_org_code.as_deref() {
                if codes::normalize(code) != delegate.delegate_org_code {
                    return Err(AppError::forbidden(
                        "Org code does not match your delegate registration".into(),
                    ));
                }
            }
            let tasks = tasks_with_counts(&*store, &event.id).await?;
            let roster = group_roster(&*store, &delegate).await?;
            let organizer = contact_for(&*store, &event.created_by, None).await?;
            EventDetail::Delegate(projection::delegate_detail(
                event, &delegate, &tasks, roster, organizer,
            ))
        }
        Role::Volunteer => {
            let memberships = store.get_memberships_by_email(&user_id).await?;
            let org_code = query.delegate_org_code.as_deref().map(codes::normalize);
            let membership = membership_for_event(&memberships, &event.id, org_code.as_deref())
                .ok_or_else(|| {
                    AppError::forbidden("You have not joined this event".into())
                })?;

            let delegate = match membership.delegate_org_code.as_deref() {
                Some(code) => store.get_delegate_by_org_code(code).await?,
                None => None,
            };
            let (delegate_contact, group) = match &delegate {
                Some(d) => (
                    Some(contact_for(&*store, &d.email, Some(d.organization.clone())).await?),
                    group_roster(&*store, d).await?,
                ),
                None => (None, vec![]),
            };

            let tasks = tasks_with_counts(&*store, &event.id).await?;
            let event_name = event.name.clone();
            let detail = projection::volunteer_detail(
                event,
                membership,
                &tasks,
                delegate.as_ref().zip(delegate_contact),
                group,
            )
            .ok_or_else(|| {
                AppError::NotAssigned(format!(
                    "You have joined {} but have not been assigned to a task yet",
                    event_name
                ))
            })?;
            EventDetail::Volunteer(detail)
        }
    };

    Ok(Json(detail))
}

// POST /events/:id/announce
// Queues an organizer broadcast; the notification service mails every member
pub async fn announce<S>(
    State(store): State<Arc<S>>,
    Path(event_id): Path<String>,
    Extension(user_id): Extension<String>,
    Json(payload): Json<AnnounceRequest>,
) -> Result<(StatusCode, Json<MessageResponse>)>
where
    S: MembershipStore,
{
    let event = require_organizer(&*store, &event_id, &user_id).await?;
    let message = payload.message.trim();
    if message.is_empty() {
        return Err(AppError::bad_request("Announcement message is required".into()));
    }

    publisher::publish_announcement(&event, payload.kind, message).await?;
    info!(
        "Organizer {} announced {:?} for event {}",
        user_id, payload.kind, event.id
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(MessageResponse {
            message: "Announcement sent".to_string(),
        }),
    ))
}
