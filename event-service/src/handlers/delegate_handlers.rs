use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use gather_shared::codes;
use gather_shared::models::{
    now_str, DelegateCodeResponse, DelegateProfile, DelegateRegistration, MessageResponse,
    RegisterDelegateRequest, RemoveDelegateRequest, RemoveVolunteerRequest, Role,
};
use gather_shared::store::MembershipStore;
use log::{error, info};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::membership::{
    attach_to_event, claim_code, detach_from_event, group_roster, require_organizer,
    resolve_event_ref,
};
use crate::models::RegisterDelegateQuery;
use crate::publisher;

async fn require_registration<S: MembershipStore>(
    store: &S,
    user_id: &str,
) -> Result<DelegateRegistration> {
    store
        .get_delegate(user_id)
        .await?
        .ok_or_else(|| AppError::not_found("You are not registered as a delegate".into()))
}

// POST /delegate/register?event_id=
pub async fn register_delegate<S>(
    State(store): State<Arc<S>>,
    Extension(user_id): Extension<String>,
    Query(query): Query<RegisterDelegateQuery>,
    Json(payload): Json<RegisterDelegateRequest>,
) -> Result<(StatusCode, Json<DelegateCodeResponse>)>
where
    S: MembershipStore,
{
    let organization = payload.organization.trim();
    if organization.is_empty() {
        return Err(AppError::bad_request("Organization name is required".into()));
    }
    if store.get_delegate(&user_id).await?.is_some() {
        return Err(AppError::AlreadyRegistered(
            "You are already registered as a delegate".into(),
        ));
    }

    let event = match query.event_id.as_deref().map(str::trim) {
        Some(event_ref) if !event_ref.is_empty() => {
            let event = resolve_event_ref(&*store, event_ref).await?;
            if event.has_ended(Utc::now()) {
                return Err(AppError::CodeExpired(format!("{} has already ended", event.name)));
            }
            Some(event)
        }
        _ => None,
    };

    let delegate = DelegateRegistration {
        email: user_id.clone(),
        organization: organization.to_string(),
        delegate_org_code: claim_code(&*store, None, None, &[]).await?,
        event_id: event.as_ref().map(|e| e.id.clone()),
        created_at: now_str(),
    };
    let delegate = store.save_delegate(delegate).await?;
    info!(
        "Registered delegate {} with org code {}",
        delegate.email, delegate.delegate_org_code
    );

    if let Some(event) = &event {
        if let Err(e) = publisher::publish_member_joined(&event.id, &user_id, Role::Delegate, None).await
        {
            error!("Failed to publish member_joined for {}: {:?}", user_id, e);
        }
    }

    Ok((
        StatusCode::CREATED,
        Json(DelegateCodeResponse {
            event_id: delegate.event_id,
            delegate_org_code: delegate.delegate_org_code,
        }),
    ))
}

// GET /delegate/profile
pub async fn delegate_profile<S>(
    State(store): State<Arc<S>>,
    Extension(user_id): Extension<String>,
) -> Result<Json<DelegateProfile>>
where
    S: MembershipStore,
{
    let delegate = require_registration(&*store, &user_id).await?;
    let volunteers = group_roster(&*store, &delegate).await?;

    Ok(Json(DelegateProfile {
        email: delegate.email,
        organization: delegate.organization,
        delegate_org_code: delegate.delegate_org_code,
        event_id: delegate.event_id,
        volunteers,
    }))
}

// POST /delegate/attach/:event_ref/:code
// `event_ref` is an event id or that event's delegate join code
pub async fn attach_delegate<S>(
    State(store): State<Arc<S>>,
    Path((event_ref, code)): Path<(String, String)>,
    Extension(user_id): Extension<String>,
) -> Result<Json<DelegateCodeResponse>>
where
    S: MembershipStore,
{
    let delegate = require_registration(&*store, &user_id).await?;
    if codes::normalize(&code) != delegate.delegate_org_code {
        return Err(AppError::forbidden(
            "Org code does not match your delegate registration".into(),
        ));
    }

    let event = resolve_event_ref(&*store, &event_ref).await?;
    if event.has_ended(Utc::now()) {
        return Err(AppError::CodeExpired(format!("{} has already ended", event.name)));
    }

    let delegate = match delegate.event_id.as_deref() {
        Some(current) if current == event.id => delegate,
        Some(_) => {
            return Err(AppError::AlreadyMember(
                "You are already attached to another event; leave it first".into(),
            ))
        }
        None => {
            let attached = attach_to_event(&*store, delegate, &event).await?;
            if let Err(e) =
                publisher::publish_member_joined(&event.id, &user_id, Role::Delegate, None).await
            {
                error!("Failed to publish member_joined for {}: {:?}", user_id, e);
            }
            attached
        }
    };

    Ok(Json(DelegateCodeResponse {
        event_id: delegate.event_id,
        delegate_org_code: delegate.delegate_org_code,
    }))
}

// POST /delegate/leave
pub async fn leave_delegate_event<S>(
    State(store): State<Arc<S>>,
    Extension(user_id): Extension<String>,
) -> Result<Json<MessageResponse>>
where
    S: MembershipStore,
{
    let delegate = require_registration(&*store, &user_id).await?;
    if delegate.event_id.is_none() {
        return Err(AppError::bad_request(
            "You are not attached to any event".into(),
        ));
    }

    detach_from_event(&*store, delegate).await?;

    Ok(Json(MessageResponse {
        message: "Left event".to_string(),
    }))
}

// POST /delegate/remove/:event_id
pub async fn remove_delegate<S>(
    State(store): State<Arc<S>>,
    Path(event_id): Path<String>,
    Extension(user_id): Extension<String>,
    Json(payload): Json<RemoveDelegateRequest>,
) -> Result<Json<MessageResponse>>
where
    S: MembershipStore,
{
    let event = require_organizer(&*store, &event_id, &user_id).await?;
    let email = payload.delegate_email.trim();

    let delegate = match store.get_delegate(email).await? {
        Some(d) if d.event_id.as_deref() == Some(event.id.as_str()) => d,
        _ => {
            return Err(AppError::not_found(format!(
                "{} is not a delegate of this event",
                email
            )))
        }
    };

    detach_from_event(&*store, delegate).await?;
    info!("Organizer {} removed delegate {} from {}", user_id, email, event.id);

    Ok(Json(MessageResponse {
        message: "Delegate removed".to_string(),
    }))
}

// POST /delegate/volunteer/remove
pub async fn remove_volunteer<S>(
    State(store): State<Arc<S>>,
    Extension(user_id): Extension<String>,
    Json(payload): Json<RemoveVolunteerRequest>,
) -> Result<Json<MessageResponse>>
where
    S: MembershipStore,
{
    let delegate = require_registration(&*store, &user_id).await?;
    let email = payload.volunteer_email.trim();

    let removing: Vec<_> = store
        .get_memberships_by_org_code(&delegate.delegate_org_code)
        .await?
        .into_iter()
        .filter(|m| m.email == email)
        .collect();
    if removing.is_empty() {
        return Err(AppError::not_found(format!(
            "{} is not in your volunteer group",
            email
        )));
    }

    for membership in &removing {
        store.delete_membership(&membership.id).await?;
    }
    info!(
        "Delegate {} removed volunteer {} from group {}",
        user_id, email, delegate.delegate_org_code
    );

    Ok(Json(MessageResponse {
        message: "Volunteer removed".to_string(),
    }))
}
