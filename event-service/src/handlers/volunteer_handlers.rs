use axum::{
    extract::{Extension, State},
    Json,
};
use gather_shared::codes;
use gather_shared::models::{
    LeaveGroupRequest, MessageResponse, VolunteerMembership, VolunteerProfile,
};
use gather_shared::store::MembershipStore;
use log::info;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::membership::group_roster;

pub(crate) async fn build_volunteer_profile<S: MembershipStore>(
    store: &S,
    email: &str,
    membership: &VolunteerMembership,
) -> Result<VolunteerProfile> {
    let delegate = match membership.delegate_org_code.as_deref() {
        Some(code) => store.get_delegate_by_org_code(code).await?,
        None => None,
    };
    let volunteers = match &delegate {
        Some(d) => group_roster(store, d).await?,
        None => vec![],
    };

    Ok(VolunteerProfile {
        email: email.to_string(),
        delegate_email: delegate.as_ref().map(|d| d.email.clone()),
        delegate_org_code: membership.delegate_org_code.clone(),
        event_id: membership.event_id.clone(),
        volunteers,
    })
}

// GET /volunteer/profile
pub async fn volunteer_profile<S>(
    State(store): State<Arc<S>>,
    Extension(user_id): Extension<String>,
) -> Result<Json<VolunteerProfile>>
where
    S: MembershipStore,
{
    // Most recent group membership wins
    let membership = store
        .get_memberships_by_email(&user_id)
        .await?
        .into_iter()
        .filter(|m| m.delegate_org_code.is_some())
        .max_by(|a, b| a.joined_at.cmp(&b.joined_at))
        .ok_or_else(|| AppError::not_found("You have not joined a volunteer group".into()))?;

    Ok(Json(
        build_volunteer_profile(&*store, &user_id, &membership).await?,
    ))
}

// POST /volunteer/leave
// Without filters the caller leaves every delegate group
pub async fn leave_group<S>(
    State(store): State<Arc<S>>,
    Extension(user_id): Extension<String>,
    Json(payload): Json<LeaveGroupRequest>,
) -> Result<Json<MessageResponse>>
where
    S: MembershipStore,
{
    let org_code = payload.delegate_org_code.as_deref().map(codes::normalize);
    let event_id = payload.event_id.as_deref().map(str::trim);

    let leaving: Vec<VolunteerMembership> = store
        .get_memberships_by_email(&user_id)
        .await?
        .into_iter()
        .filter(|m| match (org_code.as_deref(), event_id) {
            (None, None) => m.delegate_org_code.is_some(),
            (code, event) => {
                code.map_or(true, |c| m.delegate_org_code.as_deref() == Some(c))
                    && event.map_or(true, |e| m.event_id.as_deref() == Some(e))
            }
        })
        .collect();

    if leaving.is_empty() {
        return Err(AppError::not_found(
            "No matching group membership to leave".into(),
        ));
    }

    for membership in &leaving {
        store.delete_membership(&membership.id).await?;
    }
    info!("Volunteer {} left {} membership(s)", user_id, leaving.len());

    Ok(Json(MessageResponse {
        message: "Left group".to_string(),
    }))
}
