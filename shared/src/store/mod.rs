use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreResult;
use crate::models::{
    DelegateRegistration, Event, PasswordResetToken, Task, User, VolunteerMembership,
};

pub mod dynamo;

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn create_event(&self, event: Event) -> StoreResult<Event>;
    /// Fails with `StoreError::NotFound` for unknown ids
    async fn get_event(&self, id: &str) -> StoreResult<Event>;
    async fn update_event(&self, event: Event) -> StoreResult<Event>;
    async fn get_events_by_creator(&self, creator: &str) -> StoreResult<Vec<Event>>;
    async fn get_event_by_delegate_code(&self, code: &str) -> StoreResult<Option<Event>>;
    async fn get_event_by_volunteer_code(&self, code: &str) -> StoreResult<Option<Event>>;
    /// Events whose start date falls in `[from, to)`
    async fn get_events_starting_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<Event>>;
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn create_task(&self, task: Task) -> StoreResult<Task>;
    async fn get_task(&self, id: &str) -> StoreResult<Task>;
    async fn update_task(&self, task: Task) -> StoreResult<Task>;
    async fn get_tasks_by_event(&self, event_id: &str) -> StoreResult<Vec<Task>>;
    async fn get_task_by_code(&self, code: &str) -> StoreResult<Option<Task>>;
}

#[async_trait]
pub trait DelegateStore: Send + Sync {
    /// Inserts or replaces the registration keyed by email
    async fn save_delegate(&self, delegate: DelegateRegistration) -> StoreResult<DelegateRegistration>;
    async fn get_delegate(&self, email: &str) -> StoreResult<Option<DelegateRegistration>>;
    async fn get_delegate_by_org_code(&self, code: &str)
        -> StoreResult<Option<DelegateRegistration>>;
    async fn get_delegates_by_event(&self, event_id: &str) -> StoreResult<Vec<DelegateRegistration>>;
}

#[async_trait]
pub trait VolunteerStore: Send + Sync {
    /// Inserts or replaces the membership keyed by id
    async fn save_membership(&self, membership: VolunteerMembership)
        -> StoreResult<VolunteerMembership>;
    async fn delete_membership(&self, id: &str) -> StoreResult<()>;
    async fn get_memberships_by_email(&self, email: &str) -> StoreResult<Vec<VolunteerMembership>>;
    async fn get_memberships_by_org_code(&self, code: &str)
        -> StoreResult<Vec<VolunteerMembership>>;
    async fn get_memberships_by_event(&self, event_id: &str)
        -> StoreResult<Vec<VolunteerMembership>>;
    async fn get_memberships_by_task(&self, task_id: &str) -> StoreResult<Vec<VolunteerMembership>>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `StoreError::AlreadyExists` when the email is taken
    async fn create_user(&self, user: User) -> StoreResult<User>;
    async fn get_user(&self, email: &str) -> StoreResult<Option<User>>;
    async fn update_user(&self, user: User) -> StoreResult<User>;
    async fn save_reset_token(&self, token: PasswordResetToken) -> StoreResult<()>;
    /// Removes and returns the token, so it can only be redeemed once
    async fn take_reset_token(&self, token: &str) -> StoreResult<Option<PasswordResetToken>>;
}

/// Everything the event service reads and writes
pub trait MembershipStore: EventStore + TaskStore + DelegateStore + VolunteerStore + UserStore {}

impl<T> MembershipStore for T where
    T: EventStore + TaskStore + DelegateStore + VolunteerStore + UserStore
{
}

/// Delegates and volunteers of an event, deduplicated and sorted
pub async fn event_member_emails<S>(store: &S, event_id: &str) -> StoreResult<Vec<String>>
where
    S: DelegateStore + VolunteerStore + ?Sized,
{
    let mut emails: Vec<String> = store
        .get_delegates_by_event(event_id)
        .await?
        .into_iter()
        .map(|d| d.email)
        .chain(
            store
                .get_memberships_by_event(event_id)
                .await?
                .into_iter()
                .map(|m| m.email),
        )
        .collect();
    emails.sort();
    emails.dedup();
    Ok(emails)
}
