use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{StoreError, StoreResult};
use crate::models::{
    DelegateRegistration, Event, PasswordResetToken, Task, User, VolunteerMembership,
};
use crate::store::{DelegateStore, EventStore, TaskStore, UserStore, VolunteerStore};

/// In-memory store implementing every store trait, used by router tests
#[derive(Default)]
pub struct MockStore {
    events: Mutex<HashMap<String, Event>>,
    tasks: Mutex<HashMap<String, Task>>,
    delegates: Mutex<HashMap<String, DelegateRegistration>>,
    memberships: Mutex<HashMap<String, VolunteerMembership>>,
    users: Mutex<HashMap<String, User>>,
    reset_tokens: Mutex<HashMap<String, PasswordResetToken>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn event_count(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn membership_count(&self) -> usize {
        self.memberships.lock().unwrap().len()
    }

    /// The outstanding reset token issued to `email`, if any
    pub fn reset_token_for(&self, email: &str) -> Option<String> {
        self.reset_tokens
            .lock()
            .unwrap()
            .values()
            .find(|t| t.email == email)
            .map(|t| t.token.clone())
    }
}

fn filter_memberships<F>(store: &MockStore, pred: F) -> Vec<VolunteerMembership>
where
    F: Fn(&VolunteerMembership) -> bool,
{
    let mut found: Vec<VolunteerMembership> = store
        .memberships
        .lock()
        .unwrap()
        .values()
        .filter(|m| pred(m))
        .cloned()
        .collect();
    found.sort_by(|a, b| a.joined_at.cmp(&b.joined_at).then(a.id.cmp(&b.id)));
    found
}

#[async_trait]
impl EventStore for MockStore {
    async fn create_event(&self, event: Event) -> StoreResult<Event> {
        let mut events = self.events.lock().unwrap();
        if events.contains_key(&event.id) {
            return Err(StoreError::AlreadyExists(format!("Event {} already exists", event.id)));
        }
        events.insert(event.id.clone(), event.clone());
        Ok(event)
    }

    async fn get_event(&self, id: &str) -> StoreResult<Event> {
        self.events
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("Event {} not found", id)))
    }

    async fn update_event(&self, event: Event) -> StoreResult<Event> {
        let mut events = self.events.lock().unwrap();
        if !events.contains_key(&event.id) {
            return Err(StoreError::NotFound(format!("Event {} not found", event.id)));
        }
        events.insert(event.id.clone(), event.clone());
        Ok(event)
    }

    async fn get_events_by_creator(&self, creator: &str) -> StoreResult<Vec<Event>> {
        let mut found: Vec<Event> = self
            .events
            .lock()
            .unwrap()
            .values()
            .filter(|e| e.created_by == creator)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.start_date.cmp(&b.start_date));
        Ok(found)
    }

    async fn get_event_by_delegate_code(&self, code: &str) -> StoreResult<Option<Event>> {
        Ok(self
            .events
            .lock()
            .unwrap()
            .values()
            .find(|e| e.delegate_join_code == code)
            .cloned())
    }

    async fn get_event_by_volunteer_code(&self, code: &str) -> StoreResult<Option<Event>> {
        Ok(self
            .events
            .lock()
            .unwrap()
            .values()
            .find(|e| e.volunteer_join_code == code)
            .cloned())
    }

    async fn get_events_starting_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<Event>> {
        Ok(self
            .events
            .lock()
            .unwrap()
            .values()
            .filter(|e| e.start_date >= from && e.start_date < to)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl TaskStore for MockStore {
    async fn create_task(&self, task: Task) -> StoreResult<Task> {
        let mut tasks = self.tasks.lock().unwrap();
        if tasks.contains_key(&task.id) {
            return Err(StoreError::AlreadyExists(format!("Task {} already exists", task.id)));
        }
        tasks.insert(task.id.clone(), task.clone());
        Ok(task)
    }

    async fn get_task(&self, id: &str) -> StoreResult<Task> {
        self.tasks
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("Task {} not found", id)))
    }

    async fn update_task(&self, task: Task) -> StoreResult<Task> {
        let mut tasks = self.tasks.lock().unwrap();
        if !tasks.contains_key(&task.id) {
            return Err(StoreError::NotFound(format!("Task {} not found", task.id)));
        }
        tasks.insert(task.id.clone(), task.clone());
        Ok(task)
    }

    async fn get_tasks_by_event(&self, event_id: &str) -> StoreResult<Vec<Task>> {
        let mut found: Vec<Task> = self
            .tasks
            .lock()
            .unwrap()
            .values()
            .filter(|t| t.event_id == event_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(found)
    }

    async fn get_task_by_code(&self, code: &str) -> StoreResult<Option<Task>> {
        Ok(self
            .tasks
            .lock()
            .unwrap()
            .values()
            .find(|t| t.task_join_code == code)
            .cloned())
    }
}

#[async_trait]
impl DelegateStore for MockStore {
    async fn save_delegate(
        &self,
        delegate: DelegateRegistration,
    ) -> StoreResult<DelegateRegistration> {
        self.delegates
            .lock()
            .unwrap()
            .insert(delegate.email.clone(), delegate.clone());
        Ok(delegate)
    }

    async fn get_delegate(&self, email: &str) -> StoreResult<Option<DelegateRegistration>> {
        Ok(self.delegates.lock().unwrap().get(email).cloned())
    }

    async fn get_delegate_by_org_code(
        &self,
        code: &str,
    ) -> StoreResult<Option<DelegateRegistration>> {
        Ok(self
            .delegates
            .lock()
            .unwrap()
            .values()
            .find(|d| d.delegate_org_code == code)
            .cloned())
    }

    async fn get_delegates_by_event(
        &self,
        event_id: &str,
    ) -> StoreResult<Vec<DelegateRegistration>> {
        let mut found: Vec<DelegateRegistration> = self
            .delegates
            .lock()
            .unwrap()
            .values()
            .filter(|d| d.event_id.as_deref() == Some(event_id))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(found)
    }
}

#[async_trait]
impl VolunteerStore for MockStore {
    async fn save_membership(
        &self,
        membership: VolunteerMembership,
    ) -> StoreResult<VolunteerMembership> {
        self.memberships
            .lock()
            .unwrap()
            .insert(membership.id.clone(), membership.clone());
        Ok(membership)
    }

    async fn delete_membership(&self, id: &str) -> StoreResult<()> {
        self.memberships
            .lock()
            .unwrap()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("Membership {} not found", id)))
    }

    async fn get_memberships_by_email(&self, email: &str) -> StoreResult<Vec<VolunteerMembership>> {
        Ok(filter_memberships(self, |m| m.email == email))
    }

    async fn get_memberships_by_org_code(
        &self,
        code: &str,
    ) -> StoreResult<Vec<VolunteerMembership>> {
        Ok(filter_memberships(self, |m| {
            m.delegate_org_code.as_deref() == Some(code)
        }))
    }

    async fn get_memberships_by_event(
        &self,
        event_id: &str,
    ) -> StoreResult<Vec<VolunteerMembership>> {
        Ok(filter_memberships(self, |m| m.event_id.as_deref() == Some(event_id)))
    }

    async fn get_memberships_by_task(&self, task_id: &str) -> StoreResult<Vec<VolunteerMembership>> {
        Ok(filter_memberships(self, |m| m.task_id.as_deref() == Some(task_id)))
    }
}

#[async_trait]
impl UserStore for MockStore {
    async fn create_user(&self, user: User) -> StoreResult<User> {
        let mut users = self.users.lock().unwrap();
        if users.contains_key(&user.email) {
            return Err(StoreError::AlreadyExists(format!("User {} already exists", user.email)));
        }
        users.insert(user.email.clone(), user.clone());
        Ok(user)
    }

    async fn get_user(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.users.lock().unwrap().get(email).cloned())
    }

    async fn update_user(&self, user: User) -> StoreResult<User> {
        let mut users = self.users.lock().unwrap();
        if !users.contains_key(&user.email) {
            return Err(StoreError::NotFound(format!("User {} not found", user.email)));
        }
        users.insert(user.email.clone(), user.clone());
        Ok(user)
    }

    async fn save_reset_token(&self, token: PasswordResetToken) -> StoreResult<()> {
        self.reset_tokens
            .lock()
            .unwrap()
            .insert(token.token.clone(), token);
        Ok(())
    }

    async fn take_reset_token(&self, token: &str) -> StoreResult<Option<PasswordResetToken>> {
        Ok(self.reset_tokens.lock().unwrap().remove(token))
    }
}
