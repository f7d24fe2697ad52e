use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::operation::put_item::PutItemError;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};
use aws_sdk_dynamodb::Client;
use chrono::{DateTime, Utc};
use log::{debug, error, info};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_dynamo::aws_sdk_dynamodb_1::{from_item, from_items, to_item};
use std::collections::HashMap;

use super::{DelegateStore, EventStore, TaskStore, UserStore, VolunteerStore};
use crate::config::{TableNames, SETTINGS};
use crate::error::{StoreError, StoreResult};
use crate::models::{
    DelegateRegistration, Event, PasswordResetToken, Task, User, VolunteerMembership,
};

type Item = HashMap<String, AttributeValue>;

// Global secondary indexes, named after their partition key
const CREATED_BY_INDEX: &str = "created_by-index";
const DELEGATE_JOIN_CODE_INDEX: &str = "delegate_join_code-index";
const VOLUNTEER_JOIN_CODE_INDEX: &str = "volunteer_join_code-index";
const EVENT_ID_INDEX: &str = "event_id-index";
const TASK_JOIN_CODE_INDEX: &str = "task_join_code-index";
const DELEGATE_ORG_CODE_INDEX: &str = "delegate_org_code-index";
const EMAIL_INDEX: &str = "email-index";
const TASK_ID_INDEX: &str = "task_id-index";

/// DynamoDB backed implementation of every store trait.
///
/// Events and tasks are keyed by `_id`, delegates and users by `email`,
/// memberships by `id`, reset tokens by `token`.
#[derive(Clone)]
pub struct DynamoStore {
    client: Client,
    tables: TableNames,
}

impl DynamoStore {
    pub async fn new() -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest()).load().await;
        let mut builder = aws_sdk_dynamodb::config::Builder::from(&config);
        if let Ok(endpoint) = std::env::var("DYNAMODB_ENDPOINT") {
            info!("Using DynamoDB endpoint override: {}", endpoint);
            builder = builder.endpoint_url(endpoint);
        }
        Self::with_client_and_tables(Client::from_conf(builder.build()), SETTINGS.tables.clone())
    }

    pub fn with_client_and_tables(client: Client, tables: TableNames) -> Self {
        Self { client, tables }
    }

    async fn get_item<T: DeserializeOwned>(
        &self,
        table: &str,
        key_name: &str,
        key: &str,
    ) -> StoreResult<Option<T>> {
        let output = self
            .client
            .get_item()
            .table_name(table)
            .key(key_name, AttributeValue::S(key.to_string()))
            .send()
            .await
            .map_err(|e| {
                error!("GetItem on {} failed: {}", table, DisplayErrorContext(&e));
                StoreError::Database(format!("Failed to read from {}", table))
            })?;

        match output.item {
            Some(item) => Ok(Some(from_item(item)?)),
            None => Ok(None),
        }
    }

    /// Unconditional put, or a conditional one failing with `on_conflict`
    async fn put_item<T: Serialize>(
        &self,
        table: &str,
        value: &T,
        condition: Option<(&str, &str, &str)>,
        on_conflict: impl FnOnce() -> StoreError,
    ) -> StoreResult<()> {
        let item: Item = to_item(value)?;
        let mut request = self.client.put_item().table_name(table).set_item(Some(item));
        if let Some((expression, placeholder, attribute)) = condition {
            request = request
                .condition_expression(expression)
                .expression_attribute_names(placeholder, attribute);
        }

        match request.send().await {
            Ok(_) => Ok(()),
            Err(e) => {
                if matches!(
                    e.as_service_error(),
                    Some(PutItemError::ConditionalCheckFailedException(_))
                ) {
                    return Err(on_conflict());
                }
                error!("PutItem on {} failed: {}", table, DisplayErrorContext(&e));
                Err(StoreError::Database(format!("Failed to write to {}", table)))
            }
        }
    }

    async fn query_index<T: DeserializeOwned>(
        &self,
        table: &str,
        index: &str,
        attribute: &str,
        value: &str,
    ) -> StoreResult<Vec<T>> {
        let mut items: Vec<Item> = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let output = self
                .client
                .query()
                .table_name(table)
                .index_name(index)
                .key_condition_expression("#k = :v")
                .expression_attribute_names("#k", attribute)
                .expression_attribute_values(":v", AttributeValue::S(value.to_string()))
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| {
                    error!("Query on {}/{} failed: {}", table, index, DisplayErrorContext(&e));
                    StoreError::Database(format!("Failed to query {}", index))
                })?;

            if let Some(page) = output.items {
                items.extend(page);
            }
            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        debug!("Query {}/{} returned {} items", table, index, items.len());
        Ok(from_items(items)?)
    }

    async fn query_one<T: DeserializeOwned>(
        &self,
        table: &str,
        index: &str,
        attribute: &str,
        value: &str,
    ) -> StoreResult<Option<T>> {
        let mut found: Vec<T> = self.query_index(table, index, attribute, value).await?;
        Ok(if found.is_empty() {
            None
        } else {
            Some(found.swap_remove(0))
        })
    }

    async fn scan_all<T: DeserializeOwned>(&self, table: &str) -> StoreResult<Vec<T>> {
        let mut items: Vec<Item> = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let output = self
                .client
                .scan()
                .table_name(table)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| {
                    error!("Scan on {} failed: {}", table, DisplayErrorContext(&e));
                    StoreError::Database(format!("Failed to scan {}", table))
                })?;

            if let Some(page) = output.items {
                items.extend(page);
            }
            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        Ok(from_items(items)?)
    }

    async fn delete_item(&self, table: &str, key_name: &str, key: &str) -> StoreResult<Option<Item>> {
        let output = self
            .client
            .delete_item()
            .table_name(table)
            .key(key_name, AttributeValue::S(key.to_string()))
            .return_values(ReturnValue::AllOld)
            .send()
            .await
            .map_err(|e| {
                error!("DeleteItem on {} failed: {}", table, DisplayErrorContext(&e));
                StoreError::Database(format!("Failed to delete from {}", table))
            })?;
        Ok(output.attributes.filter(|attributes| !attributes.is_empty()))
    }
}

#[async_trait]
impl EventStore for DynamoStore {
    async fn create_event(&self, event: Event) -> StoreResult<Event> {
        let id = event.id.clone();
        self.put_item(
            &self.tables.events,
            &event,
            Some(("attribute_not_exists(#id)", "#id", "_id")),
            || StoreError::AlreadyExists(format!("Event {} already exists", id)),
        )
        .await?;
        Ok(event)
    }

    async fn get_event(&self, id: &str) -> StoreResult<Event> {
        self.get_item(&self.tables.events, "_id", id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("Event {} not found", id)))
    }

    async fn update_event(&self, event: Event) -> StoreResult<Event> {
        let id = event.id.clone();
        self.put_item(
            &self.tables.events,
            &event,
            Some(("attribute_exists(#id)", "#id", "_id")),
            || StoreError::NotFound(format!("Event {} not found", id)),
        )
        .await?;
        Ok(event)
    }

    async fn get_events_by_creator(&self, creator: &str) -> StoreResult<Vec<Event>> {
        self.query_index(&self.tables.events, CREATED_BY_INDEX, "created_by", creator)
            .await
    }

    async fn get_event_by_delegate_code(&self, code: &str) -> StoreResult<Option<Event>> {
        self.query_one(
            &self.tables.events,
            DELEGATE_JOIN_CODE_INDEX,
            "delegate_join_code",
            code,
        )
        .await
    }

    async fn get_event_by_volunteer_code(&self, code: &str) -> StoreResult<Option<Event>> {
        self.query_one(
            &self.tables.events,
            VOLUNTEER_JOIN_CODE_INDEX,
            "volunteer_join_code",
            code,
        )
        .await
    }

    async fn get_events_starting_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<Event>> {
        let events: Vec<Event> = self.scan_all(&self.tables.events).await?;
        Ok(events
            .into_iter()
            .filter(|e| e.start_date >= from && e.start_date < to)
            .collect())
    }
}

#[async_trait]
impl TaskStore for DynamoStore {
    async fn create_task(&self, task: Task) -> StoreResult<Task> {
        let id = task.id.clone();
        self.put_item(
            &self.tables.tasks,
            &task,
            Some(("attribute_not_exists(#id)", "#id", "_id")),
            || StoreError::AlreadyExists(format!("Task {} already exists", id)),
        )
        .await?;
        Ok(task)
    }

    async fn get_task(&self, id: &str) -> StoreResult<Task> {
        self.get_item(&self.tables.tasks, "_id", id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("Task {} not found", id)))
    }

    async fn update_task(&self, task: Task) -> StoreResult<Task> {
        let id = task.id.clone();
        self.put_item(
            &self.tables.tasks,
            &task,
            Some(("attribute_exists(#id)", "#id", "_id")),
            || StoreError::NotFound(format!("Task {} not found", id)),
        )
        .await?;
        Ok(task)
    }

    async fn get_tasks_by_event(&self, event_id: &str) -> StoreResult<Vec<Task>> {
        self.query_index(&self.tables.tasks, EVENT_ID_INDEX, "event_id", event_id)
            .await
    }

    async fn get_task_by_code(&self, code: &str) -> StoreResult<Option<Task>> {
        self.query_one(&self.tables.tasks, TASK_JOIN_CODE_INDEX, "task_join_code", code)
            .await
    }
}

#[async_trait]
impl DelegateStore for DynamoStore {
    async fn save_delegate(
        &self,
        delegate: DelegateRegistration,
    ) -> StoreResult<DelegateRegistration> {
        self.put_item(&self.tables.delegates, &delegate, None, || {
            StoreError::Database("unconditional put".into())
        })
        .await?;
        Ok(delegate)
    }

    async fn get_delegate(&self, email: &str) -> StoreResult<Option<DelegateRegistration>> {
        self.get_item(&self.tables.delegates, "email", email).await
    }

    async fn get_delegate_by_org_code(
        &self,
        code: &str,
    ) -> StoreResult<Option<DelegateRegistration>> {
        self.query_one(
            &self.tables.delegates,
            DELEGATE_ORG_CODE_INDEX,
            "delegate_org_code",
            code,
        )
        .await
    }

    async fn get_delegates_by_event(
        &self,
        event_id: &str,
    ) -> StoreResult<Vec<DelegateRegistration>> {
        self.query_index(&self.tables.delegates, EVENT_ID_INDEX, "event_id", event_id)
            .await
    }
}

#[async_trait]
impl VolunteerStore for DynamoStore {
    async fn save_membership(
        &self,
        membership: VolunteerMembership,
    ) -> StoreResult<VolunteerMembership> {
        self.put_item(&self.tables.volunteers, &membership, None, || {
            StoreError::Database("unconditional put".into())
        })
        .await?;
        Ok(membership)
    }

    async fn delete_membership(&self, id: &str) -> StoreResult<()> {
        self.delete_item(&self.tables.volunteers, "id", id)
            .await?
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("Membership {} not found", id)))
    }

    async fn get_memberships_by_email(&self, email: &str) -> StoreResult<Vec<VolunteerMembership>> {
        self.query_index(&self.tables.volunteers, EMAIL_INDEX, "email", email)
            .await
    }

    async fn get_memberships_by_org_code(
        &self,
        code: &str,
    ) -> StoreResult<Vec<VolunteerMembership>> {
        self.query_index(
            &self.tables.volunteers,
            DELEGATE_ORG_CODE_INDEX,
            "delegate_org_code",
            code,
        )
        .await
    }

    async fn get_memberships_by_event(
        &self,
        event_id: &str,
    ) -> StoreResult<Vec<VolunteerMembership>> {
        self.query_index(&self.tables.volunteers, EVENT_ID_INDEX, "event_id", event_id)
            .await
    }

    async fn get_memberships_by_task(&self, task_id: &str) -> StoreResult<Vec<VolunteerMembership>> {
        self.query_index(&self.tables.volunteers, TASK_ID_INDEX, "task_id", task_id)
            .await
    }
}

#[async_trait]
impl UserStore for DynamoStore {
    async fn create_user(&self, user: User) -> StoreResult<User> {
        let email = user.email.clone();
        self.put_item(
            &self.tables.users,
            &user,
            Some(("attribute_not_exists(#email)", "#email", "email")),
            || StoreError::AlreadyExists(format!("User {} already exists", email)),
        )
        .await?;
        Ok(user)
    }

    async fn get_user(&self, email: &str) -> StoreResult<Option<User>> {
        self.get_item(&self.tables.users, "email", email).await
    }

    async fn update_user(&self, user: User) -> StoreResult<User> {
        let email = user.email.clone();
        self.put_item(
            &self.tables.users,
            &user,
            Some(("attribute_exists(#email)", "#email", "email")),
            || StoreError::NotFound(format!("User {} not found", email)),
        )
        .await?;
        Ok(user)
    }

    async fn save_reset_token(&self, token: PasswordResetToken) -> StoreResult<()> {
        self.put_item(&self.tables.reset_tokens, &token, None, || {
            StoreError::Database("unconditional put".into())
        })
        .await
    }

    async fn take_reset_token(&self, token: &str) -> StoreResult<Option<PasswordResetToken>> {
        match self.delete_item(&self.tables.reset_tokens, "token", token).await? {
            Some(item) => Ok(Some(from_item(item)?)),
            None => Ok(None),
        }
    }
}
