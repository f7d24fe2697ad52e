use aws_sdk_sns::types::MessageAttributeValue;
use aws_sdk_sns::Client as SnsClient;
use gather_shared::models::events::{
    AnnouncementKind, EventAnnouncementMessage, EventChangedMessage, MemberJoinedMessage,
    EVENT_ANNOUNCEMENT, EVENT_CHANGED, MEMBER_JOINED,
};
use gather_shared::models::{now_str, Event, Role};
use log::{debug, info};
use serde::Serialize;
use std::collections::HashMap;
use std::env;
use tokio::sync::OnceCell;

use crate::error::{AppError, Result};

static SNS_CLIENT: OnceCell<SnsClient> = OnceCell::const_new();
static TOPIC_ARN: OnceCell<String> = OnceCell::const_new();

fn sns_disabled() -> bool {
    env::var("TEST_SNS").map(|v| v == "true").unwrap_or(false)
}

async fn publish<T: Serialize>(event_type: &str, subject: &str, payload: &T) -> Result<()> {
    if sns_disabled() {
        debug!("Test mode: skipping SNS publish of {}", event_type);
        return Ok(());
    }

    let client = SNS_CLIENT
        .get_or_init(|| async {
            let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
                .load()
                .await;
            SnsClient::new(&config)
        })
        .await
        .clone();

    let topic_arn = TOPIC_ARN
        .get_or_try_init(|| async {
            env::var("SNS_TOPIC_ARN").map_err(|_| {
                AppError::internal_server_error("SNS_TOPIC_ARN environment variable not set".into())
            })
        })
        .await?;

    let message = serde_json::to_string(payload).map_err(|e| {
        AppError::internal_server_error(format!("Failed to serialize event payload: {}", e))
    })?;

    let event_type_attr = MessageAttributeValue::builder()
        .data_type("String")
        .string_value(event_type)
        .build()
        .map_err(|e| {
            AppError::internal_server_error(format!("Failed to build message attribute: {}", e))
        })?;

    let mut message_attributes = HashMap::new();
    message_attributes.insert("eventType".to_string(), event_type_attr);

    client
        .publish()
        .topic_arn(topic_arn)
        .message(message)
        .subject(subject)
        .set_message_attributes(Some(message_attributes))
        .send()
        .await
        .map_err(|e| AppError::internal_server_error(format!("Failed to publish to SNS: {}", e)))?;

    info!("Published {} to SNS", event_type);
    Ok(())
}

/// Builds the change notice for an upsert, or None when neither time nor
/// place moved
pub fn event_changed_message(before: &Event, after: &Event) -> Option<EventChangedMessage> {
    let time_changed = before.start_date != after.start_date || before.end_date != after.end_date;
    let place_changed =
        before.location != after.location || before.location_name != after.location_name;
    if !time_changed && !place_changed {
        return None;
    }

    Some(EventChangedMessage {
        event_type: EVENT_CHANGED.to_string(),
        event_id: after.id.clone(),
        event_name: after.name.clone(),
        old_start_date: time_changed.then(|| before.start_date.to_rfc3339()),
        new_start_date: time_changed.then(|| after.start_date.to_rfc3339()),
        old_end_date: time_changed.then(|| before.end_date.to_rfc3339()),
        new_end_date: time_changed.then(|| after.end_date.to_rfc3339()),
        old_location_name: place_changed.then(|| place_label(before)),
        new_location_name: place_changed.then(|| place_label(after)),
        timestamp: now_str(),
    })
}

fn place_label(event: &Event) -> String {
    event.location_name.clone().unwrap_or_else(|| {
        format!("{:.5}, {:.5}", event.location.lat(), event.location.lng())
    })
}

pub async fn publish_event_changed(message: &EventChangedMessage) -> Result<()> {
    publish(EVENT_CHANGED, "Event Changed", message).await
}

pub async fn publish_announcement(
    event: &Event,
    kind: AnnouncementKind,
    message: &str,
) -> Result<()> {
    let message = EventAnnouncementMessage {
        event_type: EVENT_ANNOUNCEMENT.to_string(),
        event_id: event.id.clone(),
        event_name: event.name.clone(),
        kind,
        message: message.to_string(),
        timestamp: now_str(),
    };
    publish(EVENT_ANNOUNCEMENT, "Event Announcement", &message).await
}

pub async fn publish_member_joined(
    event_id: &str,
    member_email: &str,
    role: Role,
    task_id: Option<&str>,
) -> Result<()> {
    let message = MemberJoinedMessage {
        event_type: MEMBER_JOINED.to_string(),
        event_id: event_id.to_string(),
        member_email: member_email.to_string(),
        role: role.to_string(),
        task_id: task_id.map(str::to_string),
        timestamp: now_str(),
    };
    publish(MEMBER_JOINED, "Member Joined", &message).await
}
