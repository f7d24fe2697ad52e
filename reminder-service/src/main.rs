use aws_lambda_events::event::cloudwatch_events::CloudWatchEvent;
use chrono::{DateTime, Duration, Utc};
use gather_shared::mailer::{reminder_email, Mailer};
use gather_shared::models::Event;
use gather_shared::store::dynamo::DynamoStore;
use gather_shared::store::{event_member_emails, MembershipStore};
use lambda_runtime::{service_fn, Error, LambdaEvent};
use log::{error, info, warn};
use std::sync::Arc;

/// Events starting within this many hours get their reminder
const REMINDER_WINDOW_HOURS: i64 = 24;

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("Starting Reminder Service Lambda");

    let store = Arc::new(DynamoStore::new().await);
    let mailer = Arc::new(Mailer::from_env());

    lambda_runtime::run(service_fn(|event| {
        handler(event, store.clone(), mailer.clone())
    }))
    .await?;

    Ok(())
}

async fn handler(
    _event: LambdaEvent<CloudWatchEvent>,
    store: Arc<DynamoStore>,
    mailer: Arc<Mailer>,
) -> Result<(), Error> {
    info!("Reminder service triggered");

    let reminded = send_due_reminders(&*store, &mailer, Utc::now())
        .await
        .map_err(|e| Error::from(format!("Failed to send reminders: {}", e)))?;

    info!("Reminder service completed. Reminded {} events", reminded);
    Ok(())
}

/// Emails every participant of each event starting within the window and
/// marks the event so later runs skip it. Returns how many events were
/// reminded.
async fn send_due_reminders<S: MembershipStore>(
    store: &S,
    mailer: &Mailer,
    now: DateTime<Utc>,
) -> Result<usize, String> {
    let events = store
        .get_events_starting_between(now, now + Duration::hours(REMINDER_WINDOW_HOURS))
        .await
        .map_err(|e| format!("Failed to scan upcoming events: {:?}", e))?;

    let due: Vec<Event> = events
        .into_iter()
        .filter(|e| e.reminder_sent_at.is_none())
        .collect();
    info!("Found {} events due a reminder", due.len());

    let mut reminded = 0;
    for event in due {
        let event_id = event.id.clone();
        if let Err(e) = remind_event(store, mailer, event, now).await {
            error!("Failed to remind event {}: {}", event_id, e);
            // Continue with the other events
        } else {
            reminded += 1;
        }
    }

    Ok(reminded)
}

async fn remind_event<S: MembershipStore>(
    store: &S,
    mailer: &Mailer,
    mut event: Event,
    now: DateTime<Utc>,
) -> Result<(), String> {
    let mut recipients = event_member_emails(store, &event.id)
        .await
        .map_err(|e| format!("Failed to look up members: {:?}", e))?;
    if !recipients.contains(&event.created_by) {
        recipients.push(event.created_by.clone());
    }

    let start = event.start_date.format("%Y-%m-%d %H:%M UTC").to_string();
    let sent = mailer
        .send_all(&recipients, &reminder_email(&event.name, &start))
        .await;
    if sent < recipients.len() {
        warn!(
            "Reminder for event {} reached {} of {} recipients",
            event.id,
            sent,
            recipients.len()
        );
    }

    event.reminder_sent_at = Some(now.to_rfc3339());
    store
        .update_event(event)
        .await
        .map_err(|e| format!("Failed to mark reminder as sent: {:?}", e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gather_shared::config::{MailProvider, MailSettings};
    use gather_shared::models::{GeoPoint, VolunteerMembership};
    use gather_shared::store::{EventStore, VolunteerStore};
    use gather_shared::test_utils::mock_store::MockStore;

    fn log_mailer() -> Mailer {
        Mailer::new(MailSettings {
            provider: MailProvider::Log,
            from: None,
            sendgrid_api_key: None,
            sendgrid_url: String::new(),
            debug_fallback: true,
        })
    }

    fn event(id: &str, starts_in: Duration) -> Event {
        let start = Utc::now() + starts_in;
        Event {
            id: id.into(),
            name: format!("Event {}", id),
            description: String::new(),
            location: GeoPoint::new(2.35, 48.85),
            location_name: None,
            start_date: start,
            end_date: start + Duration::hours(2),
            delegate_join_code: format!("D{}", id),
            volunteer_join_code: format!("V{}", id),
            created_by: "org@gather.test".into(),
            created_at: Utc::now().to_rfc3339(),
            updated_at: Utc::now().to_rfc3339(),
            reminder_sent_at: None,
        }
    }

    #[tokio::test]
    async fn test_only_events_inside_window_are_reminded_once() {
        let store = MockStore::new();
        store.create_event(event("1", Duration::hours(3))).await.unwrap();
        store.create_event(event("2", Duration::hours(30))).await.unwrap();
        store.create_event(event("3", Duration::hours(-3))).await.unwrap();
        store
            .save_membership(VolunteerMembership {
                id: "m-1".into(),
                email: "vol@gather.test".into(),
                delegate_org_code: None,
                event_id: Some("1".into()),
                task_id: None,
                joined_at: Utc::now().to_rfc3339(),
            })
            .await
            .unwrap();
        let mailer = log_mailer();
        let now = Utc::now();

        assert_eq!(send_due_reminders(&store, &mailer, now).await.unwrap(), 1);
        assert!(store.get_event("1").await.unwrap().reminder_sent_at.is_some());
        assert!(store.get_event("2").await.unwrap().reminder_sent_at.is_none());
        assert!(store.get_event("3").await.unwrap().reminder_sent_at.is_none());

        // A second run finds nothing left to do
        assert_eq!(send_due_reminders(&store, &mailer, now).await.unwrap(), 0);
    }
}
