//! Turns event-service SNS messages into emails.

use anyhow::Context;
use chrono::{DateTime, Utc};
use gather_shared::mailer::{
    address_change_email, attendance_change_email, end_time_change_email, requirements_email,
    time_change_email, tip_email, welcome_email, Email, Mailer,
};
use gather_shared::models::events::{
    AnnouncementKind, EventAnnouncementMessage, EventChangedMessage, MemberJoinedMessage,
    MessageKind, EVENT_ANNOUNCEMENT, EVENT_CHANGED, MEMBER_JOINED,
};
use gather_shared::store::{event_member_emails, MembershipStore};
use log::{info, warn};

use crate::errors::NotificationError;

/// RFC 3339 timestamps render as `2026-05-01 09:30 UTC`; anything else is
/// shown as given
pub fn display_time(raw: &str) -> String {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => dt.with_timezone(&Utc).format("%Y-%m-%d %H:%M UTC").to_string(),
        Err(_) => raw.to_string(),
    }
}

fn moved<'a>(old: &'a Option<String>, new: &'a Option<String>) -> Option<(&'a str, &'a str)> {
    match (old.as_deref(), new.as_deref()) {
        (Some(old), Some(new)) if old != new => Some((old, new)),
        _ => None,
    }
}

/// The emails an `event_changed` message calls for
pub fn change_emails(message: &EventChangedMessage) -> Vec<Email> {
    let mut emails = Vec::new();
    let start = moved(&message.old_start_date, &message.new_start_date);
    let end = moved(&message.old_end_date, &message.new_end_date);
    match (start, end) {
        (Some((old_start, new_start)), Some((old_end, new_end))) => {
            emails.push(time_change_email(
                &message.event_name,
                &format!("{} until {}", display_time(old_start), display_time(old_end)),
                &format!("{} until {}", display_time(new_start), display_time(new_end)),
            ))
        }
        (Some((old, new)), None) => emails.push(time_change_email(
            &message.event_name,
            &display_time(old),
            &display_time(new),
        )),
        (None, Some((old, new))) => emails.push(end_time_change_email(
            &message.event_name,
            &display_time(old),
            &display_time(new),
        )),
        (None, None) => {}
    }
    if let (Some(old), Some(new)) = (&message.old_location_name, &message.new_location_name) {
        emails.push(address_change_email(&message.event_name, old, new));
    }
    emails
}

async fn send_to_all(
    mailer: &Mailer,
    recipients: &[String],
    email: &Email,
) -> Result<usize, NotificationError> {
    let sent = mailer.send_all(recipients, email).await;
    if sent == 0 && !recipients.is_empty() {
        return Err(NotificationError::SendFailed(format!(
            "'{}' reached none of {} recipients",
            email.subject,
            recipients.len()
        )));
    }
    Ok(sent)
}

async fn handle_event_changed<S: MembershipStore>(
    store: &S,
    mailer: &Mailer,
    message: &EventChangedMessage,
) -> Result<usize, NotificationError> {
    let recipients = event_member_emails(store, &message.event_id).await?;
    if recipients.is_empty() {
        info!("No members to notify for event_id={}", message.event_id);
        return Ok(0);
    }

    let mut sent = 0;
    for email in change_emails(message) {
        sent += send_to_all(mailer, &recipients, &email).await?;
    }
    info!(
        "Sent {} change notices for event_id={} to {} members",
        sent,
        message.event_id,
        recipients.len()
    );
    Ok(sent)
}

pub fn announcement_email(message: &EventAnnouncementMessage) -> Email {
    match message.kind {
        AnnouncementKind::Tip => tip_email(&message.event_name, &message.message),
        AnnouncementKind::Requirements => requirements_email(&message.event_name, &message.message),
        AnnouncementKind::Attendance => {
            attendance_change_email(&message.event_name, &message.message)
        }
    }
}

async fn handle_announcement<S: MembershipStore>(
    store: &S,
    mailer: &Mailer,
    message: &EventAnnouncementMessage,
) -> Result<usize, NotificationError> {
    let recipients = event_member_emails(store, &message.event_id).await?;
    if recipients.is_empty() {
        info!("No members to announce to for event_id={}", message.event_id);
        return Ok(0);
    }

    let sent = send_to_all(mailer, &recipients, &announcement_email(message)).await?;
    info!(
        "Sent {:?} announcement for event_id={} to {} members",
        message.kind, message.event_id, sent
    );
    Ok(sent)
}

async fn handle_member_joined<S: MembershipStore>(
    store: &S,
    mailer: &Mailer,
    message: &MemberJoinedMessage,
) -> Result<usize, NotificationError> {
    let event = store.get_event(&message.event_id).await?;
    let host = match store.get_user(&event.created_by).await? {
        Some(user) if !user.first_name.is_empty() => {
            format!("{} {}", user.first_name, user.last_name).trim().to_string()
        }
        _ => event.created_by.clone(),
    };

    let recipients = vec![message.member_email.clone()];
    send_to_all(mailer, &recipients, &welcome_email(&event.name, &host)).await
}

/// Handles one raw SNS message body and returns how many emails went out
pub async fn process_message<S: MembershipStore>(
    store: &S,
    mailer: &Mailer,
    raw: &str,
) -> anyhow::Result<usize> {
    let kind: MessageKind =
        serde_json::from_str(raw).context("SNS message has no event_type")?;

    match kind.event_type.as_str() {
        EVENT_CHANGED => {
            let message: EventChangedMessage =
                serde_json::from_str(raw).context("Malformed event_changed message")?;
            Ok(handle_event_changed(store, mailer, &message).await?)
        }
        MEMBER_JOINED => {
            let message: MemberJoinedMessage =
                serde_json::from_str(raw).context("Malformed member_joined message")?;
            Ok(handle_member_joined(store, mailer, &message).await?)
        }
        EVENT_ANNOUNCEMENT => {
            let message: EventAnnouncementMessage =
                serde_json::from_str(raw).context("Malformed event_announcement message")?;
            Ok(handle_announcement(store, mailer, &message).await?)
        }
        other => {
            warn!("Unexpected event type: {}", other);
            Err(NotificationError::UnsupportedType(other.to_string()).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use gather_shared::config::{MailProvider, MailSettings};
    use gather_shared::models::{
        DelegateRegistration, Event, GeoPoint, User, VolunteerMembership,
    };
    use gather_shared::store::{DelegateStore, EventStore, UserStore, VolunteerStore};
    use gather_shared::test_utils::mock_store::MockStore;
    use gather_shared::test_utils::test_logging::init_test_logging;
    use mockito::Matcher;
    use serde_json::json;

    fn sendgrid_mailer(url: String) -> Mailer {
        Mailer::new(MailSettings {
            provider: MailProvider::SendGrid,
            from: Some("noreply@gather.test".to_string()),
            sendgrid_api_key: Some("test-key".to_string()),
            sendgrid_url: url,
            debug_fallback: false,
        })
    }

    async fn seeded_store() -> MockStore {
        let store = MockStore::new();
        let start = Utc::now() + Duration::days(2);
        store
            .create_event(Event {
                id: "event-1".into(),
                name: "Harbour cleanup".into(),
                description: String::new(),
                location: GeoPoint::new(-1.4, 50.9),
                location_name: Some("Town Quay".into()),
                start_date: start,
                end_date: start + Duration::hours(3),
                delegate_join_code: "DEL001".into(),
                volunteer_join_code: "VOL001".into(),
                created_by: "org@gather.test".into(),
                created_at: Utc::now().to_rfc3339(),
                updated_at: Utc::now().to_rfc3339(),
                reminder_sent_at: None,
            })
            .await
            .unwrap();
        store
            .create_user(User {
                id: "user-1".into(),
                first_name: "Grace".into(),
                last_name: "Hopper".into(),
                email: "org@gather.test".into(),
                hashed_password: String::new(),
                created_at: Utc::now().to_rfc3339(),
            })
            .await
            .unwrap();
        store
            .save_delegate(DelegateRegistration {
                email: "delegate@gather.test".into(),
                organization: "Sea Scouts".into(),
                delegate_org_code: "ORG001".into(),
                event_id: Some("event-1".into()),
                created_at: Utc::now().to_rfc3339(),
            })
            .await
            .unwrap();
        for (id, email) in [("m-1", "vol@gather.test"), ("m-2", "delegate@gather.test")] {
            store
                .save_membership(VolunteerMembership {
                    id: id.into(),
                    email: email.into(),
                    delegate_org_code: None,
                    event_id: Some("event-1".into()),
                    task_id: None,
                    joined_at: Utc::now().to_rfc3339(),
                })
                .await
                .unwrap();
        }
        store
    }

    #[test]
    fn change_emails_follow_what_moved() {
        let mut message = EventChangedMessage {
            event_type: EVENT_CHANGED.into(),
            event_id: "event-1".into(),
            event_name: "Harbour cleanup".into(),
            old_start_date: Some("2026-05-01T09:30:00+00:00".into()),
            new_start_date: Some("2026-05-02T10:00:00+00:00".into()),
            old_end_date: Some("2026-05-01T12:30:00+00:00".into()),
            new_end_date: Some("2026-05-01T12:30:00+00:00".into()),
            old_location_name: None,
            new_location_name: None,
            timestamp: Utc::now().to_rfc3339(),
        };
        let emails = change_emails(&message);
        assert_eq!(emails.len(), 1);
        assert!(emails[0].body.contains("2026-05-01 09:30 UTC"));
        assert!(emails[0].body.contains("2026-05-02 10:00 UTC"));

        message.old_location_name = Some("Town Quay".into());
        message.new_location_name = Some("Ocean Village".into());
        assert_eq!(change_emails(&message).len(), 2);
    }

    #[test]
    fn end_only_change_names_the_new_end() {
        let message = EventChangedMessage {
            event_type: EVENT_CHANGED.into(),
            event_id: "event-1".into(),
            event_name: "Harbour cleanup".into(),
            old_start_date: Some("2026-05-01T09:30:00+00:00".into()),
            new_start_date: Some("2026-05-01T09:30:00+00:00".into()),
            old_end_date: Some("2026-05-01T12:30:00+00:00".into()),
            new_end_date: Some("2026-05-01T14:00:00+00:00".into()),
            old_location_name: None,
            new_location_name: None,
            timestamp: Utc::now().to_rfc3339(),
        };

        let emails = change_emails(&message);
        assert_eq!(emails.len(), 1);
        assert_eq!(
            emails[0].body,
            "Event 'Harbour cleanup' now ends at 2026-05-01 14:00 UTC instead of 2026-05-01 12:30 UTC."
        );
    }

    #[test]
    fn start_and_end_change_shows_both_ranges() {
        let message = EventChangedMessage {
            event_type: EVENT_CHANGED.into(),
            event_id: "event-1".into(),
            event_name: "Harbour cleanup".into(),
            old_start_date: Some("2026-05-01T09:30:00+00:00".into()),
            new_start_date: Some("2026-05-02T09:30:00+00:00".into()),
            old_end_date: Some("2026-05-01T12:30:00+00:00".into()),
            new_end_date: Some("2026-05-02T12:30:00+00:00".into()),
            old_location_name: None,
            new_location_name: None,
            timestamp: Utc::now().to_rfc3339(),
        };

        let emails = change_emails(&message);
        assert_eq!(emails.len(), 1);
        assert!(emails[0]
            .body
            .contains("from 2026-05-01 09:30 UTC until 2026-05-01 12:30 UTC to 2026-05-02 09:30 UTC until 2026-05-02 12:30 UTC"));
    }

    #[tokio::test]
    async fn event_changed_mails_each_member_once() {
        init_test_logging();
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/send")
            .match_body(Matcher::Regex("Time change for Harbour cleanup".into()))
            .with_status(202)
            .expect(2)
            .create_async()
            .await;

        let store = seeded_store().await;
        let mailer = sendgrid_mailer(format!("{}/send", server.url()));
        let raw = json!({
            "event_type": EVENT_CHANGED,
            "event_id": "event-1",
            "event_name": "Harbour cleanup",
            "old_start_date": "2026-05-01T09:30:00+00:00",
            "new_start_date": "2026-05-02T10:00:00+00:00",
            "old_location_name": null,
            "new_location_name": null,
            "timestamp": "2026-04-20T12:00:00+00:00"
        })
        .to_string();

        let sent = process_message(&store, &mailer, &raw).await.unwrap();

        assert_eq!(sent, 2);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn announcement_mails_each_member() {
        init_test_logging();
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/send")
            .match_body(Matcher::Regex("Requirements for Harbour cleanup".into()))
            .with_status(202)
            .expect(2)
            .create_async()
            .await;

        let store = seeded_store().await;
        let mailer = sendgrid_mailer(format!("{}/send", server.url()));
        let raw = json!({
            "event_type": EVENT_ANNOUNCEMENT,
            "event_id": "event-1",
            "event_name": "Harbour cleanup",
            "kind": "requirements",
            "message": "Closed-toe shoes only",
            "timestamp": "2026-04-20T12:00:00+00:00"
        })
        .to_string();

        assert_eq!(process_message(&store, &mailer, &raw).await.unwrap(), 2);
        mock.assert_async().await;
    }

    #[test]
    fn announcement_kinds_pick_their_template() {
        let mut message = EventAnnouncementMessage {
            event_type: EVENT_ANNOUNCEMENT.into(),
            event_id: "event-1".into(),
            event_name: "Harbour cleanup".into(),
            kind: AnnouncementKind::Tip,
            message: "Parking is on Canute Road".into(),
            timestamp: Utc::now().to_rfc3339(),
        };
        let email = announcement_email(&message);
        assert_eq!(email.subject, "Heads-up for Harbour cleanup");
        assert_eq!(email.body, "Parking is on Canute Road (Event: Harbour cleanup)");

        message.kind = AnnouncementKind::Attendance;
        message.message = "Two more groups joined".into();
        assert_eq!(
            announcement_email(&message).body,
            "Attendance update for 'Harbour cleanup': Two more groups joined"
        );
    }

    #[tokio::test]
    async fn member_joined_welcomes_with_host_name() {
        init_test_logging();
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/send")
            .match_body(Matcher::Regex("hosted by Grace Hopper".into()))
            .with_status(202)
            .create_async()
            .await;

        let store = seeded_store().await;
        let mailer = sendgrid_mailer(format!("{}/send", server.url()));
        let raw = json!({
            "event_type": MEMBER_JOINED,
            "event_id": "event-1",
            "member_email": "vol@gather.test",
            "role": "volunteer",
            "timestamp": "2026-04-20T12:00:00+00:00"
        })
        .to_string();

        assert_eq!(process_message(&store, &mailer, &raw).await.unwrap(), 1);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unknown_messages_are_errors() {
        let store = MockStore::new();
        let mailer = sendgrid_mailer("http://127.0.0.1:9".into());

        assert!(process_message(&store, &mailer, "not json").await.is_err());
        assert!(process_message(&store, &mailer, r#"{"event_type":"box_locked"}"#)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn undeliverable_mail_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/send")
            .with_status(500)
            .create_async()
            .await;

        let store = seeded_store().await;
        let mailer = sendgrid_mailer(format!("{}/send", server.url()));
        let raw = json!({
            "event_type": MEMBER_JOINED,
            "event_id": "event-1",
            "member_email": "vol@gather.test",
            "role": "volunteer",
            "timestamp": "2026-04-20T12:00:00+00:00"
        })
        .to_string();

        let err = process_message(&store, &mailer, &raw).await.unwrap_err();
        assert!(err.to_string().contains("Failed to send email"));
    }
}
