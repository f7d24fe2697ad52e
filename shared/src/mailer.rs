use log::{error, info, warn};
use reqwest::Client;
use serde::Serialize;

use crate::config::{MailProvider, MailSettings, SETTINGS};

#[derive(Debug, Serialize)]
struct SendGridAddress {
    email: String,
}

#[derive(Debug, Serialize)]
struct SendGridPersonalization {
    to: Vec<SendGridAddress>,
}

#[derive(Debug, Serialize)]
struct SendGridContent {
    #[serde(rename = "type")]
    kind: String,
    value: String,
}

#[derive(Debug, Serialize)]
struct SendGridMessage {
    personalizations: Vec<SendGridPersonalization>,
    from: SendGridAddress,
    subject: String,
    content: Vec<SendGridContent>,
}

/// A rendered plain-text email
#[derive(Debug, Clone, PartialEq)]
pub struct Email {
    pub subject: String,
    pub body: String,
}

#[derive(Clone)]
pub struct Mailer {
    settings: MailSettings,
    client: Client,
}

impl Mailer {
    pub fn new(settings: MailSettings) -> Self {
        Self {
            settings,
            client: Client::new(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(SETTINGS.mail.clone())
    }

    /// Sends one email. With the `log` provider, or with SendGrid missing
    /// configuration and the debug fallback on, the message is only logged.
    pub async fn send(&self, to: &str, email: &Email) -> Result<(), String> {
        match self.settings.provider {
            MailProvider::Log => {
                info!(
                    "[email to {}] {}\n{}",
                    to, email.subject, email.body
                );
                Ok(())
            }
            MailProvider::SendGrid => {
                let (api_key, from) = match (&self.settings.sendgrid_api_key, &self.settings.from) {
                    (Some(key), Some(from)) => (key, from),
                    _ if self.settings.debug_fallback => {
                        warn!(
                            "SendGrid not configured, logging email to {} instead: {}\n{}",
                            to, email.subject, email.body
                        );
                        return Ok(());
                    }
                    _ => return Err("SendGrid not configured".to_string()),
                };
                self.send_sendgrid(api_key, from, to, email).await
            }
        }
    }

    async fn send_sendgrid(
        &self,
        api_key: &str,
        from: &str,
        to: &str,
        email: &Email,
    ) -> Result<(), String> {
        let message = SendGridMessage {
            personalizations: vec![SendGridPersonalization {
                to: vec![SendGridAddress {
                    email: to.to_string(),
                }],
            }],
            from: SendGridAddress {
                email: bare_address(from),
            },
            subject: email.subject.clone(),
            content: vec![SendGridContent {
                kind: "text/plain".to_string(),
                value: email.body.clone(),
            }],
        };

        let response = self
            .client
            .post(&self.settings.sendgrid_url)
            .bearer_auth(api_key)
            .json(&message)
            .send()
            .await
            .map_err(|e| {
                error!("Failed to send email to {}: {}", to, e);
                format!("Failed to send email: {}", e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("SendGrid returned error status {}: {}", status, error_text);
            return Err(format!("SendGrid status {}", status.as_u16()));
        }

        info!("Sent '{}' to {}", email.subject, to);
        Ok(())
    }

    /// Sends the same email to every recipient, returning how many succeeded
    pub async fn send_all(&self, recipients: &[String], email: &Email) -> usize {
        let mut sent = 0;
        for to in recipients {
            match self.send(to, email).await {
                Ok(()) => sent += 1,
                Err(e) => error!("Email to {} failed: {}", to, e),
            }
        }
        sent
    }
}

/// `"Gather <noreply@x.org>"` -> `"noreply@x.org"`
fn bare_address(from: &str) -> String {
    match (from.find('<'), from.find('>')) {
        (Some(start), Some(end)) if start < end => from[start + 1..end].trim().to_string(),
        _ => from.trim().to_string(),
    }
}

pub fn password_reset_email(token: &str) -> Email {
    Email {
        subject: "Password Reset Instructions".to_string(),
        body: format!(
            "You requested a password reset for your account.\n\n\
             Your reset token is:\n\n{}\n\n\
             Open the app, go to the password reset screen, and paste your token to set a new password.\n\
             If you did not request this, ignore this email.",
            token
        ),
    }
}

pub fn time_change_email(event_name: &str, old_time: &str, new_time: &str) -> Email {
    Email {
        subject: format!("Time change for {}", event_name),
        body: format!(
            "Event '{}' time changed from {} to {}.",
            event_name, old_time, new_time
        ),
    }
}

pub fn end_time_change_email(event_name: &str, old_end: &str, new_end: &str) -> Email {
    Email {
        subject: format!("Time change for {}", event_name),
        body: format!(
            "Event '{}' now ends at {} instead of {}.",
            event_name, new_end, old_end
        ),
    }
}

pub fn address_change_email(event_name: &str, old_address: &str, new_address: &str) -> Email {
    Email {
        subject: format!("New location for {}", event_name),
        body: format!(
            "Address for '{}' changed from {} to {}.",
            event_name, old_address, new_address
        ),
    }
}

pub fn tip_email(event_name: &str, message: &str) -> Email {
    Email {
        subject: format!("Heads-up for {}", event_name),
        body: format!("{} (Event: {})", message, event_name),
    }
}

pub fn requirements_email(event_name: &str, message: &str) -> Email {
    Email {
        subject: format!("Requirements for {}", event_name),
        body: format!("{} (Event: {})", message, event_name),
    }
}

pub fn attendance_change_email(event_name: &str, change: &str) -> Email {
    Email {
        subject: format!("Attendance update for {}", event_name),
        body: format!("Attendance update for '{}': {}", event_name, change),
    }
}

pub fn welcome_email(event_name: &str, host: &str) -> Email {
    Email {
        subject: format!("Welcome to {}", event_name),
        body: format!(
            "You've been added to '{}' hosted by {}.",
            event_name, host
        ),
    }
}

pub fn reminder_email(event_name: &str, start: &str) -> Email {
    Email {
        subject: format!("Reminder: {}", event_name),
        body: format!(
            "Don't forget about '{}' happening at {}!",
            event_name, start
        ),
    }
}
