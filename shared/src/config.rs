//! Environment driven settings shared by every binary.
//!
//! Values are read once on first use. Missing optional settings fall back to
//! defaults suitable for local development and are logged at `warn`.

use log::{info, warn};
use once_cell::sync::Lazy;
use std::env;
use std::fmt::Display;
use std::str::FromStr;

pub static SETTINGS: Lazy<Settings> = Lazy::new(Settings::from_env);

#[derive(Debug, Clone)]
pub struct Settings {
    pub jwt_secret: String,
    pub access_token_expire_minutes: i64,
    pub reset_token_expire_minutes: i64,
    pub tables: TableNames,
    pub mail: MailSettings,
    pub frontend_url: String,
    pub geocoder_url: String,
    pub geocoder_user_agent: String,
}

#[derive(Debug, Clone)]
pub struct TableNames {
    pub events: String,
    pub tasks: String,
    pub delegates: String,
    pub volunteers: String,
    pub users: String,
    pub reset_tokens: String,
}

#[derive(Debug, Clone)]
pub struct MailSettings {
    pub provider: MailProvider,
    pub from: Option<String>,
    pub sendgrid_api_key: Option<String>,
    pub sendgrid_url: String,
    /// Log the message instead of failing when no provider is configured
    pub debug_fallback: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailProvider {
    SendGrid,
    Log,
}

impl FromStr for MailProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sendgrid" => Ok(MailProvider::SendGrid),
            "log" => Ok(MailProvider::Log),
            other => Err(format!("unknown mail provider '{}'", other)),
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            warn!("JWT_SECRET not set, using development secret");
            "gather-development-secret".to_string()
        });

        Self {
            jwt_secret,
            access_token_expire_minutes: try_load("ACCESS_TOKEN_EXPIRE_MINUTES", 30),
            reset_token_expire_minutes: try_load("RESET_TOKEN_EXPIRE_MINUTES", 60),
            tables: TableNames {
                events: table("EVENTS_TABLE", "gather-events"),
                tasks: table("TASKS_TABLE", "gather-tasks"),
                delegates: table("DELEGATES_TABLE", "gather-delegates"),
                volunteers: table("VOLUNTEERS_TABLE", "gather-volunteers"),
                users: table("USERS_TABLE", "gather-users"),
                reset_tokens: table("RESET_TOKENS_TABLE", "gather-reset-tokens"),
            },
            mail: MailSettings {
                provider: try_load("EMAIL_PROVIDER", MailProvider::Log),
                from: env::var("EMAIL_FROM").ok(),
                sendgrid_api_key: env::var("SENDGRID_API_KEY").ok(),
                sendgrid_url: env::var("SENDGRID_URL")
                    .unwrap_or_else(|_| "https://api.sendgrid.com/v3/mail/send".to_string()),
                debug_fallback: try_load("DEBUG_EMAIL_FALLBACK", true),
            },
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:19006".to_string()),
            geocoder_url: env::var("GEOCODER_URL")
                .unwrap_or_else(|_| "https://nominatim.openstreetmap.org".to_string()),
            geocoder_user_agent: env::var("GEOCODER_USER_AGENT")
                .unwrap_or_else(|_| "gather-event-service".to_string()),
        }
    }
}

fn table(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn try_load<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|e| {
            warn!("Invalid {} value '{}': {}, using default {}", key, raw, e, default);
            default
        }),
        Err(_) => {
            info!("{} not set, using default: {}", key, default);
            default
        }
    }
}

impl Display for MailProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MailProvider::SendGrid => write!(f, "sendgrid"),
            MailProvider::Log => write!(f, "log"),
        }
    }
}

/// Route prefix used behind API Gateway. `REMOVE_BASE_PATH=true` drops it.
pub fn route_prefix() -> &'static str {
    let remove_base_path = env::var("REMOVE_BASE_PATH")
        .map(|v| v.to_lowercase() == "true")
        .unwrap_or(false);

    if remove_base_path {
        ""
    } else {
        "/Prod"
    }
}
