use serde_json::Value;
use thiserror::Error;

/// Structured code the server uses for "joined but no task yet"
pub const NOT_ASSIGNED: &str = "not_assigned";

const CONNECTIVITY_MESSAGE: &str = "Could not reach the server. Check your connection and try again.";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    /// Rejected locally, no request was sent
    #[error("{0}")]
    Validation(String),

    /// The server answered with a non-2xx status
    #[error("{message}")]
    Api {
        status: u16,
        message: String,
        code: Option<String>,
    },

    /// No usable response
    #[error("{message}")]
    Transport { message: String, cause: String },
}

impl ClientError {
    pub fn transport(cause: impl ToString) -> Self {
        ClientError::Transport {
            message: CONNECTIVITY_MESSAGE.to_string(),
            cause: cause.to_string(),
        }
    }

    /// Builds an `Api` error from a response body. The message is taken from
    /// `detail` (a string, or the first `msg` of a validation array), then
    /// `message`, then `fallback`.
    pub fn from_response(status: u16, body: &str, fallback: &str) -> Self {
        let parsed: Option<Value> = serde_json::from_str(body).ok();
        let message = parsed
            .as_ref()
            .and_then(extract_message)
            .unwrap_or_else(|| fallback.to_string());
        let code = parsed
            .as_ref()
            .and_then(|v| v.get("code"))
            .and_then(Value::as_str)
            .map(str::to_string);

        ClientError::Api {
            status,
            message,
            code,
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            ClientError::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The caller joined but has no task yet; show a pending state
    pub fn is_not_assigned(&self) -> bool {
        self.code() == Some(NOT_ASSIGNED)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

fn extract_message(body: &Value) -> Option<String> {
    match body.get("detail") {
        Some(Value::String(detail)) if !detail.is_empty() => return Some(detail.clone()),
        Some(Value::Array(items)) => {
            if let Some(msg) = items
                .first()
                .and_then(|item| item.get("msg"))
                .and_then(Value::as_str)
            {
                return Some(msg.to_string());
            }
        }
        _ => {}
    }
    body.get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}
