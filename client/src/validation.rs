//! Checks run before a request is sent. Each returns
//! `ClientError::Validation` naming the offending field.

use gather_shared::codes;
use gather_shared::models::{EventUpsert, SignupRequest, TaskPayload};

use crate::error::ClientError;

type Result<T> = std::result::Result<T, ClientError>;

pub fn required(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ClientError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

pub fn email(value: &str) -> Result<()> {
    required("Email", value)?;
    match value.trim().split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(ClientError::Validation(format!(
            "'{}' is not a valid email",
            value.trim()
        ))),
    }
}

/// Normalized join code, or a validation error for anything the server
/// could never resolve
pub fn join_code(raw: &str) -> Result<String> {
    required("Code", raw)?;
    codes::parse(raw).ok_or_else(|| {
        ClientError::Validation(format!(
            "Codes are 1 to {} letters or digits",
            codes::MAX_CODE_LEN
        ))
    })
}

pub fn login(username: &str, password: &str) -> Result<()> {
    email(username)?;
    required("Password", password)
}

pub fn signup(request: &SignupRequest) -> Result<()> {
    required("First name", &request.first_name)?;
    email(&request.email)?;
    required("Password", &request.password)
}

pub fn event(event: &EventUpsert) -> Result<()> {
    required("Event name", &event.name)?;
    if event.end_date < event.start_date {
        return Err(ClientError::Validation(
            "End date must be after the start date".to_string(),
        ));
    }
    Ok(())
}

pub fn task(task: &TaskPayload) -> Result<()> {
    required("Task name", &task.name)?;
    if task.end_date < task.start_date {
        return Err(ClientError::Validation(
            "End time must be after the start time".to_string(),
        ));
    }
    if task.max_volunteers == 0 {
        return Err(ClientError::Validation(
            "Max volunteers must be at least 1".to_string(),
        ));
    }
    Ok(())
}
