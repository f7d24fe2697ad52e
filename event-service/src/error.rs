use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use gather_shared::error::StoreError;
use gather_shared::models::ErrorBody;
use log::error;
use thiserror::Error;

/// Errors returned by handlers. Every variant maps to one status and one
/// machine-readable `code` in the response body.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// The code is well formed but resolves to nothing
    #[error("{0}")]
    InvalidCode(String),

    /// The code can never resolve (empty, too long, bad characters)
    #[error("{0}")]
    MalformedCode(String),

    #[error("{0}")]
    CodeExpired(String),

    #[error("{0}")]
    AlreadyMember(String),

    #[error("{0}")]
    AlreadyRegistered(String),

    #[error("{0}")]
    TaskFull(String),

    #[error("{0}")]
    Conflict(String),

    /// Joined an event but no task resolves yet; a pending state, not a failure
    #[error("{0}")]
    NotAssigned(String),

    #[error("{0}")]
    BadGateway(String),

    #[error("{0}")]
    InternalServerError(String),
}

impl AppError {
    pub fn bad_request(message: String) -> Self {
        AppError::BadRequest(message)
    }

    pub fn forbidden(message: String) -> Self {
        AppError::Forbidden(message)
    }

    pub fn not_found(message: String) -> Self {
        AppError::NotFound(message)
    }

    pub fn internal_server_error(message: String) -> Self {
        AppError::InternalServerError(message)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::MalformedCode(_) | AppError::NotAssigned(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) | AppError::InvalidCode(_) => StatusCode::NOT_FOUND,
            AppError::CodeExpired(_) => StatusCode::GONE,
            AppError::AlreadyMember(_)
            | AppError::AlreadyRegistered(_)
            | AppError::TaskFull(_)
            | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "bad_request",
            AppError::Forbidden(_) => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::InvalidCode(_) | AppError::MalformedCode(_) => "invalid_code",
            AppError::CodeExpired(_) => "code_expired",
            AppError::AlreadyMember(_) => "already_member",
            AppError::AlreadyRegistered(_) => "already_registered",
            AppError::TaskFull(_) => "task_full",
            AppError::Conflict(_) => "conflict",
            AppError::NotAssigned(_) => "not_assigned",
            AppError::BadGateway(_) => "bad_gateway",
            AppError::InternalServerError(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        let body = ErrorBody {
            detail: self.to_string(),
            code: Some(self.code().to_string()),
        };
        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(message) => AppError::NotFound(message),
            StoreError::AlreadyExists(message) => AppError::Conflict(message),
            StoreError::Database(message) | StoreError::Serialization(message) => {
                AppError::InternalServerError(message)
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
