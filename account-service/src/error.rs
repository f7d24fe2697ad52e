use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use gather_shared::auth::AuthError;
use gather_shared::error::StoreError;
use gather_shared::models::ErrorBody;
use log::error;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    /// Wrong username or password
    #[error("{0}")]
    Unauthorized(String),

    /// Unknown, expired or already used reset token
    #[error("{0}")]
    InvalidToken(String),

    #[error("{0}")]
    InternalServerError(String),
}

impl AppError {
    pub fn bad_request(message: String) -> Self {
        AppError::BadRequest(message)
    }

    pub fn unauthorized(message: String) -> Self {
        AppError::Unauthorized(message)
    }

    pub fn internal_server_error(message: String) -> Self {
        AppError::InternalServerError(message)
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::InvalidToken(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "bad_request",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::InvalidToken(_) => "invalid_token",
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
        let body = Json(ErrorBody {
            detail: self.to_string(),
            code: Some(self.code().to_string()),
        });
        if status == StatusCode::UNAUTHORIZED {
            return (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response();
        }
        (status, body).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::AlreadyExists(_) => {
                AppError::BadRequest("Email already registered".to_string())
            }
            other => AppError::InternalServerError(other.to_string()),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        AppError::InternalServerError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
