use axum::{extract::State, http::StatusCode, Form, Json};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use gather_shared::auth::{create_access_token, hash_password, verify_password};
use gather_shared::config::SETTINGS;
use gather_shared::mailer::password_reset_email;
use gather_shared::models::{
    now_str, MessageResponse, PasswordResetToken, ResetConfirmRequest, ResetRequest,
    SignupRequest, SignupResponse, Token, User, UserPublic,
};
use gather_shared::store::UserStore;
use log::{error, info, warn};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::TokenForm;
use crate::routes::AccountState;

const MIN_PASSWORD_LEN: usize = 8;

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_email(email: &str) -> Result<()> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.ends_with('.'),
        None => false,
    };
    if !valid {
        return Err(AppError::bad_request(format!("'{}' is not a valid email", email)));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::bad_request(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// 32 random bytes, URL safe
fn new_reset_token() -> String {
    let mut bytes = Vec::with_capacity(32);
    bytes.extend_from_slice(Uuid::new_v4().as_bytes());
    bytes.extend_from_slice(Uuid::new_v4().as_bytes());
    URL_SAFE_NO_PAD.encode(bytes)
}

// POST /signup
pub async fn signup<S>(
    State(state): State<AccountState<S>>,
    Json(payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>)>
where
    S: UserStore,
{
    let email = normalize_email(&payload.email);
    validate_email(&email)?;
    validate_password(&payload.password)?;

    let user = User {
        id: Uuid::new_v4().to_string(),
        first_name: payload.first_name.trim().to_string(),
        last_name: payload.last_name.trim().to_string(),
        email,
        hashed_password: hash_password(&payload.password)?,
        created_at: now_str(),
    };
    let user = state.store.create_user(user).await?;
    info!("Created account {}", user.email);

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: "User created successfully".to_string(),
            user: UserPublic {
                id: user.id,
                first_name: user.first_name,
                last_name: user.last_name,
                email: user.email,
            },
        }),
    ))
}

// POST /token
pub async fn login_for_access_token<S>(
    State(state): State<AccountState<S>>,
    Form(form): Form<TokenForm>,
) -> Result<Json<Token>>
where
    S: UserStore,
{
    if let Some(grant_type) = form.grant_type.as_deref() {
        if grant_type != "password" {
            return Err(AppError::bad_request(format!(
                "Unsupported grant type '{}'",
                grant_type
            )));
        }
    }

    let email = normalize_email(&form.username);
    let user = match state.store.get_user(&email).await? {
        Some(user) if verify_password(&form.password, &user.hashed_password) => user,
        _ => {
            warn!("Failed login for {}", email);
            return Err(AppError::unauthorized(
                "Incorrect username or password".into(),
            ));
        }
    };

    Ok(Json(Token {
        access_token: create_access_token(&user.email)?,
        token_type: "bearer".to_string(),
    }))
}

// POST /request-reset
// Answers the same way whether or not the account exists
pub async fn request_reset<S>(
    State(state): State<AccountState<S>>,
    Json(payload): Json<ResetRequest>,
) -> Result<Json<MessageResponse>>
where
    S: UserStore,
{
    let email = normalize_email(&payload.email);
    let response = Json(MessageResponse {
        message: "If that email is registered, a reset token has been sent".to_string(),
    });

    if state.store.get_user(&email).await?.is_none() {
        info!("Reset requested for unknown account");
        return Ok(response);
    }

    let token = PasswordResetToken {
        token: new_reset_token(),
        email: email.clone(),
        expires_at: (Utc::now() + Duration::minutes(SETTINGS.reset_token_expire_minutes))
            .to_rfc3339(),
    };
    state.store.save_reset_token(token.clone()).await?;

    if let Err(e) = state
        .mailer
        .send(&email, &password_reset_email(&token.token))
        .await
    {
        error!("Failed to send reset email to {}: {}", email, e);
    }

    Ok(response)
}

// POST /reset
pub async fn reset_password<S>(
    State(state): State<AccountState<S>>,
    Json(payload): Json<ResetConfirmRequest>,
) -> Result<Json<MessageResponse>>
where
    S: UserStore,
{
    validate_password(&payload.new_password)?;

    let token = state
        .store
        .take_reset_token(payload.token.trim())
        .await?
        .filter(|t| !t.is_expired())
        .ok_or_else(|| AppError::InvalidToken("Invalid or expired reset token".into()))?;

    let mut user = state
        .store
        .get_user(&token.email)
        .await?
        .ok_or_else(|| AppError::InvalidToken("Invalid or expired reset token".into()))?;

    user.hashed_password = hash_password(&payload.new_password)?;
    state.store.update_user(user).await?;
    info!("Password reset for {}", token.email);

    Ok(Json(MessageResponse {
        message: "Password has been reset".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_tokens_are_url_safe_and_unique() {
        let a = new_reset_token();
        let b = new_reset_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn email_validation() {
        assert!(validate_email("ada@example.com").is_ok());
        assert!(validate_email("ada@localhost").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("ada.example.com").is_err());
    }
}
