//! Authentication routes

use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::{CookieJar, WithRejection};
use movie_catalog_shared::{NewUser, StoreError, User};
use serde::{Deserialize, Serialize};

use crate::{
    auth::{hash_password, validate_password_strength, REFRESH_COOKIE_NAME},
    error::{ApiError, ApiResult},
    state::AppState,
};

use super::JsonResponse;

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Register a new user
pub async fn register(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<RegisterRequest>, ApiError>,
) -> ApiResult<(StatusCode, Json<JsonResponse>)> {
    let first_name = req.first_name.trim();
    let last_name = req.last_name.trim();
    if first_name.is_empty() || last_name.is_empty() {
        return Err(ApiError::Validation(
            "first and last name are required".to_string(),
        ));
    }

    let email = req.email.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(ApiError::Validation("invalid email format".to_string()));
    }

    validate_password_strength(&req.password).map_err(|e| ApiError::Validation(e.to_string()))?;

    let password_hash = hash_password(&req.password).map_err(|e| {
        tracing::error!(error = %e, "register: Password hashing failed");
        ApiError::Internal
    })?;

    let user_id = state
        .repo
        .insert_user(&NewUser {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: email.clone(),
            password_hash,
        })
        .await
        .map_err(|e| match e {
            StoreError::Conflict(_) => {
                tracing::warn!(email = %email, "register: Email already registered");
                ApiError::EmailAlreadyExists
            }
            other => other.into(),
        })?;

    tracing::info!(user_id = %user_id, "register: User created");

    Ok((StatusCode::CREATED, Json(JsonResponse::ok("user created"))))
}

/// Exchange credentials for a token pair and the refresh cookie
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(req), _): WithRejection<Json<LoginRequest>, ApiError>,
) -> ApiResult<(CookieJar, Json<LoginResponse>)> {
    tracing::info!(email = %req.email, "login: Starting login attempt");

    let outcome = state.sessions.login(&req.email, &req.password).await?;

    let body = LoginResponse {
        access_token: outcome.tokens.access_token,
        refresh_token: outcome.tokens.refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: state.sessions.access_token_expiry_seconds(),
        user: outcome.user.into(),
    };

    Ok((jar.add(outcome.cookie), Json(body)))
}

/// Rotate the token pair using the refresh cookie
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
) -> ApiResult<(CookieJar, Json<RefreshResponse>)> {
    let presented = jar.get(REFRESH_COOKIE_NAME).map(|cookie| cookie.value().to_string());

    let outcome = state.sessions.refresh(presented.as_deref()).await?;

    let body = RefreshResponse {
        access_token: outcome.tokens.access_token,
        refresh_token: outcome.tokens.refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: state.sessions.access_token_expiry_seconds(),
    };

    Ok((jar.add(outcome.cookie), Json(body)))
}

/// Clear the refresh cookie. Always succeeds.
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (StatusCode, CookieJar) {
    (StatusCode::ACCEPTED, jar.add(state.sessions.logout()))
}

// =============================================================================
// Helpers
// =============================================================================

/// Validate email format (expects a trimmed, lowercased address)
fn is_valid_email(email: &str) -> bool {
    if email.is_empty() || email.len() > 254 {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    if local.is_empty() || local.len() > 64 || domain.contains('@') {
        return false;
    }
    if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return false;
    }
    if !local
        .chars()
        .all(|c| c.is_alphanumeric() || ".+-_".contains(c))
    {
        return false;
    }

    if domain.starts_with('-') || domain.ends_with('-') {
        return false;
    }
    if domain.starts_with('.') || domain.ends_with('.') || domain.contains("..") {
        return false;
    }

    // Need a dot-separated alphabetic TLD of at least 2 chars
    match domain.rsplit_once('.') {
        Some((host, tld)) if !host.is_empty() => {
            tld.len() >= 2
                && tld.chars().all(|c| c.is_alphabetic())
                && domain.chars().all(|c| c.is_alphanumeric() || c == '.' || c == '-')
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("a@b.com"));
        assert!(is_valid_email("first.last+movies@example.co.uk"));

        assert!(!is_valid_email(""));
        assert!(!is_valid_email("no-at-sign.com"));
        assert!(!is_valid_email("two@@example.com"));
        assert!(!is_valid_email("a@localhost"));
        assert!(!is_valid_email(".a@b.com"));
        assert!(!is_valid_email("a@b.c"));
        assert!(!is_valid_email("a b@example.com"));
    }
}
