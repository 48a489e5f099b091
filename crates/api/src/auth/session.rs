//! Login, refresh and logout, and the refresh-cookie lifecycle

use std::sync::Arc;

use axum_extra::extract::cookie::{Cookie, SameSite};
use movie_catalog_shared::{DatabaseRepo, StoreError, User};
use time::{Duration, OffsetDateTime};

use super::{
    jwt::{JwtManager, TokenPair, REFRESH_TOKEN_TTL},
    password::{verify_password, PasswordError},
};
use crate::{
    config::Config,
    error::{ApiError, ApiResult},
};

/// Name of the cookie carrying the refresh token
pub const REFRESH_COOKIE_NAME: &str = "refresh_token";

/// Attributes of the refresh cookie, fixed at startup
#[derive(Debug, Clone)]
pub struct RefreshCookie {
    domain: String,
    path: String,
    secure: bool,
}

impl RefreshCookie {
    pub fn new(domain: &str, path: &str, secure: bool) -> Self {
        Self {
            domain: domain.to_string(),
            path: path.to_string(),
            secure,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.cookie_domain, &config.cookie_path, config.cookie_secure)
    }

    /// Cookie holding `token`, living as long as the refresh token
    pub fn issue(&self, token: String) -> Cookie<'static> {
        self.build(token, REFRESH_TOKEN_TTL, OffsetDateTime::now_utc() + REFRESH_TOKEN_TTL)
    }

    /// Already-expired cookie that overwrites whatever the client holds
    pub fn expired(&self) -> Cookie<'static> {
        self.build(String::new(), Duration::ZERO, OffsetDateTime::UNIX_EPOCH)
    }

    fn build(&self, value: String, max_age: Duration, expires: OffsetDateTime) -> Cookie<'static> {
        Cookie::build((REFRESH_COOKIE_NAME, value))
            .domain(self.domain.clone())
            .path(self.path.clone())
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Strict)
            .max_age(max_age)
            .expires(expires)
            .build()
    }
}

/// Result of a successful login
#[derive(Debug)]
pub struct LoginOutcome {
    pub user: User,
    pub tokens: TokenPair,
    pub cookie: Cookie<'static>,
}

/// Result of a successful refresh
#[derive(Debug)]
pub struct RefreshOutcome {
    pub user: User,
    pub tokens: TokenPair,
    pub cookie: Cookie<'static>,
}

/// Orchestrates credential checks, token issuance and cookie rotation
#[derive(Clone)]
pub struct SessionFlow {
    repo: Arc<dyn DatabaseRepo>,
    jwt: Arc<JwtManager>,
    cookie: RefreshCookie,
}

impl SessionFlow {
    pub fn new(repo: Arc<dyn DatabaseRepo>, jwt: Arc<JwtManager>, cookie: RefreshCookie) -> Self {
        Self { repo, jwt, cookie }
    }

    /// Verify credentials and issue a token pair plus refresh cookie.
    /// Unknown email, wrong password and unreadable stored hash are all `InvalidCredentials`.
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<LoginOutcome> {
        let email = email.trim().to_lowercase();

        let user = match self.repo.get_user_by_email(&email).await {
            Ok(user) => user,
            Err(StoreError::NotFound) => {
                tracing::warn!(email = %email, "login: User not found");
                return Err(ApiError::InvalidCredentials);
            }
            Err(e) => return Err(e.into()),
        };

        match verify_password(password, &user.password) {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(user_id = %user.id, "login: Invalid password");
                return Err(ApiError::InvalidCredentials);
            }
            Err(PasswordError::InvalidHash(reason)) => {
                tracing::error!(
                    user_id = %user.id,
                    reason = %reason,
                    "login: Stored password hash is malformed"
                );
                return Err(ApiError::InvalidCredentials);
            }
            Err(e) => {
                tracing::error!(
                    user_id = %user.id,
                    error = ?e,
                    "login: Password verification failed"
                );
                return Err(ApiError::Internal);
            }
        }

        let tokens = self.issue(&user)?;
        let cookie = self.cookie.issue(tokens.refresh_token.clone());

        tracing::info!(user_id = %user.id, "login: Login successful");
        Ok(LoginOutcome { user, tokens, cookie })
    }

    /// Exchange the refresh cookie for a new pair and a rotated cookie
    pub async fn refresh(&self, presented: Option<&str>) -> ApiResult<RefreshOutcome> {
        let token = presented
            .filter(|t| !t.is_empty())
            .ok_or(ApiError::Unauthorized)?;

        let claims = self.jwt.validate_refresh(token).map_err(|e| {
            tracing::debug!(error = %e, "refresh: Rejected refresh token");
            ApiError::InvalidToken
        })?;
        let user_id = claims.user_id().map_err(|_| ApiError::InvalidToken)?;

        let user = self.resolve_subject(user_id).await?;

        let tokens = self.issue(&user)?;
        let cookie = self.cookie.issue(tokens.refresh_token.clone());

        tracing::info!(user_id = %user.id, "refresh: Token pair rotated");
        Ok(RefreshOutcome { user, tokens, cookie })
    }

    /// Cookie that clears the client's refresh token
    pub fn logout(&self) -> Cookie<'static> {
        self.cookie.expired()
    }

    /// Resolve a bearer access token to the user it was issued for
    pub async fn authenticate(&self, access_token: &str) -> ApiResult<User> {
        let claims = self.jwt.validate_access(access_token).map_err(|e| {
            tracing::debug!(error = %e, "auth: Rejected access token");
            ApiError::InvalidToken
        })?;
        let user_id = claims.user_id().map_err(|_| ApiError::InvalidToken)?;

        self.resolve_subject(user_id).await
    }

    pub fn access_token_expiry_seconds(&self) -> i64 {
        self.jwt.access_token_expiry_seconds()
    }

    /// A cryptographically valid token still fails if its subject no longer exists
    async fn resolve_subject(&self, user_id: i64) -> ApiResult<User> {
        match self.repo.get_user_by_id(user_id).await {
            Ok(user) => Ok(user),
            Err(StoreError::NotFound) => {
                tracing::warn!(user_id = %user_id, "auth: Token subject no longer exists");
                Err(ApiError::InvalidToken)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn issue(&self, user: &User) -> ApiResult<TokenPair> {
        self.jwt.issue(user).map_err(|e| {
            tracing::error!(user_id = %user.id, error = %e, "Token generation failed");
            ApiError::Internal
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{jwt::TokenType, password::hash_password};
    use movie_catalog_shared::{InMemoryRepository, NewUser};

    const SECRET: &str = "test-secret-key-at-least-32-chars!";

    async fn flow() -> (SessionFlow, Arc<InMemoryRepository>, Arc<JwtManager>, i64) {
        let repo = Arc::new(InMemoryRepository::new());
        let user_id = repo
            .insert_user(&NewUser {
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                email: "a@b.com".to_string(),
                password_hash: hash_password("secret").unwrap(),
            })
            .await
            .unwrap();

        let jwt = Arc::new(JwtManager::new(SECRET, "example.com", "example.com"));
        let flow = SessionFlow::new(
            repo.clone(),
            jwt.clone(),
            RefreshCookie::new("localhost", "/", true),
        );
        (flow, repo, jwt, user_id)
    }

    #[tokio::test]
    async fn test_login_issues_pair_and_cookie() {
        let (flow, _repo, jwt, user_id) = flow().await;

        let outcome = flow.login("A@B.com ", "secret").await.unwrap();
        assert_eq!(outcome.user.id, user_id);

        let claims = jwt.validate_refresh(&outcome.tokens.refresh_token).unwrap();
        assert_eq!(claims.user_id().unwrap(), user_id);

        assert_eq!(outcome.cookie.name(), REFRESH_COOKIE_NAME);
        assert_eq!(outcome.cookie.value(), outcome.tokens.refresh_token);
        assert_eq!(outcome.cookie.max_age(), Some(REFRESH_TOKEN_TTL));
        assert_eq!(outcome.cookie.http_only(), Some(true));
        assert_eq!(outcome.cookie.same_site(), Some(SameSite::Strict));
        assert_eq!(outcome.cookie.domain(), Some("localhost"));
        assert_eq!(outcome.cookie.path(), Some("/"));
    }

    #[tokio::test]
    async fn test_login_rejects_bad_credentials() {
        let (flow, _repo, _jwt, _) = flow().await;

        assert!(matches!(
            flow.login("a@b.com", "wrong").await,
            Err(ApiError::InvalidCredentials)
        ));
        assert!(matches!(
            flow.login("nobody@b.com", "secret").await,
            Err(ApiError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_refresh_rotates_tokens() {
        let (flow, _repo, jwt, user_id) = flow().await;
        let login = flow.login("a@b.com", "secret").await.unwrap();

        let outcome = flow.refresh(Some(&login.tokens.refresh_token)).await.unwrap();
        assert_eq!(outcome.user.id, user_id);
        assert_eq!(outcome.cookie.value(), outcome.tokens.refresh_token);
        assert!(jwt.validate_access(&outcome.tokens.access_token).is_ok());
    }

    #[tokio::test]
    async fn test_refresh_failures_are_unauthorized() {
        let (flow, repo, _jwt, user_id) = flow().await;
        let login = flow.login("a@b.com", "secret").await.unwrap();

        assert!(matches!(flow.refresh(None).await, Err(ApiError::Unauthorized)));
        assert!(matches!(flow.refresh(Some("")).await, Err(ApiError::Unauthorized)));
        assert!(matches!(
            flow.refresh(Some("garbage")).await,
            Err(ApiError::InvalidToken)
        ));
        // An access token is not a refresh token
        assert!(matches!(
            flow.refresh(Some(&login.tokens.access_token)).await,
            Err(ApiError::InvalidToken)
        ));

        repo.delete_user(user_id).await;
        assert!(matches!(
            flow.refresh(Some(&login.tokens.refresh_token)).await,
            Err(ApiError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_expired_refresh_token_is_rejected() {
        let (flow, repo, jwt, user_id) = flow().await;
        let user = repo.get_user_by_id(user_id).await.unwrap();

        let issued = OffsetDateTime::now_utc() - Duration::days(8);
        let claims = jwt.claims_for(&user, TokenType::Refresh, issued);
        let expired = jwt.sign(&claims).unwrap();

        assert!(matches!(
            flow.refresh(Some(expired.as_str())).await,
            Err(ApiError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_logout_cookie_is_expired() {
        let (flow, _repo, _jwt, _) = flow().await;
        let cookie = flow.logout();

        assert_eq!(cookie.name(), REFRESH_COOKIE_NAME);
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(Duration::ZERO));
        assert_eq!(cookie.expires_datetime(), Some(OffsetDateTime::UNIX_EPOCH));
    }

    #[tokio::test]
    async fn test_authenticate_requires_existing_subject() {
        let (flow, repo, _jwt, user_id) = flow().await;
        let login = flow.login("a@b.com", "secret").await.unwrap();

        let user = flow.authenticate(&login.tokens.access_token).await.unwrap();
        assert_eq!(user.id, user_id);

        assert!(matches!(
            flow.authenticate(&login.tokens.refresh_token).await,
            Err(ApiError::InvalidToken)
        ));

        repo.delete_user(user_id).await;
        assert!(matches!(
            flow.authenticate(&login.tokens.access_token).await,
            Err(ApiError::InvalidToken)
        ));
    }
}
