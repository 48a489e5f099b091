//! Authentication module for the movie catalog

pub mod jwt;
pub mod middleware;
pub mod password;
pub mod session;

pub use jwt::{
    Claims, JwtError, JwtManager, TokenPair, TokenType, ACCESS_TOKEN_TTL, REFRESH_TOKEN_TTL,
};
pub use middleware::{require_auth, AuthUser};
pub use password::{hash_password, validate_password_strength, verify_password};
pub use session::{RefreshCookie, SessionFlow, REFRESH_COOKIE_NAME};
