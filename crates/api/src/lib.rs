//! Movie catalog API library
//!
//! HTTP surface, authentication and poster lookup for the catalog server.

pub mod auth;
pub mod config;
pub mod error;
pub mod poster;
pub mod routes;
pub mod security;
pub mod state;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use state::AppState;
