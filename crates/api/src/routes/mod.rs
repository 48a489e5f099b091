//! API routes

pub mod auth;
pub mod health;
pub mod movies;


use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post, put},
    Router,
};
use serde::Serialize;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{auth::require_auth, security::security_headers_middleware, state::AppState};

/// Envelope for write acknowledgements: `{error, message, data?}`
#[derive(Debug, Serialize)]
pub struct JsonResponse<T: Serialize = ()> {
    pub error: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl JsonResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            error: false,
            message: message.into(),
            data: None,
        }
    }
}

impl<T: Serialize> JsonResponse<T> {
    pub fn with_data(message: impl Into<String>, data: T) -> Self {
        Self {
            error: false,
            message: message.into(),
            data: Some(data),
        }
    }
}

/// CORS for the single configured front-end origin, with credentials so the
/// browser sends the refresh cookie
fn cors_layer(origin: &str) -> CorsLayer {
    let allow_origin = match origin.parse::<HeaderValue>() {
        Ok(origin) => AllowOrigin::exact(origin),
        Err(_) => {
            tracing::warn!(
                origin = %origin,
                "CORS_ALLOWED_ORIGIN is not a valid header value, refusing cross-origin requests"
            );
            AllowOrigin::list(Vec::<HeaderValue>::new())
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ACCEPT,
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::HeaderName::from_static("x-csrf-token"),
        ])
        .allow_credentials(true)
}

/// Create all API routes
pub fn create_router(state: AppState) -> Router {
    // Health check (infrastructure monitoring)
    let health_routes = Router::new().route("/health", get(health::health));

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/refresh", get(auth::refresh))
        .route("/logout", get(auth::logout))
        .route("/movies", get(movies::all_movies))
        .route("/movies/:id", get(movies::get_movie))
        .route("/genres", get(movies::all_genres));

    // Admin routes (bearer access token required)
    let admin_routes = Router::new()
        .route(
            "/movies",
            get(movies::movie_catalog).post(movies::insert_movie),
        )
        .route(
            "/movies/:id",
            get(movies::movie_for_edit)
                .put(movies::update_movie)
                .delete(movies::delete_movie),
        )
        .route("/movies/:id/genres", put(movies::update_movie_genres))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let cors = cors_layer(&state.config.cors_allowed_origin);

    Router::new()
        .merge(health_routes)
        .merge(public_routes)
        .nest("/admin", admin_routes)
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024)) // 10MB global limit
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
