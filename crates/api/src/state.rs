//! Application state

use std::sync::Arc;

use movie_catalog_shared::DatabaseRepo;

use crate::{
    auth::{JwtManager, RefreshCookie, SessionFlow},
    config::Config,
    poster::PosterLookup,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub repo: Arc<dyn DatabaseRepo>,
    pub jwt_manager: Arc<JwtManager>,
    pub sessions: SessionFlow,
    /// None when no TMDB key is configured
    pub posters: Option<Arc<dyn PosterLookup>>,
}

impl AppState {
    pub fn new(
        config: Config,
        repo: Arc<dyn DatabaseRepo>,
        posters: Option<Arc<dyn PosterLookup>>,
    ) -> Self {
        let jwt_manager = Arc::new(JwtManager::new(
            &config.jwt_secret,
            &config.jwt_issuer,
            &config.jwt_audience,
        ));
        let sessions = SessionFlow::new(
            repo.clone(),
            jwt_manager.clone(),
            RefreshCookie::from_config(&config),
        );

        Self {
            config: Arc::new(config),
            repo,
            jwt_manager,
            sessions,
            posters,
        }
    }
}
