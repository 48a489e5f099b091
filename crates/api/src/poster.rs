//! Poster lookup against The Movie Database search API
//!
//! Inserting a movie asks the lookup for a poster path. The lookup is
//! best-effort: any failure leaves the movie without an image.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

/// Bound for one outbound lookup
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

#[async_trait]
pub trait PosterLookup: Send + Sync {
    /// Poster path of the best match for `title`, if any
    async fn poster_path(&self, title: &str) -> Result<Option<String>, PosterError>;
}

#[derive(Debug, thiserror::Error)]
pub enum PosterError {
    #[error("poster lookup request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("poster lookup returned status {0}")]
    Status(u16),
}

/// Client for the TMDB `search/movie` endpoint
#[derive(Clone)]
pub struct TmdbClient {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    poster_path: Option<String>,
}

impl TmdbClient {
    pub fn new(api_key: String, base_url: String) -> Result<Self, PosterError> {
        let client = Client::builder().timeout(LOOKUP_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create from config, returns None if no API key is configured
    pub fn from_config(api_key: &str, base_url: &str) -> Result<Option<Self>, PosterError> {
        if api_key.is_empty() {
            warn!("TMDB_API_KEY not configured - movies will be stored without posters");
            return Ok(None);
        }
        Self::new(api_key.to_string(), base_url.to_string()).map(Some)
    }
}

#[async_trait]
impl PosterLookup for TmdbClient {
    async fn poster_path(&self, title: &str) -> Result<Option<String>, PosterError> {
        let response = self
            .client
            .get(format!("{}/search/movie", self.base_url))
            .query(&[("api_key", self.api_key.as_str()), ("query", title)])
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PosterError::Status(response.status().as_u16()));
        }

        let body: SearchResponse = response.json().await?;
        let poster = body
            .results
            .into_iter()
            .next()
            .and_then(|result| result.poster_path)
            .filter(|path| !path.is_empty());

        debug!(title = %title, found = poster.is_some(), "Poster lookup finished");
        Ok(poster)
    }
}

/// Poster path for `title`, or an empty string when there is no lookup or it fails
pub async fn poster_or_default(lookup: Option<&dyn PosterLookup>, title: &str) -> String {
    let Some(lookup) = lookup else {
        return String::new();
    };

    match lookup.poster_path(title).await {
        Ok(path) => path.unwrap_or_default(),
        Err(e) => {
            warn!(title = %title, error = %e, "Poster lookup failed, continuing without image");
            String::new()
        }
    }
}
