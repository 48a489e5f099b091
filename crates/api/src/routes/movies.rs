//! Movie and genre routes
//!
//! Public reads sit at the root, the catalog management handlers are mounted
//! under `/admin` behind `require_auth`.

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;
use movie_catalog_shared::{Genre, Movie, MovieInput};
use serde::{Deserialize, Serialize};

use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    poster::poster_or_default,
    state::AppState,
};

use super::JsonResponse;

type MovieId = WithRejection<Path<i64>, ApiError>;

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Serialize)]
pub struct MovieForEditResponse {
    pub movie: Movie,
    pub genres: Vec<Genre>,
}

#[derive(Debug, Serialize)]
pub struct InsertedMovie {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateGenresRequest {
    pub genres_array: Vec<i64>,
}

// =============================================================================
// Public
// =============================================================================

/// List all movies ordered by title
pub async fn all_movies(State(state): State<AppState>) -> ApiResult<Json<Vec<Movie>>> {
    let movies = state.repo.all_movies().await?;
    Ok(Json(movies))
}

/// Get one movie with its genres
pub async fn get_movie(
    State(state): State<AppState>,
    WithRejection(Path(id), _): MovieId,
) -> ApiResult<Json<Movie>> {
    let movie = state.repo.one_movie(id).await?;
    Ok(Json(movie))
}

/// List all genres ordered by label
pub async fn all_genres(State(state): State<AppState>) -> ApiResult<Json<Vec<Genre>>> {
    let genres = state.repo.all_genres().await?;
    Ok(Json(genres))
}

// =============================================================================
// Admin
// =============================================================================

/// Catalog listing for the management screen
pub async fn movie_catalog(State(state): State<AppState>) -> ApiResult<Json<Vec<Movie>>> {
    let movies = state.repo.all_movies().await?;
    Ok(Json(movies))
}

/// Movie with its genre ids, plus every genre to choose from
pub async fn movie_for_edit(
    State(state): State<AppState>,
    WithRejection(Path(id), _): MovieId,
) -> ApiResult<Json<MovieForEditResponse>> {
    let (movie, genres) = state.repo.one_movie_for_edit(id).await?;
    Ok(Json(MovieForEditResponse { movie, genres }))
}

pub async fn insert_movie(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Json(input), _): WithRejection<Json<MovieInput>, ApiError>,
) -> ApiResult<(StatusCode, Json<JsonResponse<InsertedMovie>>)> {
    validate_movie(&input)?;

    let image = poster_or_default(state.posters.as_deref(), &input.title).await;
    let id = state.repo.insert_movie(&input, &image).await?;

    tracing::info!(movie_id = %id, user_id = %user.user_id, title = %input.title, "Movie inserted");

    Ok((
        StatusCode::CREATED,
        Json(JsonResponse::with_data("movie inserted", InsertedMovie { id })),
    ))
}

/// Full replace of a movie's mutable fields and genres
pub async fn update_movie(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Path(id), _): MovieId,
    WithRejection(Json(input), _): WithRejection<Json<MovieInput>, ApiError>,
) -> ApiResult<(StatusCode, Json<JsonResponse>)> {
    validate_movie(&input)?;

    state.repo.update_movie(id, &input).await?;

    tracing::info!(movie_id = %id, user_id = %user.user_id, "Movie updated");

    Ok((StatusCode::ACCEPTED, Json(JsonResponse::ok("movie updated"))))
}

pub async fn delete_movie(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Path(id), _): MovieId,
) -> ApiResult<(StatusCode, Json<JsonResponse>)> {
    state.repo.delete_movie(id).await?;

    tracing::info!(movie_id = %id, user_id = %user.user_id, "Movie deleted");

    Ok((StatusCode::ACCEPTED, Json(JsonResponse::ok("movie deleted"))))
}

/// Replace the genre associations wholesale. An empty list clears them.
pub async fn update_movie_genres(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Path(id), _): MovieId,
    WithRejection(Json(req), _): WithRejection<Json<UpdateGenresRequest>, ApiError>,
) -> ApiResult<(StatusCode, Json<JsonResponse>)> {
    state.repo.update_movie_genres(id, &req.genres_array).await?;

    tracing::info!(
        movie_id = %id,
        user_id = %user.user_id,
        genre_count = req.genres_array.len(),
        "Movie genres replaced"
    );

    Ok((StatusCode::ACCEPTED, Json(JsonResponse::ok("genres updated"))))
}

// =============================================================================
// Helpers
// =============================================================================

fn validate_movie(input: &MovieInput) -> ApiResult<()> {
    if input.title.trim().is_empty() {
        return Err(ApiError::Validation("title is required".to_string()));
    }
    if input.runtime <= 0 {
        return Err(ApiError::Validation(
            "runtime must be a positive number of minutes".to_string(),
        ));
    }
    Ok(())
}
