//! Storage capability for the catalog
//!
//! Handlers only see `DatabaseRepo`; the backend is picked once at startup
//! and injected as an `Arc<dyn DatabaseRepo>`.

mod memory;
mod postgres;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{StoreError, StoreResult};
use crate::types::{Genre, Movie, MovieInput, NewUser, User};

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;

/// Upper bound for a single store round trip
pub const DB_TIMEOUT: Duration = Duration::from_secs(5);

#[async_trait]
pub trait DatabaseRepo: Send + Sync {
    /// Cheap connectivity check for health probes
    async fn ping(&self) -> StoreResult<()>;

    /// All movies ordered by title, without genres
    async fn all_movies(&self) -> StoreResult<Vec<Movie>>;

    /// One movie with its genres
    async fn one_movie(&self, id: i64) -> StoreResult<Movie>;

    /// One movie with its genres and `genres_array`, plus every genre for the edit form
    async fn one_movie_for_edit(&self, id: i64) -> StoreResult<(Movie, Vec<Genre>)>;

    /// All genres ordered by label
    async fn all_genres(&self) -> StoreResult<Vec<Genre>>;

    /// Insert a movie and its genre associations atomically, returning the new id
    async fn insert_movie(&self, movie: &MovieInput, image: &str) -> StoreResult<i64>;

    /// Replace every mutable field and the genre set; id, image and `created_at` are kept
    async fn update_movie(&self, id: i64, movie: &MovieInput) -> StoreResult<()>;

    async fn delete_movie(&self, id: i64) -> StoreResult<()>;

    /// Wholesale replacement of a movie's genres. An empty slice clears them.
    async fn update_movie_genres(&self, movie_id: i64, genre_ids: &[i64]) -> StoreResult<()>;

    async fn get_user_by_email(&self, email: &str) -> StoreResult<User>;

    async fn get_user_by_id(&self, id: i64) -> StoreResult<User>;

    /// Fails with `Conflict` when the email is already registered
    async fn insert_user(&self, user: &NewUser) -> StoreResult<i64>;
}

/// Bound a store operation by `DB_TIMEOUT`
pub(crate) async fn with_timeout<T, F>(operation: F) -> StoreResult<T>
where
    F: Future<Output = StoreResult<T>>,
{
    tokio::time::timeout(DB_TIMEOUT, operation)
        .await
        .map_err(|_| {
            tracing::warn!(timeout = ?DB_TIMEOUT, "store operation timed out");
            StoreError::Timeout(DB_TIMEOUT)
        })?
}

/// Sorted, de-duplicated genre ids
pub(crate) fn normalize_genre_ids(genre_ids: &[i64]) -> Vec<i64> {
    let mut ids = genre_ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_genre_ids() {
        assert_eq!(normalize_genre_ids(&[3, 1, 3, 2, 1]), vec![1, 2, 3]);
        assert!(normalize_genre_ids(&[]).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_timeout_fails_slow_operations() {
        let result: StoreResult<()> = with_timeout(async {
            tokio::time::sleep(DB_TIMEOUT + Duration::from_secs(1)).await;
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(StoreError::Timeout(d)) if d == DB_TIMEOUT));
    }

    #[tokio::test]
    async fn test_with_timeout_passes_results_through() {
        let result = with_timeout(async { Ok::<_, StoreError>(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }
}
