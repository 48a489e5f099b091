//! In-process backend, selected with `DATABASE_URL=memory://`
//!
//! All tables sit behind one lock, so every multi-step write is atomic.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use super::{normalize_genre_ids, DatabaseRepo};
use crate::error::{StoreError, StoreResult};
use crate::types::{Genre, Movie, MovieInput, NewUser, User, DEFAULT_GENRES};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    movies: BTreeMap<i64, Movie>,
    genres: BTreeMap<i64, Genre>,
    /// (movie_id, genre_id)
    movies_genres: BTreeSet<(i64, i64)>,
    next_user_id: i64,
    next_movie_id: i64,
    next_genre_id: i64,
}

impl Tables {
    fn genres_of(&self, movie_id: i64) -> Vec<Genre> {
        let mut genres: Vec<Genre> = self
            .movies_genres
            .range((movie_id, i64::MIN)..=(movie_id, i64::MAX))
            .filter_map(|(_, genre_id)| self.genres.get(genre_id).cloned())
            .collect();
        genres.sort_by(|a, b| a.genre.cmp(&b.genre));
        genres
    }

    fn replace_genres(&mut self, movie_id: i64, genre_ids: &[i64]) -> StoreResult<()> {
        let ids = normalize_genre_ids(genre_ids);
        if let Some(missing) = ids.iter().find(|id| !self.genres.contains_key(id)) {
            return Err(StoreError::UnknownGenre(*missing));
        }

        self.movies_genres.retain(|(m, _)| *m != movie_id);
        self.movies_genres
            .extend(ids.into_iter().map(|genre_id| (movie_id, genre_id)));
        Ok(())
    }
}

/// Emails match case-insensitively, like the `lower(email)` index
fn same_email(stored: &str, candidate: &str) -> bool {
    stored.to_lowercase() == candidate.to_lowercase()
}

#[derive(Default)]
pub struct InMemoryRepository {
    tables: RwLock<Tables>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with the same genres as the initial migration
    pub fn with_default_genres() -> Self {
        let mut tables = Tables::default();
        let now = OffsetDateTime::now_utc();
        for label in DEFAULT_GENRES {
            tables.next_genre_id += 1;
            let id = tables.next_genre_id;
            tables.genres.insert(
                id,
                Genre {
                    id,
                    genre: (*label).to_string(),
                    created_at: now,
                    updated_at: now,
                },
            );
        }
        Self {
            tables: RwLock::new(tables),
        }
    }

    /// Remove a user; returns whether one existed
    pub async fn delete_user(&self, id: i64) -> bool {
        self.tables.write().await.users.remove(&id).is_some()
    }
}

#[async_trait]
impl DatabaseRepo for InMemoryRepository {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn all_movies(&self) -> StoreResult<Vec<Movie>> {
        let tables = self.tables.read().await;
        let mut movies: Vec<Movie> = tables.movies.values().cloned().collect();
        movies.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(movies)
    }

    async fn one_movie(&self, id: i64) -> StoreResult<Movie> {
        let tables = self.tables.read().await;
        let mut movie = tables.movies.get(&id).cloned().ok_or(StoreError::NotFound)?;
        movie.genres = tables.genres_of(id);
        Ok(movie)
    }

    async fn one_movie_for_edit(&self, id: i64) -> StoreResult<(Movie, Vec<Genre>)> {
        let tables = self.tables.read().await;
        let mut movie = tables.movies.get(&id).cloned().ok_or(StoreError::NotFound)?;
        movie.genres = tables.genres_of(id);
        movie.genres_array = movie.genres.iter().map(|g| g.id).collect();

        let mut all_genres: Vec<Genre> = tables.genres.values().cloned().collect();
        all_genres.sort_by(|a, b| a.genre.cmp(&b.genre));
        Ok((movie, all_genres))
    }

    async fn all_genres(&self) -> StoreResult<Vec<Genre>> {
        let tables = self.tables.read().await;
        let mut genres: Vec<Genre> = tables.genres.values().cloned().collect();
        genres.sort_by(|a, b| a.genre.cmp(&b.genre));
        Ok(genres)
    }

    async fn insert_movie(&self, movie: &MovieInput, image: &str) -> StoreResult<i64> {
        let mut tables = self.tables.write().await;
        let id = tables.next_movie_id + 1;

        // Resolve genres before anything is written
        tables.replace_genres(id, &movie.genres_array)?;
        tables.next_movie_id = id;

        let now = OffsetDateTime::now_utc();
        tables.movies.insert(
            id,
            Movie {
                id,
                title: movie.title.clone(),
                release_date: movie.release_date,
                runtime: movie.runtime,
                mpaa_rating: movie.mpaa_rating.clone(),
                description: movie.description.clone(),
                image: image.to_string(),
                created_at: now,
                updated_at: now,
                genres: Vec::new(),
                genres_array: Vec::new(),
            },
        );
        Ok(id)
    }

    async fn update_movie(&self, id: i64, movie: &MovieInput) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.movies.contains_key(&id) {
            return Err(StoreError::NotFound);
        }
        tables.replace_genres(id, &movie.genres_array)?;

        let stored = tables.movies.get_mut(&id).ok_or(StoreError::NotFound)?;
        stored.title = movie.title.clone();
        stored.release_date = movie.release_date;
        stored.runtime = movie.runtime;
        stored.mpaa_rating = movie.mpaa_rating.clone();
        stored.description = movie.description.clone();
        stored.updated_at = OffsetDateTime::now_utc();
        Ok(())
    }

    async fn delete_movie(&self, id: i64) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.movies.remove(&id).ok_or(StoreError::NotFound)?;
        tables.movies_genres.retain(|(m, _)| *m != id);
        Ok(())
    }

    async fn update_movie_genres(&self, movie_id: i64, genre_ids: &[i64]) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.movies.contains_key(&movie_id) {
            return Err(StoreError::NotFound);
        }
        tables.replace_genres(movie_id, genre_ids)
    }

    async fn get_user_by_email(&self, email: &str) -> StoreResult<User> {
        let tables = self.tables.read().await;
        tables
            .users
            .values()
            .find(|u| same_email(&u.email, email))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn get_user_by_id(&self, id: i64) -> StoreResult<User> {
        let tables = self.tables.read().await;
        tables.users.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn insert_user(&self, user: &NewUser) -> StoreResult<i64> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| same_email(&u.email, &user.email)) {
            return Err(StoreError::Conflict(format!(
                "email {} is already registered",
                user.email
            )));
        }

        tables.next_user_id += 1;
        let id = tables.next_user_id;
        let now = OffsetDateTime::now_utc();
        tables.users.insert(
            id,
            User {
                id,
                first_name: user.first_name.clone(),
                last_name: user.last_name.clone(),
                email: user.email.clone(),
                password: user.password_hash.clone(),
                created_at: now,
                updated_at: now,
            },
        );
        Ok(id)
    }
}
