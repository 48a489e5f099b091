//! PostgreSQL backend

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};

use super::{normalize_genre_ids, with_timeout, DatabaseRepo};
use crate::error::{StoreError, StoreResult};
use crate::types::{Genre, Movie, MovieInput, NewUser, User};

const MOVIE_COLUMNS: &str =
    "id, title, release_date, runtime, mpaa_rating, description, image, created_at, updated_at";
const USER_COLUMNS: &str = "id, first_name, last_name, email, password, created_at, updated_at";

#[derive(Clone)]
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Genres of one movie ordered by label
async fn movie_genres(conn: &mut PgConnection, movie_id: i64) -> StoreResult<Vec<Genre>> {
    let genres = sqlx::query_as::<_, Genre>(
        r#"
        SELECT g.id, g.genre, g.created_at, g.updated_at
        FROM movies_genres mg
        JOIN genres g ON g.id = mg.genre_id
        WHERE mg.movie_id = $1
        ORDER BY g.genre
        "#,
    )
    .bind(movie_id)
    .fetch_all(conn)
    .await?;

    Ok(genres)
}

/// Replace the genre rows of a movie inside the caller's transaction.
/// Every id must resolve to an existing genre.
async fn replace_genres(
    conn: &mut PgConnection,
    movie_id: i64,
    genre_ids: &[i64],
) -> StoreResult<()> {
    let ids = normalize_genre_ids(genre_ids);

    if !ids.is_empty() {
        let found: Vec<i64> =
            sqlx::query_scalar("SELECT id FROM genres WHERE id = ANY($1) ORDER BY id")
                .bind(&ids)
                .fetch_all(&mut *conn)
                .await?;

        if let Some(missing) = ids.iter().find(|id| !found.contains(id)) {
            return Err(StoreError::UnknownGenre(*missing));
        }
    }

    sqlx::query("DELETE FROM movies_genres WHERE movie_id = $1")
        .bind(movie_id)
        .execute(&mut *conn)
        .await?;

    if !ids.is_empty() {
        sqlx::query(
            "INSERT INTO movies_genres (movie_id, genre_id) SELECT $1, UNNEST($2::bigint[])",
        )
        .bind(movie_id)
        .bind(&ids)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

#[async_trait]
impl DatabaseRepo for PostgresRepository {
    async fn ping(&self) -> StoreResult<()> {
        with_timeout(async {
            sqlx::query("SELECT 1").execute(&self.pool).await?;
            Ok(())
        })
        .await
    }

    async fn all_movies(&self) -> StoreResult<Vec<Movie>> {
        with_timeout(async {
            let movies = sqlx::query_as::<_, Movie>(&format!(
                "SELECT {MOVIE_COLUMNS} FROM movies ORDER BY title"
            ))
            .fetch_all(&self.pool)
            .await?;
            Ok(movies)
        })
        .await
    }

    async fn one_movie(&self, id: i64) -> StoreResult<Movie> {
        with_timeout(async {
            let mut conn = self.pool.acquire().await?;

            let mut movie = sqlx::query_as::<_, Movie>(&format!(
                "SELECT {MOVIE_COLUMNS} FROM movies WHERE id = $1"
            ))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or(StoreError::NotFound)?;

            movie.genres = movie_genres(&mut conn, id).await?;
            Ok(movie)
        })
        .await
    }

    async fn one_movie_for_edit(&self, id: i64) -> StoreResult<(Movie, Vec<Genre>)> {
        let mut movie = self.one_movie(id).await?;
        movie.genres_array = movie.genres.iter().map(|g| g.id).collect();

        let all_genres = self.all_genres().await?;
        Ok((movie, all_genres))
    }

    async fn all_genres(&self) -> StoreResult<Vec<Genre>> {
        with_timeout(async {
            let genres = sqlx::query_as::<_, Genre>(
                "SELECT id, genre, created_at, updated_at FROM genres ORDER BY genre",
            )
            .fetch_all(&self.pool)
            .await?;
            Ok(genres)
        })
        .await
    }

    async fn insert_movie(&self, movie: &MovieInput, image: &str) -> StoreResult<i64> {
        with_timeout(async {
            let mut tx = self.pool.begin().await?;

            let id: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO movies
                    (title, release_date, runtime, mpaa_rating, description, image,
                     created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW())
                RETURNING id
                "#,
            )
            .bind(&movie.title)
            .bind(movie.release_date)
            .bind(movie.runtime)
            .bind(&movie.mpaa_rating)
            .bind(&movie.description)
            .bind(image)
            .fetch_one(&mut *tx)
            .await?;

            replace_genres(&mut tx, id, &movie.genres_array).await?;

            tx.commit().await?;
            Ok(id)
        })
        .await
    }

    async fn update_movie(&self, id: i64, movie: &MovieInput) -> StoreResult<()> {
        with_timeout(async {
            let mut tx = self.pool.begin().await?;

            let result = sqlx::query(
                r#"
                UPDATE movies
                SET title = $2, release_date = $3, runtime = $4, mpaa_rating = $5,
                    description = $6, updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(id)
            .bind(&movie.title)
            .bind(movie.release_date)
            .bind(movie.runtime)
            .bind(&movie.mpaa_rating)
            .bind(&movie.description)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                return Err(StoreError::NotFound);
            }

            replace_genres(&mut tx, id, &movie.genres_array).await?;

            tx.commit().await?;
            Ok(())
        })
        .await
    }

    async fn delete_movie(&self, id: i64) -> StoreResult<()> {
        with_timeout(async {
            // movies_genres rows go with it (ON DELETE CASCADE)
            let result = sqlx::query("DELETE FROM movies WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await?;

            if result.rows_affected() == 0 {
                return Err(StoreError::NotFound);
            }
            Ok(())
        })
        .await
    }

    async fn update_movie_genres(&self, movie_id: i64, genre_ids: &[i64]) -> StoreResult<()> {
        with_timeout(async {
            let mut tx = self.pool.begin().await?;

            // Lock the movie row so a concurrent delete cannot interleave
            let exists: Option<i64> =
                sqlx::query_scalar("SELECT id FROM movies WHERE id = $1 FOR UPDATE")
                    .bind(movie_id)
                    .fetch_optional(&mut *tx)
                    .await?;

            if exists.is_none() {
                return Err(StoreError::NotFound);
            }

            replace_genres(&mut tx, movie_id, genre_ids).await?;

            tx.commit().await?;
            Ok(())
        })
        .await
    }

    async fn get_user_by_email(&self, email: &str) -> StoreResult<User> {
        with_timeout(async {
            let user = sqlx::query_as::<_, User>(&format!(
                "SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1)"
            ))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?;
            Ok(user)
        })
        .await
    }

    async fn get_user_by_id(&self, id: i64) -> StoreResult<User> {
        with_timeout(async {
            let user = sqlx::query_as::<_, User>(&format!(
                "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
            ))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?;
            Ok(user)
        })
        .await
    }

    async fn insert_user(&self, user: &NewUser) -> StoreResult<i64> {
        with_timeout(async {
            let id: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO users (first_name, last_name, email, password, created_at, updated_at)
                VALUES ($1, $2, $3, $4, NOW(), NOW())
                RETURNING id
                "#,
            )
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .fetch_one(&self.pool)
            .await?;
            Ok(id)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool, run_migrations};
    use time::macros::date;

    async fn repo() -> PostgresRepository {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = create_pool(&url, 2).await.expect("Failed to create pool");
        run_migrations(&pool).await.expect("Failed to run migrations");
        PostgresRepository::new(pool)
    }

    fn input(title: &str, genres: Vec<i64>) -> MovieInput {
        MovieInput {
            title: title.to_string(),
            release_date: date!(1981 - 06 - 12),
            runtime: 115,
            mpaa_rating: "PG-13".to_string(),
            description: "Archaeologist versus everyone".to_string(),
            genres_array: genres,
        }
    }

    #[tokio::test]
    #[ignore] // Requires database
    async fn test_insert_update_and_clear_genres() {
        let repo = repo().await;
        let genres = repo.all_genres().await.unwrap();
        let first = genres[0].id;
        let second = genres[1].id;

        let id = repo
            .insert_movie(&input("Raiders of the Lost Ark", vec![first]), "")
            .await
            .unwrap();
        let inserted = repo.one_movie(id).await.unwrap();
        assert_eq!(inserted.genres.len(), 1);

        repo.update_movie(id, &input("Raiders", vec![first, second]))
            .await
            .unwrap();
        let updated = repo.one_movie(id).await.unwrap();
        assert_eq!(updated.title, "Raiders");
        assert_eq!(updated.created_at, inserted.created_at);
        assert_eq!(updated.genres.len(), 2);

        repo.update_movie_genres(id, &[]).await.unwrap();
        assert!(repo.one_movie(id).await.unwrap().genres.is_empty());

        repo.delete_movie(id).await.unwrap();
        assert!(matches!(repo.one_movie(id).await, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    #[ignore] // Requires database
    async fn test_unknown_genre_rolls_back_insert() {
        let repo = repo().await;
        let before = repo.all_movies().await.unwrap().len();

        let result = repo
            .insert_movie(&input("Ghost Movie", vec![i64::MAX]), "")
            .await;

        assert!(matches!(result, Err(StoreError::UnknownGenre(id)) if id == i64::MAX));
        assert_eq!(repo.all_movies().await.unwrap().len(), before);
    }

    #[tokio::test]
    #[ignore] // Requires database
    async fn test_email_lookup_ignores_case() {
        let repo = repo().await;
        let email = format!("Mixed.Case.{}@Example.com", std::process::id());
        let id = repo
            .insert_user(&NewUser {
                first_name: "Mixed".to_string(),
                last_name: "Case".to_string(),
                email: email.clone(),
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap();

        let found = repo.get_user_by_email(&email.to_lowercase()).await.unwrap();
        assert_eq!(found.id, id);
    }
}
