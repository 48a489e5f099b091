//! Catalog entities shared by the store and the API

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};

/// Genres seeded by the initial migration and by `InMemoryRepository::with_default_genres`
pub const DEFAULT_GENRES: &[&str] = &[
    "Comedy",
    "Sci-Fi",
    "Horror",
    "Romance",
    "Action",
    "Thriller",
    "Drama",
    "Mystery",
    "Crime",
    "Animation",
    "Adventure",
    "Fantasy",
    "Superhero",
];

// =============================================================================
// Identity
// =============================================================================

/// Registered user record
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Argon2 PHC string, never the plaintext
    pub password: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Fields required to create a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
}

// =============================================================================
// Catalog
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Genre {
    pub id: i64,
    pub genre: String,
    #[serde(skip)]
    pub created_at: OffsetDateTime,
    #[serde(skip)]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    pub release_date: Date,
    pub runtime: i32,
    pub mpaa_rating: String,
    pub description: String,
    /// Poster path from the metadata lookup, empty when none was found
    pub image: String,
    #[serde(skip)]
    pub created_at: OffsetDateTime,
    #[serde(skip)]
    pub updated_at: OffsetDateTime,
    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub genres: Vec<Genre>,
    /// Ids of `genres`, filled for the edit view
    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub genres_array: Vec<i64>,
}

/// Mutable movie fields, used for both insert and full-replace update
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MovieInput {
    pub title: String,
    pub release_date: Date,
    pub runtime: i32,
    pub mpaa_rating: String,
    pub description: String,
    /// Genre ids to associate; replaces any existing associations
    #[serde(default)]
    pub genres_array: Vec<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    fn sample_movie() -> Movie {
        Movie {
            id: 7,
            title: "Highlander".to_string(),
            release_date: date!(1986 - 03 - 07),
            runtime: 116,
            mpaa_rating: "R".to_string(),
            description: "There can be only one".to_string(),
            image: String::new(),
            created_at: datetime!(2024-01-01 0:00 UTC),
            updated_at: datetime!(2024-01-01 0:00 UTC),
            genres: Vec::new(),
            genres_array: Vec::new(),
        }
    }

    #[test]
    fn test_movie_json_hides_timestamps_and_empty_genres() {
        let json = serde_json::to_value(sample_movie()).unwrap();

        assert_eq!(json["title"], "Highlander");
        assert_eq!(json["release_date"], "1986-03-07");
        assert_eq!(json["runtime"], 116);
        assert!(json.get("created_at").is_none());
        assert!(json.get("genres").is_none());
        assert!(json.get("genres_array").is_none());
    }

    #[test]
    fn test_movie_input_requires_fields() {
        let missing_title = serde_json::json!({
            "release_date": "1986-03-07",
            "runtime": 116,
            "mpaa_rating": "R",
            "description": "x",
        });
        assert!(serde_json::from_value::<MovieInput>(missing_title).is_err());

        let complete = serde_json::json!({
            "title": "Highlander",
            "release_date": "1986-03-07",
            "runtime": 116,
            "mpaa_rating": "R",
            "description": "x",
        });
        let input: MovieInput = serde_json::from_value(complete).unwrap();
        assert_eq!(input.release_date, date!(1986 - 03 - 07));
        assert!(input.genres_array.is_empty());
    }
}
