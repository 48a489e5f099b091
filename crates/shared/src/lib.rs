//! Movie Catalog Shared Types and Storage
//!
//! This crate contains the catalog entities, the storage capability and its
//! backends, shared by the API server and its tooling.

pub mod db;
pub mod error;
pub mod repository;
pub mod types;

pub use db::*;
pub use error::*;
pub use repository::{DatabaseRepo, InMemoryRepository, PostgresRepository, DB_TIMEOUT};
pub use types::*;
