//! # Backends
//!
//! Concrete collaborators: the SQLite stores and the local auth provider.

pub mod auth;
pub mod sqlite;

pub use auth::LocalAuthProvider;
pub use sqlite::SqliteBackend;
