//! # flavors-store
//!
//! Durable storage for Festival Flavors.
//!
//! Recipes live in a SQLite database behind the synchronous [`Database`]
//! handle, which wraps a `rusqlite::Connection` and provides typed helpers
//! for saving, checking and searching recipes.  Login credentials live in a
//! small JSON file owned by [`CredentialStore`].

pub mod credentials;
pub mod database;
pub mod migrations;
pub mod models;
pub mod recipes;

mod error;

pub use credentials::CredentialStore;
pub use database::Database;
pub use error::{Result, StoreError};
pub use models::*;
