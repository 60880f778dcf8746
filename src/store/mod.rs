//! Storage collaborators for the API.
//!
//! Handlers only see the [`Snippets`] and [`Users`] traits; [`MemoryStore`]
//! is the implementation the binaries and tests run against.

pub mod memory;

use async_trait::async_trait;
use chrono::Duration;
use thiserror::Error;

use crate::models::{RoleType, Snippet, User};

pub use memory::MemoryStore;

/// Role type ids seeded into every store.
pub const ADMINISTRATOR_ROLE_ID: i64 = 1;
pub const USER_ROLE_ID: i64 = 2;

/// Number of snippets returned by [`Snippets::latest`].
pub const LATEST_LIMIT: usize = 10;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("models: no matching record found")]
    NoRecord,

    #[error("models: invalid credentials")]
    InvalidCredentials,

    #[error("models: duplicate email")]
    DuplicateEmail,

    #[error("models: validation error: {0}")]
    Validation(String),

    #[error("models: {0}")]
    Internal(String),
}

#[async_trait]
pub trait Snippets: Send + Sync {
    async fn insert(&self, title: &str, content: &str, lifetime: Duration) -> Result<i64, StoreError>;

    /// A snippet that has not expired yet.
    async fn get(&self, id: i64) -> Result<Snippet, StoreError>;

    /// Up to [`LATEST_LIMIT`] unexpired snippets, newest first.
    async fn latest(&self) -> Result<Vec<Snippet>, StoreError>;
}

#[async_trait]
pub trait Users: Send + Sync {
    /// Id of the active user owning `email`, if `password` matches.
    async fn authenticate(&self, email: &str, password: &str) -> Result<i64, StoreError>;

    async fn insert(&self, name: &str, email: &str, password: &str, roles: &[i64]) -> Result<i64, StoreError>;

    async fn get(&self, id: i64) -> Result<User, StoreError>;

    /// Every user, highest id first.
    async fn get_all(&self) -> Result<Vec<User>, StoreError>;

    /// Replaces the password after checking the current one.
    async fn change_password(&self, id: i64, old_password: &str, new_password: &str) -> Result<(), StoreError>;

    /// Replaces the password without checking the current one.
    async fn reset_password(&self, id: i64, new_password: &str) -> Result<(), StoreError>;

    async fn role_types(&self) -> Result<Vec<RoleType>, StoreError>;
}
