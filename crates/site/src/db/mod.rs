//! Storage for content and accounts.
//!
//! # Database: `codex`
//!
//! ## Tables
//!
//! - `user` - Accounts, profiles, admin flag and admin request status
//! - `npc`, `weapon`, `armor`, `talisman`, `magic`, `spirit_ash`,
//!   `key_item`, `bolster` - One table per content category
//! - `weapon_group`, `armor_set` - Groups that weapons and armor belong to
//! - `tower_sessions.session` - Tower-sessions storage
//!
//! Handlers only see the [`ContentStore`] and [`UserDirectory`] traits. The
//! `Pg*` types are the production implementations; the `Memory*` types back
//! tests and local experiments.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/site/migrations/` and run via:
//! ```bash
//! cargo run -p grace-codex-cli -- migrate
//! ```

pub mod content;
pub mod memory;
pub mod users;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use grace_codex_core::{
    AdminRequest, Category, ContentGroup, ContentItem, GroupId, GroupKind, ItemDraft, ItemId,
    UserId, Username,
};

use crate::models::User;

pub use content::PgContentStore;
pub use memory::{MemoryContentStore, MemoryUserDirectory};
pub use users::PgUserDirectory;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique username, unknown group).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Game data, one table per [`Category`].
///
/// Every mutating method is atomic: it either applies completely or not at
/// all.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// All items of a category, ordered by name.
    async fn list(&self, category: Category) -> Result<Vec<ContentItem>, RepositoryError>;

    async fn count(&self, category: Category) -> Result<i64, RepositoryError>;

    async fn get(
        &self,
        category: Category,
        id: ItemId,
    ) -> Result<Option<ContentItem>, RepositoryError>;

    /// Insert a new item and return its id.
    async fn insert(&self, draft: &ItemDraft) -> Result<ItemId, RepositoryError>;

    /// Apply a draft to an existing item. Returns `false` if the item does
    /// not exist.
    async fn update(&self, id: ItemId, draft: &ItemDraft) -> Result<bool, RepositoryError>;

    /// Delete an item. Returns whether a row was removed; callers treat both
    /// outcomes as success.
    async fn delete(&self, category: Category, id: ItemId) -> Result<bool, RepositoryError>;

    async fn list_groups(&self, kind: GroupKind) -> Result<Vec<ContentGroup>, RepositoryError>;

    async fn get_group(
        &self,
        kind: GroupKind,
        id: GroupId,
    ) -> Result<Option<ContentGroup>, RepositoryError>;

    /// Items belonging to a group, ordered by name.
    async fn group_members(
        &self,
        kind: GroupKind,
        id: GroupId,
    ) -> Result<Vec<ContentItem>, RepositoryError>;

    async fn create_group(
        &self,
        kind: GroupKind,
        name: &str,
        description: Option<&str>,
    ) -> Result<GroupId, RepositoryError>;

    /// Delete a group. Members stay and lose their group reference.
    async fn delete_group(&self, kind: GroupKind, id: GroupId) -> Result<bool, RepositoryError>;

    /// Cheap connectivity check for the readiness probe.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Accounts and their profiles.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    async fn by_username(&self, username: &Username) -> Result<Option<User>, RepositoryError>;

    /// The user and their stored password hash.
    async fn credentials(
        &self,
        username: &Username,
    ) -> Result<Option<(User, String)>, RepositoryError>;

    /// Create an account.
    ///
    /// Returns `RepositoryError::Conflict` if the username is taken.
    async fn create(&self, username: &Username, password_hash: &str)
    -> Result<User, RepositoryError>;

    async fn update_profile(
        &self,
        id: UserId,
        display_name: Option<&str>,
        bio: Option<&str>,
    ) -> Result<Option<User>, RepositoryError>;

    /// Store a new picture path and return the one it replaces.
    async fn set_picture(
        &self,
        id: UserId,
        picture: Option<&str>,
    ) -> Result<Option<String>, RepositoryError>;

    async fn set_admin_request(
        &self,
        id: UserId,
        status: AdminRequest,
    ) -> Result<bool, RepositoryError>;

    /// Grant or revoke editor rights. Clears any open admin request.
    async fn set_admin(&self, id: UserId, is_admin: bool) -> Result<bool, RepositoryError>;

    async fn pending_admin_requests(&self) -> Result<Vec<User>, RepositoryError>;

    /// Delete an account and return the removed record.
    async fn delete(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Map unique and foreign-key violations to `Conflict`.
pub(crate) fn map_constraint(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && (db_err.is_unique_violation() || db_err.is_foreign_key_violation())
    {
        return RepositoryError::Conflict(what.to_owned());
    }
    RepositoryError::Database(e)
}
