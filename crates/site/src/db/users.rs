//! `PostgreSQL` user directory.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use grace_codex_core::{AdminRequest, UserId, Username};

use super::{RepositoryError, UserDirectory, map_constraint};
use crate::models::User;

const USER_COLUMNS: &str = "id, username, display_name, bio, picture, is_admin, admin_request, \
                            created_at, updated_at";

/// User directory backed by the `codex.user` table.
#[derive(Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i32,
    username: String,
    display_name: Option<String>,
    bio: Option<String>,
    picture: Option<String>,
    is_admin: bool,
    admin_request: AdminRequest,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> Result<User, RepositoryError> {
        let username = Username::parse(&self.username).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid username in database: {e}"))
        })?;

        Ok(User {
            id: UserId::new(self.id),
            username,
            display_name: self.display_name,
            bio: self.bio,
            picture: self.picture,
            is_admin: self.is_admin,
            admin_request: self.admin_request,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    #[instrument(skip(self))]
    async fn by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM codex.user WHERE id = $1");
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(id.as_i32())
            .fetch_optional(&self.pool)
            .await?;
        row.map(UserRow::into_user).transpose()
    }

    #[instrument(skip(self), fields(username = %username))]
    async fn by_username(&self, username: &Username) -> Result<Option<User>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM codex.user WHERE username = $1");
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(username.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(UserRow::into_user).transpose()
    }

    #[instrument(skip(self), fields(username = %username))]
    async fn credentials(
        &self,
        username: &Username,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let sql =
            format!("SELECT {USER_COLUMNS}, password_hash FROM codex.user WHERE username = $1");
        let row: Option<CredentialRow> = sqlx::query_as(&sql)
            .bind(username.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(r) => Ok(Some((r.user.into_user()?, r.password_hash))),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, password_hash), fields(username = %username))]
    async fn create(
        &self,
        username: &Username,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let sql = format!(
            "INSERT INTO codex.user (username, password_hash) VALUES ($1, $2) \
             RETURNING {USER_COLUMNS}"
        );
        let row: UserRow = sqlx::query_as(&sql)
            .bind(username.as_str())
            .bind(password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_constraint(e, "username already exists"))?;
        row.into_user()
    }

    #[instrument(skip(self, display_name, bio))]
    async fn update_profile(
        &self,
        id: UserId,
        display_name: Option<&str>,
        bio: Option<&str>,
    ) -> Result<Option<User>, RepositoryError> {
        let sql = format!(
            "UPDATE codex.user SET display_name = $2, bio = $3, updated_at = now() \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(id.as_i32())
            .bind(display_name)
            .bind(bio)
            .fetch_optional(&self.pool)
            .await?;
        row.map(UserRow::into_user).transpose()
    }

    #[instrument(skip(self))]
    async fn set_picture(
        &self,
        id: UserId,
        picture: Option<&str>,
    ) -> Result<Option<String>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let previous: Option<Option<String>> =
            sqlx::query_scalar("SELECT picture FROM codex.user WHERE id = $1 FOR UPDATE")
                .bind(id.as_i32())
                .fetch_optional(&mut *tx)
                .await?;
        let previous = previous.ok_or(RepositoryError::NotFound)?;

        sqlx::query("UPDATE codex.user SET picture = $2, updated_at = now() WHERE id = $1")
            .bind(id.as_i32())
            .bind(picture)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(previous)
    }

    #[instrument(skip(self))]
    async fn set_admin_request(
        &self,
        id: UserId,
        status: AdminRequest,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE codex.user SET admin_request = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id.as_i32())
        .bind(status)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn set_admin(&self, id: UserId, is_admin: bool) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE codex.user SET is_admin = $2, admin_request = 'none', updated_at = now() \
             WHERE id = $1",
        )
        .bind(id.as_i32())
        .bind(is_admin)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn pending_admin_requests(&self) -> Result<Vec<User>, RepositoryError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM codex.user \
             WHERE admin_request = 'pending' AND NOT is_admin ORDER BY updated_at, id"
        );
        let rows: Vec<UserRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        rows.into_iter().map(UserRow::into_user).collect()
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let sql = format!("DELETE FROM codex.user WHERE id = $1 RETURNING {USER_COLUMNS}");
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(id.as_i32())
            .fetch_optional(&self.pool)
            .await?;
        row.map(UserRow::into_user).transpose()
    }
}
