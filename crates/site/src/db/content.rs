//! `PostgreSQL` content store.
//!
//! Each category lives in its own table with the same shape:
//!
//! ```text
//! id serial, name text, [group_id int], attributes jsonb, created_at, updated_at
//! ```
//!
//! Only `weapon` and `armor` carry `group_id`, referencing `weapon_group`
//! and `armor_set` with `ON DELETE SET NULL`. Table names come from
//! [`Category::table`] and are never user input.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::instrument;

use grace_codex_core::{Category, ContentGroup, ContentItem, GroupId, GroupKind, ItemDraft, ItemId};

use super::{ContentStore, RepositoryError, map_constraint};

/// Content store backed by the `codex` schema.
#[derive(Clone)]
pub struct PgContentStore {
    pool: PgPool,
}

impl PgContentStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ItemRow {
    id: i32,
    name: String,
    group_id: Option<i32>,
    attributes: Json<BTreeMap<String, String>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ItemRow {
    fn into_item(self, category: Category) -> ContentItem {
        ContentItem {
            id: ItemId::new(self.id),
            category,
            name: self.name,
            group_id: self.group_id.map(GroupId::new),
            attributes: self.attributes.0,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct GroupRow {
    id: i32,
    name: String,
    description: Option<String>,
}

impl GroupRow {
    fn into_group(self, kind: GroupKind) -> ContentGroup {
        ContentGroup {
            id: GroupId::new(self.id),
            kind,
            name: self.name,
            description: self.description,
        }
    }
}

/// Column list for item selects. Categories without groups report `NULL`.
fn item_columns(category: Category) -> &'static str {
    if category.group_kind().is_some() {
        "id, name, group_id, attributes, created_at, updated_at"
    } else {
        "id, name, NULL::integer AS group_id, attributes, created_at, updated_at"
    }
}

#[async_trait]
impl ContentStore for PgContentStore {
    #[instrument(skip(self))]
    async fn list(&self, category: Category) -> Result<Vec<ContentItem>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM codex.{} ORDER BY lower(name), id",
            item_columns(category),
            category.table()
        );
        let rows: Vec<ItemRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|r| r.into_item(category)).collect())
    }

    #[instrument(skip(self))]
    async fn count(&self, category: Category) -> Result<i64, RepositoryError> {
        let sql = format!("SELECT count(*) FROM codex.{}", category.table());
        let count: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(count)
    }

    #[instrument(skip(self))]
    async fn get(
        &self,
        category: Category,
        id: ItemId,
    ) -> Result<Option<ContentItem>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM codex.{} WHERE id = $1",
            item_columns(category),
            category.table()
        );
        let row: Option<ItemRow> = sqlx::query_as(&sql)
            .bind(id.as_i32())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.into_item(category)))
    }

    #[instrument(skip(self, draft), fields(category = %draft.category))]
    async fn insert(&self, draft: &ItemDraft) -> Result<ItemId, RepositoryError> {
        let category = draft.category;
        let attributes = draft.initial_attributes();

        let id = if category.group_kind().is_some() {
            let sql = format!(
                "INSERT INTO codex.{} (name, group_id, attributes) VALUES ($1, $2, $3) RETURNING id",
                category.table()
            );
            sqlx::query_scalar::<_, i32>(&sql)
                .bind(&draft.name)
                .bind(draft.initial_group().map(|g| g.as_i32()))
                .bind(Json(&attributes))
                .fetch_one(&self.pool)
                .await
        } else {
            let sql = format!(
                "INSERT INTO codex.{} (name, attributes) VALUES ($1, $2) RETURNING id",
                category.table()
            );
            sqlx::query_scalar::<_, i32>(&sql)
                .bind(&draft.name)
                .bind(Json(&attributes))
                .fetch_one(&self.pool)
                .await
        }
        .map_err(|e| map_constraint(e, "group does not exist"))?;

        Ok(ItemId::new(id))
    }

    #[instrument(skip(self, draft), fields(category = %draft.category))]
    async fn update(&self, id: ItemId, draft: &ItemDraft) -> Result<bool, RepositoryError> {
        let category = draft.category;
        let mut tx = self.pool.begin().await?;

        let select = format!(
            "SELECT {} FROM codex.{} WHERE id = $1 FOR UPDATE",
            item_columns(category),
            category.table()
        );
        let row: Option<ItemRow> = sqlx::query_as(&select)
            .bind(id.as_i32())
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            return Ok(false);
        };

        let mut item = row.into_item(category);
        draft.apply_to(&mut item, Utc::now());

        let has_group = category.group_kind().is_some();
        let sql = format!(
            "UPDATE codex.{} SET name = $2, attributes = $3, updated_at = $4{} WHERE id = $1",
            category.table(),
            if has_group { ", group_id = $5" } else { "" }
        );
        let mut query = sqlx::query(&sql)
            .bind(id.as_i32())
            .bind(&item.name)
            .bind(Json(&item.attributes))
            .bind(item.updated_at);
        if has_group {
            query = query.bind(item.group_id.map(|g| g.as_i32()));
        }
        query
            .execute(&mut *tx)
            .await
            .map_err(|e| map_constraint(e, "group does not exist"))?;

        tx.commit().await?;
        Ok(true)
    }

    #[instrument(skip(self))]
    async fn delete(&self, category: Category, id: ItemId) -> Result<bool, RepositoryError> {
        let sql = format!("DELETE FROM codex.{} WHERE id = $1", category.table());
        let result = sqlx::query(&sql)
            .bind(id.as_i32())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn list_groups(&self, kind: GroupKind) -> Result<Vec<ContentGroup>, RepositoryError> {
        let sql = format!(
            "SELECT id, name, description FROM codex.{} ORDER BY lower(name), id",
            kind.table()
        );
        let rows: Vec<GroupRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|r| r.into_group(kind)).collect())
    }

    #[instrument(skip(self))]
    async fn get_group(
        &self,
        kind: GroupKind,
        id: GroupId,
    ) -> Result<Option<ContentGroup>, RepositoryError> {
        let sql = format!(
            "SELECT id, name, description FROM codex.{} WHERE id = $1",
            kind.table()
        );
        let row: Option<GroupRow> = sqlx::query_as(&sql)
            .bind(id.as_i32())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.into_group(kind)))
    }

    #[instrument(skip(self))]
    async fn group_members(
        &self,
        kind: GroupKind,
        id: GroupId,
    ) -> Result<Vec<ContentItem>, RepositoryError> {
        let category = kind.member_category();
        let sql = format!(
            "SELECT {} FROM codex.{} WHERE group_id = $1 ORDER BY lower(name), id",
            item_columns(category),
            category.table()
        );
        let rows: Vec<ItemRow> = sqlx::query_as(&sql)
            .bind(id.as_i32())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|r| r.into_item(category)).collect())
    }

    #[instrument(skip(self, description))]
    async fn create_group(
        &self,
        kind: GroupKind,
        name: &str,
        description: Option<&str>,
    ) -> Result<GroupId, RepositoryError> {
        let sql = format!(
            "INSERT INTO codex.{} (name, description) VALUES ($1, $2) RETURNING id",
            kind.table()
        );
        let id: i32 = sqlx::query_scalar(&sql)
            .bind(name)
            .bind(description)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_constraint(e, "group name already exists"))?;
        Ok(GroupId::new(id))
    }

    #[instrument(skip(self))]
    async fn delete_group(&self, kind: GroupKind, id: GroupId) -> Result<bool, RepositoryError> {
        // Members are orphaned by the ON DELETE SET NULL foreign key.
        let sql = format!("DELETE FROM codex.{} WHERE id = $1", kind.table());
        let result = sqlx::query(&sql)
            .bind(id.as_i32())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_columns_null_group_for_ungrouped_categories() {
        assert!(item_columns(Category::Npc).contains("NULL::integer AS group_id"));
        assert!(!item_columns(Category::Weapon).contains("NULL"));
        assert!(!item_columns(Category::Armor).contains("NULL"));
    }
}
