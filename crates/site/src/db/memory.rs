//! In-memory stores.
//!
//! Same behavior as the `PostgreSQL` stores, kept in a `tokio::sync::RwLock`.
//! Each mutating call takes the write lock once, so it is atomic with
//! respect to every other call. Used by the test suites and for running the
//! site without a database.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use grace_codex_core::{
    AdminRequest, Category, ContentGroup, ContentItem, GroupChange, GroupId, GroupKind, ItemDraft,
    ItemId, UserId, Username,
};

use super::{ContentStore, RepositoryError, UserDirectory};
use crate::models::User;

// =============================================================================
// Content
// =============================================================================

#[derive(Default)]
struct ContentState {
    items: HashMap<Category, BTreeMap<ItemId, ContentItem>>,
    groups: HashMap<GroupKind, BTreeMap<GroupId, ContentGroup>>,
    last_item_id: HashMap<Category, i32>,
    last_group_id: HashMap<GroupKind, i32>,
}

impl ContentState {
    fn check_group(&self, draft: &ItemDraft) -> Result<(), RepositoryError> {
        let (Some(kind), GroupChange::Set(id)) = (draft.category.group_kind(), draft.group) else {
            return Ok(());
        };
        if self.groups.get(&kind).is_some_and(|g| g.contains_key(&id)) {
            Ok(())
        } else {
            Err(RepositoryError::Conflict("group does not exist".to_owned()))
        }
    }
}

fn sorted(mut items: Vec<ContentItem>) -> Vec<ContentItem> {
    items.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then(a.id.cmp(&b.id))
    });
    items
}

/// Content store held in process memory.
#[derive(Default)]
pub struct MemoryContentStore {
    state: RwLock<ContentState>,
}

impl MemoryContentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn list(&self, category: Category) -> Result<Vec<ContentItem>, RepositoryError> {
        let state = self.state.read().await;
        let items = state
            .items
            .get(&category)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default();
        Ok(sorted(items))
    }

    async fn count(&self, category: Category) -> Result<i64, RepositoryError> {
        let state = self.state.read().await;
        let count = state.items.get(&category).map_or(0, BTreeMap::len);
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    async fn get(
        &self,
        category: Category,
        id: ItemId,
    ) -> Result<Option<ContentItem>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .items
            .get(&category)
            .and_then(|m| m.get(&id))
            .cloned())
    }

    async fn insert(&self, draft: &ItemDraft) -> Result<ItemId, RepositoryError> {
        let mut state = self.state.write().await;
        state.check_group(draft)?;

        let last = state.last_item_id.entry(draft.category).or_insert(0);
        *last += 1;
        let id = ItemId::new(*last);

        let item = draft.clone().into_item(id, Utc::now());
        state
            .items
            .entry(draft.category)
            .or_default()
            .insert(id, item);
        Ok(id)
    }

    async fn update(&self, id: ItemId, draft: &ItemDraft) -> Result<bool, RepositoryError> {
        let mut state = self.state.write().await;
        state.check_group(draft)?;

        match state
            .items
            .get_mut(&draft.category)
            .and_then(|m| m.get_mut(&id))
        {
            Some(item) => {
                draft.apply_to(item, Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, category: Category, id: ItemId) -> Result<bool, RepositoryError> {
        let mut state = self.state.write().await;
        Ok(state
            .items
            .get_mut(&category)
            .is_some_and(|m| m.remove(&id).is_some()))
    }

    async fn list_groups(&self, kind: GroupKind) -> Result<Vec<ContentGroup>, RepositoryError> {
        let state = self.state.read().await;
        let mut groups: Vec<ContentGroup> = state
            .groups
            .get(&kind)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default();
        groups.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then(a.id.cmp(&b.id))
        });
        Ok(groups)
    }

    async fn get_group(
        &self,
        kind: GroupKind,
        id: GroupId,
    ) -> Result<Option<ContentGroup>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.groups.get(&kind).and_then(|m| m.get(&id)).cloned())
    }

    async fn group_members(
        &self,
        kind: GroupKind,
        id: GroupId,
    ) -> Result<Vec<ContentItem>, RepositoryError> {
        let state = self.state.read().await;
        let members = state
            .items
            .get(&kind.member_category())
            .map(|m| {
                m.values()
                    .filter(|item| item.group_id == Some(id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(sorted(members))
    }

    async fn create_group(
        &self,
        kind: GroupKind,
        name: &str,
        description: Option<&str>,
    ) -> Result<GroupId, RepositoryError> {
        let mut state = self.state.write().await;
        if state
            .groups
            .get(&kind)
            .is_some_and(|m| m.values().any(|g| g.name == name))
        {
            return Err(RepositoryError::Conflict(
                "group name already exists".to_owned(),
            ));
        }

        let last = state.last_group_id.entry(kind).or_insert(0);
        *last += 1;
        let id = GroupId::new(*last);

        state.groups.entry(kind).or_default().insert(
            id,
            ContentGroup {
                id,
                kind,
                name: name.to_owned(),
                description: description.map(str::to_owned),
            },
        );
        Ok(id)
    }

    async fn delete_group(&self, kind: GroupKind, id: GroupId) -> Result<bool, RepositoryError> {
        let mut state = self.state.write().await;
        let removed = state
            .groups
            .get_mut(&kind)
            .is_some_and(|m| m.remove(&id).is_some());

        if removed && let Some(items) = state.items.get_mut(&kind.member_category()) {
            for item in items.values_mut().filter(|i| i.group_id == Some(id)) {
                item.group_id = None;
            }
        }
        Ok(removed)
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

// =============================================================================
// Users
// =============================================================================

#[derive(Default)]
struct UserState {
    users: BTreeMap<UserId, (User, String)>,
    last_id: i32,
}

/// User directory held in process memory.
#[derive(Default)]
pub struct MemoryUserDirectory {
    state: RwLock<UserState>,
}

impl MemoryUserDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.users.get(&id).map(|(u, _)| u.clone()))
    }

    async fn by_username(&self, username: &Username) -> Result<Option<User>, RepositoryError> {
        Ok(self.credentials(username).await?.map(|(u, _)| u))
    }

    async fn credentials(
        &self,
        username: &Username,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|(u, _)| &u.username == username)
            .cloned())
    }

    async fn create(
        &self,
        username: &Username,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let mut state = self.state.write().await;
        if state.users.values().any(|(u, _)| &u.username == username) {
            return Err(RepositoryError::Conflict(
                "username already exists".to_owned(),
            ));
        }

        state.last_id += 1;
        let now = Utc::now();
        let user = User {
            id: UserId::new(state.last_id),
            username: username.clone(),
            display_name: None,
            bio: None,
            picture: None,
            is_admin: false,
            admin_request: AdminRequest::None,
            created_at: now,
            updated_at: now,
        };
        state
            .users
            .insert(user.id, (user.clone(), password_hash.to_owned()));
        Ok(user)
    }

    async fn update_profile(
        &self,
        id: UserId,
        display_name: Option<&str>,
        bio: Option<&str>,
    ) -> Result<Option<User>, RepositoryError> {
        let mut state = self.state.write().await;
        Ok(state.users.get_mut(&id).map(|(u, _)| {
            u.display_name = display_name.map(str::to_owned);
            u.bio = bio.map(str::to_owned);
            u.updated_at = Utc::now();
            u.clone()
        }))
    }

    async fn set_picture(
        &self,
        id: UserId,
        picture: Option<&str>,
    ) -> Result<Option<String>, RepositoryError> {
        let mut state = self.state.write().await;
        let (user, _) = state.users.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        user.updated_at = Utc::now();
        Ok(std::mem::replace(
            &mut user.picture,
            picture.map(str::to_owned),
        ))
    }

    async fn set_admin_request(
        &self,
        id: UserId,
        status: AdminRequest,
    ) -> Result<bool, RepositoryError> {
        let mut state = self.state.write().await;
        Ok(state
            .users
            .get_mut(&id)
            .map(|(u, _)| {
                u.admin_request = status;
                u.updated_at = Utc::now();
            })
            .is_some())
    }

    async fn set_admin(&self, id: UserId, is_admin: bool) -> Result<bool, RepositoryError> {
        let mut state = self.state.write().await;
        Ok(state
            .users
            .get_mut(&id)
            .map(|(u, _)| {
                u.is_admin = is_admin;
                u.admin_request = AdminRequest::None;
                u.updated_at = Utc::now();
            })
            .is_some())
    }

    async fn pending_admin_requests(&self) -> Result<Vec<User>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .filter(|(u, _)| u.admin_request == AdminRequest::Pending && !u.is_admin)
            .map(|(u, _)| u.clone())
            .collect())
    }

    async fn delete(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let mut state = self.state.write().await;
        Ok(state.users.remove(&id).map(|(u, _)| u))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn draft(category: Category, pairs: &[(&str, &str)]) -> ItemDraft {
        let submission = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        ItemDraft::from_submission(category, &submission).unwrap()
    }

    fn helm(group: &str) -> ItemDraft {
        draft(
            Category::Armor,
            &[
                ("name", "Carian Knight Helm"),
                ("slot", "head"),
                ("weight", "4.1"),
                ("group_id", group),
            ],
        )
    }

    #[tokio::test]
    async fn test_ids_are_per_category() {
        let store = MemoryContentStore::new();
        let npc = store
            .insert(&draft(Category::Npc, &[("name", "Roderika"), ("location", "Stormhill")]))
            .await
            .unwrap();
        let armor = store.insert(&helm("")).await.unwrap();
        assert_eq!(npc, ItemId::new(1));
        assert_eq!(armor, ItemId::new(1));
        assert_eq!(store.count(Category::Npc).await.unwrap(), 1);
        assert_eq!(store.count(Category::Weapon).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_group_is_rejected_without_write() {
        let store = MemoryContentStore::new();
        let err = store.insert(&helm("99")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
        assert!(store.list(Category::Armor).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = MemoryContentStore::new();
        let id = store.insert(&helm("")).await.unwrap();
        assert!(store.delete(Category::Armor, id).await.unwrap());
        assert!(!store.delete(Category::Armor, id).await.unwrap());
        assert!(!store.delete(Category::Npc, ItemId::new(42)).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_group_orphans_members() {
        let store = MemoryContentStore::new();
        let set = store
            .create_group(GroupKind::ArmorSet, "Carian Knight Set", None)
            .await
            .unwrap();
        let id = store.insert(&helm(&set.to_string())).await.unwrap();
        assert_eq!(
            store
                .group_members(GroupKind::ArmorSet, set)
                .await
                .unwrap()
                .len(),
            1
        );

        assert!(store.delete_group(GroupKind::ArmorSet, set).await.unwrap());
        let item = store.get(Category::Armor, id).await.unwrap().unwrap();
        assert_eq!(item.group_id, None);
    }

    #[tokio::test]
    async fn test_list_is_sorted_case_insensitively() {
        let store = MemoryContentStore::new();
        for name in ["rivers of Blood", "Moonveil", "Bloodhound's Fang"] {
            store
                .insert(&draft(
                    Category::Weapon,
                    &[("name", name), ("attack_power", "100"), ("weight", "5")],
                ))
                .await
                .unwrap();
        }
        let names: Vec<String> = store
            .list(Category::Weapon)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, ["Bloodhound's Fang", "Moonveil", "rivers of Blood"]);
    }

    #[tokio::test]
    async fn test_user_lifecycle() {
        let users = MemoryUserDirectory::new();
        let name = Username::parse("nepheli").unwrap();
        let user = users.create(&name, "hash").await.unwrap();
        assert!(matches!(
            users.create(&name, "other").await,
            Err(RepositoryError::Conflict(_))
        ));

        assert!(
            users
                .set_admin_request(user.id, AdminRequest::Pending)
                .await
                .unwrap()
        );
        assert_eq!(users.pending_admin_requests().await.unwrap().len(), 1);

        assert!(users.set_admin(user.id, true).await.unwrap());
        let promoted = users.by_id(user.id).await.unwrap().unwrap();
        assert!(promoted.is_admin);
        assert_eq!(promoted.admin_request, AdminRequest::None);
        assert!(users.pending_admin_requests().await.unwrap().is_empty());

        assert_eq!(users.set_picture(user.id, Some("a.png")).await.unwrap(), None);
        assert_eq!(
            users.set_picture(user.id, None).await.unwrap().as_deref(),
            Some("a.png")
        );

        assert!(users.delete(user.id).await.unwrap().is_some());
        assert!(users.by_id(user.id).await.unwrap().is_none());
    }
}
