//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::SiteConfig;
use crate::db::{ContentStore, UserDirectory};
use crate::services::AvatarStorage;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. The stores are trait objects
/// so the same router runs against `PostgreSQL` in production and against
/// the in-memory stores in tests.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: SiteConfig,
    content: Arc<dyn ContentStore>,
    users: Arc<dyn UserDirectory>,
    avatars: AvatarStorage,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Site configuration
    /// * `content` - Content store for every category
    /// * `users` - Account directory
    #[must_use]
    pub fn new(
        config: SiteConfig,
        content: Arc<dyn ContentStore>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        let avatars = AvatarStorage::new(config.upload_dir.clone(), config.max_upload_bytes);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                content,
                users,
                avatars,
            }),
        }
    }

    /// Get a reference to the site configuration.
    #[must_use]
    pub fn config(&self) -> &SiteConfig {
        &self.inner.config
    }

    /// Get a reference to the content store.
    #[must_use]
    pub fn content(&self) -> &dyn ContentStore {
        self.inner.content.as_ref()
    }

    /// Get a reference to the user directory.
    #[must_use]
    pub fn users(&self) -> &dyn UserDirectory {
        self.inner.users.as_ref()
    }

    /// Get a reference to the profile picture storage.
    #[must_use]
    pub fn avatars(&self) -> &AvatarStorage {
        &self.inner.avatars
    }
}
