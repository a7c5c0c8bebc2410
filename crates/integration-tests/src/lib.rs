//! End-to-end test harness for Grace Codex.
//!
//! Drives the full router (sessions, gates, templates) with
//! `tower::ServiceExt::oneshot` over in-memory stores, so no database or
//! network is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p grace-codex-integration-tests
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, Response, header};
use tempfile::TempDir;
use tower::ServiceExt;
use tower_sessions::MemoryStore;

use grace_codex_core::{
    Category, ContentGroup, ContentItem, GroupId, GroupKind, ItemDraft, ItemId, Username,
};
use grace_codex_site::config::SiteConfig;
use grace_codex_site::db::{
    ContentStore, MemoryContentStore, MemoryUserDirectory, RepositoryError, UserDirectory,
};
use grace_codex_site::middleware::{SESSION_COOKIE_NAME, create_session_layer};
use grace_codex_site::models::User;
use grace_codex_site::routes;
use grace_codex_site::state::AppState;

/// Password used for every account the harness registers.
pub const PASSWORD: &str = "erdtree-shadow";

// =============================================================================
// Call-counting content store
// =============================================================================

/// Content store that counts every call before delegating to memory.
///
/// Lets tests prove a request was stopped before it reached storage.
#[derive(Default)]
pub struct CountingContentStore {
    inner: MemoryContentStore,
    calls: AtomicUsize,
    mutations: AtomicUsize,
}

impl CountingContentStore {
    /// Every call of any kind.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Calls that could change data.
    pub fn mutations(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    /// The wrapped store, for seeding without touching the counters.
    pub const fn inner(&self) -> &MemoryContentStore {
        &self.inner
    }

    fn read(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn write(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.mutations.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ContentStore for CountingContentStore {
    async fn list(&self, category: Category) -> Result<Vec<ContentItem>, RepositoryError> {
        self.read();
        self.inner.list(category).await
    }

    async fn count(&self, category: Category) -> Result<i64, RepositoryError> {
        self.read();
        self.inner.count(category).await
    }

    async fn get(
        &self,
        category: Category,
        id: ItemId,
    ) -> Result<Option<ContentItem>, RepositoryError> {
        self.read();
        self.inner.get(category, id).await
    }

    async fn insert(&self, draft: &ItemDraft) -> Result<ItemId, RepositoryError> {
        self.write();
        self.inner.insert(draft).await
    }

    async fn update(&self, id: ItemId, draft: &ItemDraft) -> Result<bool, RepositoryError> {
        self.write();
        self.inner.update(id, draft).await
    }

    async fn delete(&self, category: Category, id: ItemId) -> Result<bool, RepositoryError> {
        self.write();
        self.inner.delete(category, id).await
    }

    async fn list_groups(&self, kind: GroupKind) -> Result<Vec<ContentGroup>, RepositoryError> {
        self.read();
        self.inner.list_groups(kind).await
    }

    async fn get_group(
        &self,
        kind: GroupKind,
        id: GroupId,
    ) -> Result<Option<ContentGroup>, RepositoryError> {
        self.read();
        self.inner.get_group(kind, id).await
    }

    async fn group_members(
        &self,
        kind: GroupKind,
        id: GroupId,
    ) -> Result<Vec<ContentItem>, RepositoryError> {
        self.read();
        self.inner.group_members(kind, id).await
    }

    async fn create_group(
        &self,
        kind: GroupKind,
        name: &str,
        description: Option<&str>,
    ) -> Result<GroupId, RepositoryError> {
        self.write();
        self.inner.create_group(kind, name, description).await
    }

    async fn delete_group(&self, kind: GroupKind, id: GroupId) -> Result<bool, RepositoryError> {
        self.write();
        self.inner.delete_group(kind, id).await
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        self.read();
        self.inner.ping().await
    }
}

// =============================================================================
// Test application
// =============================================================================

/// A fully wired site over in-memory stores.
pub struct TestApp {
    router: Router,
    pub content: Arc<CountingContentStore>,
    pub users: Arc<MemoryUserDirectory>,
    uploads: TempDir,
}

impl TestApp {
    /// Build a fresh site with empty stores.
    ///
    /// # Panics
    ///
    /// Panics if the upload directory cannot be created.
    pub fn new() -> Self {
        let uploads = tempfile::tempdir().expect("create upload dir");
        let config = SiteConfig {
            database_url: secrecy::SecretString::from("postgres://unused"),
            host: std::net::Ipv4Addr::LOCALHOST.into(),
            port: 3000,
            base_url: "http://localhost:3000".parse().expect("valid base url"),
            upload_dir: uploads.path().to_path_buf(),
            max_upload_bytes: 64 * 1024,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        };

        let content = Arc::new(CountingContentStore::default());
        let users = Arc::new(MemoryUserDirectory::new());
        let session_layer = create_session_layer(MemoryStore::default(), &config);
        let state = AppState::new(config, content.clone(), users.clone());

        Self {
            router: routes::app(state, session_layer),
            content,
            users,
            uploads,
        }
    }

    /// Directory profile pictures are written to.
    pub fn upload_dir(&self) -> &std::path::Path {
        self.uploads.path()
    }

    /// Send a request through the whole stack.
    ///
    /// # Panics
    ///
    /// Panics if the router fails, which it never does for a valid request.
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    /// Send a bodyless request.
    pub async fn request(&self, method: Method, uri: &str, cookie: Option<&str>) -> Response<Body> {
        self.send(build(method, uri, cookie, None, Body::empty())).await
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        self.request(Method::GET, uri, cookie).await
    }

    /// POST an urlencoded form.
    pub async fn post_form(&self, uri: &str, form: &str, cookie: Option<&str>) -> Response<Body> {
        let request = build(
            Method::POST,
            uri,
            cookie,
            Some("application/x-www-form-urlencoded"),
            Body::from(form.to_owned()),
        );
        self.send(request).await
    }

    /// POST a JSON document.
    pub async fn post_json(
        &self,
        uri: &str,
        json: &serde_json::Value,
        cookie: Option<&str>,
    ) -> Response<Body> {
        let request = build(
            Method::POST,
            uri,
            cookie,
            Some("application/json"),
            Body::from(json.to_string()),
        );
        self.send(request).await
    }

    /// Register an account through `/register` and return its session cookie.
    ///
    /// # Panics
    ///
    /// Panics if registration does not set a session cookie.
    pub async fn register(&self, username: &str) -> String {
        let form = format!("username={username}&password={PASSWORD}&password_confirm={PASSWORD}");
        let response = self.post_form("/register", &form, None).await;
        session_cookie(&response).expect("registration sets a session cookie")
    }

    /// Log in through `/login` and return the session cookie.
    ///
    /// # Panics
    ///
    /// Panics if the login does not set a session cookie.
    pub async fn login(&self, username: &str) -> String {
        let form = format!("username={username}&password={PASSWORD}");
        let response = self.post_form("/login", &form, None).await;
        session_cookie(&response).expect("login sets a session cookie")
    }

    /// Register an account, grant it editor rights and return its cookie.
    pub async fn admin(&self, username: &str) -> String {
        let cookie = self.register(username).await;
        let user = self.user(username).await;
        self.users
            .set_admin(user.id, true)
            .await
            .expect("grant editor rights");
        cookie
    }

    /// Look up an account by name.
    ///
    /// # Panics
    ///
    /// Panics if the account does not exist.
    pub async fn user(&self, username: &str) -> User {
        let username = Username::parse(username).expect("valid username");
        self.users
            .by_username(&username)
            .await
            .expect("memory store never fails")
            .expect("account exists")
    }

    /// Insert an item without going through the counters.
    ///
    /// # Panics
    ///
    /// Panics if the fields do not validate.
    pub async fn seed_item(&self, category: Category, fields: &[(&str, &str)]) -> ItemId {
        let submission: BTreeMap<String, String> = fields
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        let draft = ItemDraft::from_submission(category, &submission).expect("valid seed item");
        self.content
            .inner()
            .insert(&draft)
            .await
            .expect("insert seed item")
    }

    /// Create a group without going through the counters.
    pub async fn seed_group(&self, kind: GroupKind, name: &str) -> GroupId {
        self.content
            .inner()
            .create_group(kind, name, None)
            .await
            .expect("create seed group")
    }

    /// Read an item straight from storage.
    pub async fn item(&self, category: Category, id: ItemId) -> Option<ContentItem> {
        self.content
            .inner()
            .get(category, id)
            .await
            .expect("memory store never fails")
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

fn build(
    method: Method,
    uri: &str,
    cookie: Option<&str>,
    content_type: Option<&str>,
    body: Body,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    builder.body(body).expect("valid request")
}

// =============================================================================
// Response helpers
// =============================================================================

/// The `name=value` pair of the session cookie, if the response sets one.
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .find(|pair| pair.starts_with(&format!("{SESSION_COOKIE_NAME}=")))
        .map(str::to_owned)
}

/// The `Location` header, or an empty string.
pub fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// Collect the body as text.
///
/// # Panics
///
/// Panics if the body cannot be read or is not UTF-8.
pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

/// Collect the body as JSON.
///
/// # Panics
///
/// Panics if the body is not JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_str(&body_text(response).await).expect("json body")
}
