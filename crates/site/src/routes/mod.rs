//! HTTP route handlers for the site.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness
//! GET  /health/ready                    - Readiness (content store ping)
//! GET  /                                - Home: categories and counts
//!
//! # Auth
//! GET|POST /login, GET|POST /register, GET /logout
//!
//! # Catalog (public)
//! GET  /{public}                        - List, `?q=` name filter
//! POST /npcs                            - NPC search form
//! GET  /{public}/{id}                   - Detail
//! GET  /weapons/all                     - Every weapon, ungrouped
//! GET  /weapon_groups[/{id}], /armor_sets[/{id}]
//!
//! # JSON API
//! GET    /api/{public}/{id}             - Item as JSON
//! POST   /api/{public}/{id}             - Update (admin)
//! DELETE /api/{public}/{id}/delete      - Idempotent delete (admin)
//!
//! # Profile (logged in)
//! GET  /profile
//! POST /profile/upload_picture, /profile/remove_picture, /profile/update,
//!      /profile/request-admin, /profile/delete
//!
//! # Editor (admin)
//! GET  /editor, /editor/{section}
//! GET  /editor/{editor}
//! GET|POST /editor/{editor}/add
//! GET  /editor/{editor}/modify          GET|POST /editor/{editor}/modify/{id}
//! GET  /editor/{editor}/delete          GET|POST /editor/{editor}/delete/{id}
//! GET  /editor/{editor}/{group}/delete  GET|POST /editor/{editor}/{group}/delete/{id}
//! POST /editor/requests/{user_id}/approve, /editor/requests/{user_id}/deny
//!
//! # Legacy (308)
//! /manage_npc, /add_new_npc, /npc/{id}
//! ```
//!
//! Paths are spelled out per category so literal segments such as
//! `/weapons/all` always win over `{id}`.

pub mod api;
pub mod auth;
pub mod catalog;
pub mod editor;
pub mod home;
pub mod legacy;
pub mod profile;
mod submission;

use std::str::FromStr;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Router,
    extract::{FromRequestParts, Path, Request, State},
    http::{StatusCode, request::Parts},
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Response},
    routing::get,
};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tower_sessions::{SessionManagerLayer, SessionStore};

use grace_codex_core::{Category, GroupKind};

use crate::error::AppError;
use crate::filters;
use crate::middleware::{
    Viewer, request_id_middleware, resolve_viewer, security_headers_middleware,
};
use crate::state::AppState;
use crate::views::Chrome;

/// Stylesheets and other assets, relative to the workspace root.
pub const STATIC_DIR: &str = "crates/site/static";

/// Build the complete application router.
///
/// Sentry layers are left to the binary so tests run without a client.
pub fn app<S>(state: AppState, session_layer: SessionManagerLayer<S>) -> Router
where
    S: SessionStore + Clone,
{
    let uploads = ServeDir::new(state.config().upload_dir.clone());

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes(&state))
        .nest_service("/static", ServeDir::new(STATIC_DIR))
        .nest_service("/uploads", uploads)
        .fallback(not_found)
        .layer(from_fn_with_state(state.clone(), resolve_viewer))
        .layer(session_layer)
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .layer(from_fn(security_headers_middleware))
        .with_state(state)
}

/// All page and API routes.
fn routes(state: &AppState) -> Router<AppState> {
    let mut router = Router::new()
        .route("/", get(home::home))
        .merge(auth::routes())
        .merge(profile::routes(state.config().max_upload_bytes))
        .merge(editor::routes())
        .merge(legacy::routes());

    for category in Category::ALL {
        router = router
            .merge(catalog::routes(category))
            .merge(api::routes(category))
            .merge(editor::category_routes(category));
    }
    for kind in GroupKind::ALL {
        router = router.merge(catalog::group_routes(kind));
    }

    router
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the content store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.content().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// Not-found page template.
#[derive(Template, WebTemplate)]
#[template(path = "error.html")]
struct NotFoundTemplate {
    chrome: Chrome,
    status: u16,
    message: String,
}

/// Fallback for unmatched paths.
async fn not_found(viewer: Viewer) -> Response {
    let page = NotFoundTemplate {
        chrome: Chrome::for_viewer(&viewer),
        status: StatusCode::NOT_FOUND.as_u16(),
        message: "Page not found".to_string(),
    };
    (StatusCode::NOT_FOUND, page).into_response()
}

/// Single path parameter parsed as `T`.
///
/// A segment that does not parse is a missing page, never a bad request.
#[derive(Debug)]
pub struct IdPath<T>(pub T);

impl<S, T> FromRequestParts<S> for IdPath<T>
where
    S: Send + Sync,
    T: FromStr + Send,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::NotFound(e.body_text()))?;

        raw.parse()
            .map(Self)
            .map_err(|_| AppError::NotFound(format!("no record with id {raw:?}")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;
    use tower_sessions::MemoryStore;

    use super::*;
    use crate::config::SiteConfig;
    use crate::db::{MemoryContentStore, MemoryUserDirectory};
    use crate::middleware::create_session_layer;

    fn test_app(upload_dir: &std::path::Path) -> Router {
        let config = SiteConfig {
            database_url: secrecy::SecretString::from("postgres://unused"),
            host: std::net::Ipv4Addr::LOCALHOST.into(),
            port: 3000,
            base_url: "http://localhost:3000".parse().unwrap(),
            upload_dir: upload_dir.to_path_buf(),
            max_upload_bytes: 1024,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        };
        let session_layer = create_session_layer(MemoryStore::default(), &config);
        let state = AppState::new(
            config,
            Arc::new(MemoryContentStore::new()),
            Arc::new(MemoryUserDirectory::new()),
        );
        app(state, session_layer)
    }

    async fn status_of(app: Router, uri: &str) -> StatusCode {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_health_routes() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(status_of(test_app(dir.path()), "/health").await, StatusCode::OK);
        assert_eq!(
            status_of(test_app(dir.path()), "/health/ready").await,
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn test_unknown_paths_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        for uri in ["/nope", "/armors/abc", "/armors/999", "/editor-x", "/api/armors/x"] {
            assert_eq!(
                status_of(test_app(dir.path()), uri).await,
                StatusCode::NOT_FOUND,
                "{uri}"
            );
        }
    }

    #[tokio::test]
    async fn test_public_lists_render() {
        let dir = tempfile::tempdir().unwrap();
        for category in Category::ALL {
            let uri = format!("/{}", category.public_slug());
            assert_eq!(status_of(test_app(dir.path()), &uri).await, StatusCode::OK, "{uri}");
        }
        assert_eq!(
            status_of(test_app(dir.path()), "/weapons/all").await,
            StatusCode::OK
        );
        assert_eq!(
            status_of(test_app(dir.path()), "/armor_sets").await,
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn test_editor_requires_login() {
        let dir = tempfile::tempdir().unwrap();
        let response = test_app(dir.path())
            .oneshot(
                Request::builder()
                    .uri("/editor/armor")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], "/login");
    }
}
