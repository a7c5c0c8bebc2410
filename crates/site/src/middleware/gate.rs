//! Capability gates.
//!
//! Gates run as route layers before any handler, so a refused request never
//! reaches a store. Page routes redirect to the login page; `/api/` routes
//! get a bare status code.

use axum::{
    extract::{FromRequestParts, Request},
    http::{StatusCode, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use grace_codex_core::Capability;

use super::Viewer;
use crate::models::User;

/// Why a gate refused a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    /// Anonymous visitor on a page route.
    RedirectToLogin,
    /// Logged-in non-admin on an admin page route.
    AdminRequired,
    /// Anonymous visitor on an API route.
    Unauthorized,
    /// Logged-in non-admin on an admin API route.
    Forbidden,
}

impl AuthRejection {
    /// Rejection for a viewer lacking `required`.
    #[must_use]
    pub fn for_viewer(viewer: &Viewer, required: Capability, is_api: bool) -> Option<Self> {
        if viewer.capability().allows(required) {
            return None;
        }
        let anonymous = viewer.user().is_none();
        Some(match (is_api, anonymous) {
            (true, true) => Self::Unauthorized,
            (true, false) => Self::Forbidden,
            (false, true) => Self::RedirectToLogin,
            (false, false) => Self::AdminRequired,
        })
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/login").into_response(),
            Self::AdminRequired => Redirect::to("/login?error=admin_required").into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            Self::Forbidden => StatusCode::FORBIDDEN.into_response(),
        }
    }
}

fn is_api(path: &str) -> bool {
    path.starts_with("/api/")
}

async fn gate(viewer: &Viewer, required: Capability, request: Request, next: Next) -> Response {
    let api = is_api(request.uri().path());
    match AuthRejection::for_viewer(viewer, required, api) {
        Some(rejection) => {
            tracing::debug!(
                path = %request.uri().path(),
                capability = %viewer.capability(),
                ?rejection,
                "request refused"
            );
            rejection.into_response()
        }
        None => next.run(request).await,
    }
}

/// Route layer: any logged-in user.
pub async fn require_user_page(viewer: Viewer, request: Request, next: Next) -> Response {
    gate(&viewer, Capability::User, request, next).await
}

/// Route layer: admins only, page flavor.
pub async fn require_admin_page(viewer: Viewer, request: Request, next: Next) -> Response {
    gate(&viewer, Capability::Admin, request, next).await
}

/// Route layer: admins only, API flavor.
pub async fn require_admin_api(viewer: Viewer, request: Request, next: Next) -> Response {
    gate(&viewer, Capability::Admin, request, next).await
}

/// Extractor for handlers that need the logged-in account.
///
/// # Example
///
/// ```rust,ignore
/// async fn profile(RequireUser(user): RequireUser) -> impl IntoResponse {
///     format!("Hello, {}!", user.shown_name())
/// }
/// ```
pub struct RequireUser(pub User);

impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let viewer = Viewer::from_parts(parts);
        if let Some(rejection) =
            AuthRejection::for_viewer(&viewer, Capability::User, is_api(parts.uri.path()))
        {
            return Err(rejection);
        }
        match viewer {
            Viewer::User(user) => Ok(Self(user)),
            Viewer::Anonymous => Err(AuthRejection::RedirectToLogin),
        }
    }
}

/// Extractor for handlers that need an admin account.
pub struct RequireAdmin(pub User);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let viewer = Viewer::from_parts(parts);
        if let Some(rejection) =
            AuthRejection::for_viewer(&viewer, Capability::Admin, is_api(parts.uri.path()))
        {
            return Err(rejection);
        }
        match viewer {
            Viewer::User(user) => Ok(Self(user)),
            Viewer::Anonymous => Err(AuthRejection::RedirectToLogin),
        }
    }
}
