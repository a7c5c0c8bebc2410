//! Who is making the request.
//!
//! [`resolve_viewer`] runs once per request after the session layer. It
//! reads the user id from the session and looks the account up again, so a
//! session that outlives its account (or whose admin flag was revoked) is
//! judged by the directory, never by what the session remembers.
//!
//! Error pages raised further in are rendered again here, so they carry the
//! same header as every other page.

use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use tower_sessions::Session;

use grace_codex_core::{Capability, UserId};

use crate::error::{ErrorPage, clear_sentry_user, set_sentry_user};
use crate::models::{User, session_keys};
use crate::state::AppState;
use crate::views::Chrome;

/// The account behind the current request, if any.
#[derive(Debug, Clone, Default)]
pub enum Viewer {
    #[default]
    Anonymous,
    User(User),
}

impl Viewer {
    #[must_use]
    pub const fn capability(&self) -> Capability {
        match self {
            Self::Anonymous => Capability::Anonymous,
            Self::User(user) => user.capability(),
        }
    }

    #[must_use]
    pub const fn user(&self) -> Option<&User> {
        match self {
            Self::Anonymous => None,
            Self::User(user) => Some(user),
        }
    }

    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.capability(), Capability::Admin)
    }

    /// Viewer stored by [`resolve_viewer`], anonymous if it never ran.
    #[must_use]
    pub fn from_parts(parts: &Parts) -> Self {
        parts.extensions.get::<Self>().cloned().unwrap_or_default()
    }
}

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}

/// Resolve the session's user and store a [`Viewer`] in the request
/// extensions.
///
/// Lookup failures of any kind resolve to [`Viewer::Anonymous`]. The session
/// itself is left untouched. An [`ErrorPage`] on the way out is rendered
/// again with this viewer's chrome.
pub async fn resolve_viewer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let viewer = match request.extensions().get::<Session>() {
        Some(session) => lookup(&state, session).await,
        None => Viewer::Anonymous,
    };

    match viewer.user() {
        Some(user) => set_sentry_user(&user.id, Some(user.username.as_str())),
        None => clear_sentry_user(),
    }

    request.extensions_mut().insert(viewer.clone());
    let mut response = next.run(request).await;

    match response.extensions_mut().remove::<ErrorPage>() {
        Some(page) => page.render(Chrome::for_viewer(&viewer)),
        None => response,
    }
}

async fn lookup(state: &AppState, session: &Session) -> Viewer {
    let user_id = match session.get::<UserId>(session_keys::USER_ID).await {
        Ok(Some(id)) => id,
        Ok(None) => return Viewer::Anonymous,
        Err(e) => {
            tracing::warn!(error = %e, "unreadable session, treating as anonymous");
            return Viewer::Anonymous;
        }
    };

    match state.users().by_id(user_id).await {
        Ok(Some(user)) => Viewer::User(user),
        Ok(None) => {
            tracing::debug!(%user_id, "session names a missing account");
            Viewer::Anonymous
        }
        Err(e) => {
            tracing::warn!(%user_id, error = %e, "account lookup failed");
            Viewer::Anonymous
        }
    }
}
