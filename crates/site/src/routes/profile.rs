//! Profile route handlers (logged-in users).
//!
//! Every route here sits behind the user gate; handlers take the account
//! from [`RequireUser`].

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Router,
    extract::{DefaultBodyLimit, Multipart, Query, State, multipart::MultipartError},
    http::StatusCode,
    middleware::from_fn,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use grace_codex_core::AdminRequest;

use crate::error::{AppError, Result, add_breadcrumb, clear_sentry_user};
use crate::filters;
use crate::middleware::{RequireUser, Viewer, require_user_page};
use crate::models::User;
use crate::services::AvatarError;
use crate::state::AppState;
use crate::views::Chrome;

/// Multipart field carrying the picture.
pub const PICTURE_FIELD: &str = "picture";

/// Multipart framing allowance on top of the picture itself.
const MULTIPART_OVERHEAD: usize = 16 * 1024;

/// Create the profile routes router.
pub fn routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/profile", get(show))
        .route(
            "/profile/upload_picture",
            post(upload_picture).layer(DefaultBodyLimit::max(
                max_upload_bytes.saturating_add(MULTIPART_OVERHEAD),
            )),
        )
        .route("/profile/remove_picture", post(remove_picture))
        .route("/profile/update", post(update))
        .route("/profile/request-admin", post(request_admin))
        .route("/profile/delete", post(delete_account))
        .route_layer(from_fn(require_user_page))
}

// =============================================================================
// Form Types
// =============================================================================

/// Profile update form data.
#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub bio: String,
}

/// Query parameters for error/success display.
#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Profile page template.
#[derive(Template, WebTemplate)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub chrome: Chrome,
    pub username: String,
    pub display_name: String,
    pub bio: String,
    pub picture_url: Option<String>,
    pub is_admin: bool,
    pub request_pending: bool,
    pub request_denied: bool,
    pub member_since: String,
    pub max_upload_kib: usize,
    pub display_name_max: usize,
    pub bio_max: usize,
    pub error: Option<String>,
    pub success: Option<String>,
}

fn error_message(code: &str) -> String {
    match code {
        "display_name" => format!(
            "Display names are at most {} characters.",
            User::DISPLAY_NAME_MAX
        ),
        "bio" => format!("Bios are at most {} characters.", User::BIO_MAX),
        "picture_missing" => "Choose a picture to upload.".to_string(),
        "picture_type" => "Pictures must be PNG, JPEG, GIF or WebP.".to_string(),
        "picture_size" => "That picture is too large.".to_string(),
        _ => "Something went wrong. Please try again.".to_string(),
    }
}

fn non_blank(s: &str) -> Option<&str> {
    (!s.is_empty()).then_some(s)
}

fn success_message(code: &str) -> String {
    match code {
        "updated" => "Profile updated.",
        "picture" => "Picture updated.",
        "picture_removed" => "Picture removed.",
        "admin_requested" => "Editor access requested. An admin will review it.",
        _ => "Done.",
    }
    .to_string()
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the profile page.
#[instrument(skip(state, viewer, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    viewer: Viewer,
    RequireUser(user): RequireUser,
    Query(query): Query<MessageQuery>,
) -> impl IntoResponse {
    ProfileTemplate {
        chrome: Chrome::for_viewer(&viewer),
        username: user.username.to_string(),
        display_name: user.display_name.clone().unwrap_or_default(),
        bio: user.bio.clone().unwrap_or_default(),
        picture_url: user.picture_url(),
        is_admin: user.is_admin,
        request_pending: user.admin_request == AdminRequest::Pending,
        request_denied: user.admin_request == AdminRequest::Denied,
        member_since: user.created_at.format("%Y-%m-%d").to_string(),
        max_upload_kib: state.avatars().max_bytes() / 1024,
        display_name_max: User::DISPLAY_NAME_MAX,
        bio_max: User::BIO_MAX,
        error: query.error.as_deref().map(error_message),
        success: query.success.as_deref().map(success_message),
    }
}

/// Update display name and bio. Blank values clear the field.
#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Form(form): Form<ProfileForm>,
) -> Result<Redirect> {
    let display_name = form.display_name.trim();
    let bio = form.bio.trim();

    if display_name.chars().count() > User::DISPLAY_NAME_MAX {
        return Ok(Redirect::to("/profile?error=display_name"));
    }
    if bio.chars().count() > User::BIO_MAX {
        return Ok(Redirect::to("/profile?error=bio"));
    }

    state
        .users()
        .update_profile(user.id, non_blank(display_name), non_blank(bio))
        .await?
        .ok_or_else(|| AppError::NotFound("account".to_string()))?;

    Ok(Redirect::to("/profile?success=updated"))
}

/// Replace the profile picture with the uploaded file.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn upload_picture(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    mut multipart: Multipart,
) -> Result<Response> {
    let mut upload = None;
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return multipart_failure(e),
        };
        if field.name() != Some(PICTURE_FIELD) {
            continue;
        }
        let file_name = field.file_name().map(str::to_owned);
        match field.bytes().await {
            Ok(bytes) => upload = Some((file_name, bytes)),
            Err(e) => return multipart_failure(e),
        }
        break;
    }

    let Some((file_name, bytes)) = upload else {
        return Ok(Redirect::to("/profile?error=picture_missing").into_response());
    };

    let stored = match state
        .avatars()
        .save(user.id, file_name.as_deref(), &bytes)
        .await
    {
        Ok(stored) => stored,
        Err(e) if e.is_client_error() => {
            tracing::info!(error = %e, "picture rejected");
            let code = match e {
                AvatarError::TooLarge { .. } => "picture_size",
                AvatarError::Empty => "picture_missing",
                _ => "picture_type",
            };
            return Ok(Redirect::to(&format!("/profile?error={code}")).into_response());
        }
        Err(e) => return Err(e.into()),
    };

    let previous = match state.users().set_picture(user.id, Some(&stored)).await {
        Ok(previous) => previous,
        Err(e) => {
            // The account row was not updated; the new file is an orphan.
            if let Err(cleanup) = state.avatars().remove(&stored).await {
                tracing::warn!(error = %cleanup, "failed to remove orphaned picture");
            }
            return Err(e.into());
        }
    };
    if let Some(previous) = previous {
        state.avatars().remove(&previous).await?;
    }

    add_breadcrumb("profile", "Uploaded picture", None);
    Ok(Redirect::to("/profile?success=picture").into_response())
}

/// A body cut off by the upload limit is a picture that is too large.
fn multipart_failure(err: MultipartError) -> Result<Response> {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        tracing::info!(error = %err, "picture over the body limit");
        return Ok(Redirect::to("/profile?error=picture_size").into_response());
    }
    Err(AppError::BadRequest(err.body_text()))
}

/// Remove the profile picture.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn remove_picture(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Redirect> {
    if let Some(previous) = state.users().set_picture(user.id, None).await? {
        state.avatars().remove(&previous).await?;
    }
    Ok(Redirect::to("/profile?success=picture_removed"))
}

/// Ask the admins for editor access. Admins have nothing to ask for.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn request_admin(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Redirect> {
    if user.is_admin {
        return Ok(Redirect::to("/profile"));
    }

    state
        .users()
        .set_admin_request(user.id, AdminRequest::Pending)
        .await?;
    tracing::info!("editor access requested");

    Ok(Redirect::to("/profile?success=admin_requested"))
}

/// Delete the account, its picture and the session.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn delete_account(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
) -> Result<Redirect> {
    if let Some(removed) = state.users().delete(user.id).await?
        && let Some(picture) = removed.picture
    {
        state.avatars().remove(&picture).await?;
    }

    session.flush().await?;
    clear_sentry_user();
    tracing::info!("account deleted");

    Ok(Redirect::to("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert!(error_message("display_name").contains("64"));
        assert!(error_message("bio").contains("1000"));
        assert_eq!(success_message("updated"), "Profile updated.");
    }
}
