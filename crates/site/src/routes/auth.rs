//! Authentication route handlers.
//!
//! Username and password accounts. A successful login or registration
//! cycles the session id and stores the account id under `user_id`.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Router,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{add_breadcrumb, clear_sentry_user};
use crate::filters;
use crate::middleware::Viewer;
use crate::models::{User, session_keys};
use crate::services::{AuthError, AuthService};
use crate::state::AppState;
use crate::views::Chrome;

/// Create the auth routes router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_page).post(login))
        .route("/register", get(register_page).post(register))
        .route("/logout", get(logout))
}

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub password: String,
    pub password_confirm: String,
}

/// Query parameters for error display.
#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub chrome: Chrome,
    pub error: Option<String>,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub chrome: Chrome,
    pub error: Option<String>,
    pub min_password_length: usize,
}

/// Human message for an `?error=` code.
fn error_message(code: &str) -> String {
    match code {
        "credentials" => "Invalid username or password.",
        "admin_required" => "That page is for editors. Log in with an admin account.",
        "username" => "Usernames are 3 to 32 letters, digits, '_' or '-'.",
        "password" => "That password is too short.",
        "mismatch" => "Passwords do not match.",
        "taken" => "That username is already taken.",
        "session" => "Could not start your session. Please try again.",
        _ => "Something went wrong. Please try again.",
    }
    .to_string()
}

/// Store the account in a fresh session.
async fn start_session(session: &Session, user: &User) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::USER_ID, user.id).await
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(viewer: Viewer, Query(query): Query<MessageQuery>) -> impl IntoResponse {
    LoginTemplate {
        chrome: Chrome::for_viewer(&viewer),
        error: query.error.as_deref().map(error_message),
    }
}

/// Handle login form submission.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let auth = AuthService::new(state.users());

    match auth.login(&form.username, &form.password).await {
        Ok(user) => {
            if let Err(e) = start_session(&session, &user).await {
                tracing::error!("Failed to set session: {e}");
                return Redirect::to("/login?error=session").into_response();
            }
            let user_id = user.id.to_string();
            add_breadcrumb("auth", "Logged in", Some(&[("user_id", user_id.as_str())]));
            Redirect::to("/").into_response()
        }
        Err(AuthError::InvalidCredentials) => {
            tracing::info!("Login failed: invalid credentials");
            Redirect::to("/login?error=credentials").into_response()
        }
        Err(e) => {
            tracing::error!("Login failed: {e}");
            Redirect::to("/login?error=server").into_response()
        }
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(viewer: Viewer, Query(query): Query<MessageQuery>) -> impl IntoResponse {
    RegisterTemplate {
        chrome: Chrome::for_viewer(&viewer),
        error: query.error.as_deref().map(error_message),
        min_password_length: crate::services::auth::MIN_PASSWORD_LENGTH,
    }
}

/// Handle registration form submission. New accounts are logged in.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Response {
    let auth = AuthService::new(state.users());

    let user = match auth
        .register(&form.username, &form.password, &form.password_confirm)
        .await
    {
        Ok(user) => user,
        Err(e) => {
            let code = match e {
                AuthError::InvalidUsername(_) => "username",
                AuthError::WeakPassword(_) => "password",
                AuthError::PasswordMismatch => "mismatch",
                AuthError::UserAlreadyExists => "taken",
                AuthError::InvalidCredentials
                | AuthError::Repository(_)
                | AuthError::PasswordHash => {
                    tracing::error!("Registration failed: {e}");
                    "server"
                }
            };
            return Redirect::to(&format!("/register?error={code}")).into_response();
        }
    };

    if let Err(e) = start_session(&session, &user).await {
        tracing::error!("Failed to set session: {e}");
        return Redirect::to("/login?error=session").into_response();
    }

    Redirect::to("/profile").into_response()
}

// =============================================================================
// Logout
// =============================================================================

/// Drop the whole session.
pub async fn logout(session: Session) -> Response {
    if let Err(e) = session.flush().await {
        tracing::error!("Failed to flush session: {e}");
    }
    clear_sentry_user();
    Redirect::to("/").into_response()
}
