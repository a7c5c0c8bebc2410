//! HTTP middleware stack for the site.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, added in `main`)
//! 2. Security headers
//! 3. Request ID
//! 4. `TraceLayer` (request tracing)
//! 5. Session layer (tower-sessions)
//! 6. Viewer resolution (session user looked up in the directory)
//! 7. Per-route capability gates

pub mod gate;
pub mod request_id;
pub mod security_headers;
pub mod session;
pub mod viewer;

pub use gate::{
    AuthRejection, RequireAdmin, RequireUser, require_admin_api, require_admin_page,
    require_user_page,
};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::{SESSION_COOKIE_NAME, create_session_layer};
pub use viewer::{Viewer, resolve_viewer};
