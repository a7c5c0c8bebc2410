//! Session-related types.

/// Session keys for type-safe access.
///
/// The site stores exactly one value per session: the id of the logged-in
/// user. Everything else is looked up per request.
pub mod session_keys {
    /// Key for the logged-in user's id (`UserId`).
    pub const USER_ID: &str = "user_id";
}
