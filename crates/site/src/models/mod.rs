//! Domain models for the site.

pub mod session;
pub mod user;

pub use session::session_keys;
pub use user::User;
