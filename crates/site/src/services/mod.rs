//! Business logic services.

pub mod auth;
pub mod avatars;

pub use auth::{AuthError, AuthService};
pub use avatars::{AvatarError, AvatarStorage};
