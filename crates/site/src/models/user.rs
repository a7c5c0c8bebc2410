//! Account model.

use chrono::{DateTime, Utc};
use serde::Serialize;

use grace_codex_core::{AdminRequest, Capability, UserId, Username};

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub username: Username,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    /// File name under the upload directory.
    pub picture: Option<String>,
    pub is_admin: bool,
    pub admin_request: AdminRequest,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Longest accepted display name.
    pub const DISPLAY_NAME_MAX: usize = 64;

    /// Longest accepted bio.
    pub const BIO_MAX: usize = 1000;

    #[must_use]
    pub const fn capability(&self) -> Capability {
        if self.is_admin {
            Capability::Admin
        } else {
            Capability::User
        }
    }

    /// Display name, falling back to the username.
    #[must_use]
    pub fn shown_name(&self) -> &str {
        self.display_name
            .as_deref()
            .unwrap_or_else(|| self.username.as_str())
    }

    /// Public URL of the profile picture.
    #[must_use]
    pub fn picture_url(&self) -> Option<String> {
        self.picture.as_ref().map(|p| format!("/uploads/{p}"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn user(is_admin: bool) -> User {
        User {
            id: UserId::new(1),
            username: Username::parse("melina").unwrap(),
            display_name: None,
            bio: None,
            picture: None,
            is_admin,
            admin_request: AdminRequest::None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_capability() {
        assert_eq!(user(false).capability(), Capability::User);
        assert_eq!(user(true).capability(), Capability::Admin);
    }

    #[test]
    fn test_shown_name_falls_back_to_username() {
        let mut u = user(false);
        assert_eq!(u.shown_name(), "melina");
        u.display_name = Some("Melina the Kindling".to_owned());
        assert_eq!(u.shown_name(), "Melina the Kindling");
    }

    #[test]
    fn test_picture_url() {
        let mut u = user(false);
        assert_eq!(u.picture_url(), None);
        u.picture = Some("user-1-abc.png".to_owned());
        assert_eq!(u.picture_url().as_deref(), Some("/uploads/user-1-abc.png"));
    }
}
