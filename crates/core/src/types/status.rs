//! Status and role enums for accounts.

use serde::{Deserialize, Serialize};

/// State of a user's request to become an editor (admin).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "codex.admin_request", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum AdminRequest {
    /// No request has been made (or the last one was granted).
    #[default]
    None,
    /// Waiting for an administrator to review.
    Pending,
    /// Reviewed and refused. The user may ask again.
    Denied,
}

impl std::fmt::Display for AdminRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Pending => write!(f, "pending"),
            Self::Denied => write!(f, "denied"),
        }
    }
}

impl std::str::FromStr for AdminRequest {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "pending" => Ok(Self::Pending),
            "denied" => Ok(Self::Denied),
            _ => Err(format!("invalid admin request status: {s}")),
        }
    }
}

/// What the current request is allowed to do.
///
/// Variants are ordered from least to most privileged, so a route guard can
/// compare with `>=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// No session, or the session names a user that no longer exists.
    Anonymous,
    /// Logged-in account without editor rights.
    User,
    /// Logged-in account allowed to edit content.
    Admin,
}

impl Capability {
    /// Whether this capability satisfies `required`.
    #[must_use]
    pub fn allows(self, required: Self) -> bool {
        self >= required
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anonymous => write!(f, "anonymous"),
            Self::User => write!(f, "user"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_ordering() {
        assert!(Capability::Admin.allows(Capability::User));
        assert!(Capability::Admin.allows(Capability::Admin));
        assert!(Capability::User.allows(Capability::User));
        assert!(!Capability::User.allows(Capability::Admin));
        assert!(!Capability::Anonymous.allows(Capability::User));
        assert!(Capability::Anonymous.allows(Capability::Anonymous));
    }

    #[test]
    fn test_admin_request_roundtrip() {
        for status in [AdminRequest::None, AdminRequest::Pending, AdminRequest::Denied] {
            let parsed: AdminRequest = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("granted".parse::<AdminRequest>().is_err());
    }

    #[test]
    fn test_admin_request_serde() {
        let json = serde_json::to_string(&AdminRequest::Pending).unwrap();
        assert_eq!(json, "\"pending\"");
    }
}
