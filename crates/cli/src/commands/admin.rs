//! Editor rights management.
//!
//! ```bash
//! codex-cli admin grant --username tarnished
//! codex-cli admin revoke --username tarnished
//! ```
//!
//! Both commands clear any open admin request, the same as approving or
//! denying it from the editor.

use grace_codex_core::Username;
use grace_codex_site::db::{PgUserDirectory, UserDirectory};

use super::{CommandError, connect};

/// Grant (`true`) or revoke (`false`) editor rights.
pub async fn set_admin(username: &str, is_admin: bool) -> Result<(), CommandError> {
    let username: Username = username
        .parse()
        .map_err(|_| CommandError::InvalidUsername(username.to_owned()))?;

    let users = PgUserDirectory::new(connect().await?);
    let user = users
        .by_username(&username)
        .await?
        .ok_or_else(|| CommandError::UnknownUser(username.to_string()))?;

    if user.is_admin == is_admin {
        tracing::info!(user_id = %user.id, is_admin, "No change needed");
        return Ok(());
    }

    users.set_admin(user.id, is_admin).await?;
    tracing::info!(user_id = %user.id, %username, is_admin, "Editor rights updated");
    Ok(())
}
