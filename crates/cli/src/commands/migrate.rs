//! Database migration command.
//!
//! ```bash
//! codex-cli migrate
//! ```
//!
//! Migrations live in `crates/site/migrations/` and are embedded at compile
//! time.

use super::{CommandError, connect};

/// Run every pending migration.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../site/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
