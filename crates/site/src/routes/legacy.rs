//! Permanent redirects from the old NPC-only URLs.

use axum::{Router, response::Redirect, routing::get};

use grace_codex_core::ItemId;

use super::IdPath;
use crate::state::AppState;

/// Create the legacy redirect router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/manage_npc", get(|| async { Redirect::permanent("/editor/npcs") }))
        .route(
            "/add_new_npc",
            get(|| async { Redirect::permanent("/editor/npcs/add") }),
        )
        .route("/npc/{id}", get(npc))
}

async fn npc(IdPath(id): IdPath<ItemId>) -> Redirect {
    Redirect::permanent(&format!("/npcs/{id}"))
}
