//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use grace_codex_core::Category;

use crate::error::Result;
use crate::filters;
use crate::middleware::Viewer;
use crate::state::AppState;
use crate::views::Chrome;

/// One category tile on the home page.
#[derive(Debug, Clone)]
pub struct CategoryTile {
    pub href: String,
    pub label: String,
    pub count: i64,
}

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub chrome: Chrome,
    pub tiles: Vec<CategoryTile>,
}

/// Display the home page: every category with its record count.
#[instrument(skip(state, viewer))]
pub async fn home(State(state): State<AppState>, viewer: Viewer) -> Result<impl IntoResponse> {
    let mut tiles = Vec::with_capacity(Category::ALL.len());
    for category in Category::ALL {
        tiles.push(CategoryTile {
            href: format!("/{}", category.public_slug()),
            label: category.plural_label().to_owned(),
            count: state.content().count(category).await?,
        });
    }

    Ok(HomeTemplate {
        chrome: Chrome::for_viewer(&viewer),
        tiles,
    })
}
