//! Public catalog pages: category lists, item details and groups.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Extension, Form, Router,
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use tracing::instrument;

use grace_codex_core::{Category, ContentItem, GroupId, GroupKind, ItemId};

use super::IdPath;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::Viewer;
use crate::state::AppState;
use crate::views::{Chrome, DetailRow, Link, Section, detail_rows, group_link, item_link};

/// Routes for one category: list, detail, and the NPC search form.
pub fn routes(category: Category) -> Router<AppState> {
    let base = format!("/{}", category.public_slug());

    let list_route = if category == Category::Npc {
        get(list).post(search)
    } else {
        get(list)
    };

    let mut router = Router::new()
        .route(&base, list_route)
        .route(&format!("{base}/{{id}}"), get(show));

    if category == Category::Weapon {
        router = router.route(&format!("{base}/all"), get(all));
    }

    router.layer(Extension(category))
}

/// Routes for one group kind: list and detail.
pub fn group_routes(kind: GroupKind) -> Router<AppState> {
    let base = format!("/{}", kind.public_slug());

    Router::new()
        .route(&base, get(groups))
        .route(&format!("{base}/{{id}}"), get(group))
        .layer(Extension(kind))
}

// =============================================================================
// Query Types
// =============================================================================

/// Name filter, from the query string or the NPC search form.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Category list page template.
#[derive(Template, WebTemplate)]
#[template(path = "catalog/list.html")]
pub struct ListTemplate {
    pub chrome: Chrome,
    pub title: String,
    pub list_href: String,
    pub query: String,
    /// The NPC list posts its search form; the others use `GET ?q=`.
    pub search_posts: bool,
    pub sections: Vec<Section>,
    pub total: usize,
    pub all_href: Option<String>,
    pub groups_href: Option<String>,
    pub editor_href: Option<String>,
}

/// Item detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "catalog/detail.html")]
pub struct DetailTemplate {
    pub chrome: Chrome,
    pub category_label: String,
    pub list_href: String,
    pub name: String,
    pub group: Option<Link>,
    pub rows: Vec<DetailRow>,
    pub updated_at: String,
    pub api_href: String,
    pub modify_href: Option<String>,
    pub delete_href: Option<String>,
}

/// One row of the group list.
#[derive(Debug, Clone)]
pub struct GroupRow {
    pub link: Link,
    pub description: Option<String>,
    pub members: usize,
}

/// Group list page template.
#[derive(Template, WebTemplate)]
#[template(path = "catalog/groups.html")]
pub struct GroupsTemplate {
    pub chrome: Chrome,
    pub title: String,
    pub member_label: String,
    pub member_href: String,
    pub groups: Vec<GroupRow>,
}

/// Group detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "catalog/group_detail.html")]
pub struct GroupDetailTemplate {
    pub chrome: Chrome,
    pub kind_label: String,
    pub list_href: String,
    pub name: String,
    pub description: Option<String>,
    pub members: Vec<Link>,
}

// =============================================================================
// Lists
// =============================================================================

/// List a category, optionally filtered with `?q=`.
#[instrument(skip(state, viewer))]
pub async fn list(
    State(state): State<AppState>,
    Extension(category): Extension<Category>,
    viewer: Viewer,
    Query(query): Query<SearchQuery>,
) -> Result<ListTemplate> {
    render_list(&state, &viewer, category, query.q.unwrap_or_default(), false).await
}

/// NPC search form submission.
#[instrument(skip(state, viewer))]
pub async fn search(
    State(state): State<AppState>,
    Extension(category): Extension<Category>,
    viewer: Viewer,
    Form(query): Form<SearchQuery>,
) -> Result<ListTemplate> {
    render_list(&state, &viewer, category, query.q.unwrap_or_default(), false).await
}

/// Every weapon in one flat list.
#[instrument(skip(state, viewer))]
pub async fn all(
    State(state): State<AppState>,
    Extension(category): Extension<Category>,
    viewer: Viewer,
) -> Result<ListTemplate> {
    render_list(&state, &viewer, category, String::new(), true).await
}

async fn render_list(
    state: &AppState,
    viewer: &Viewer,
    category: Category,
    query: String,
    flat: bool,
) -> Result<ListTemplate> {
    let query = query.trim().to_owned();
    let items: Vec<ContentItem> = state
        .content()
        .list(category)
        .await?
        .into_iter()
        .filter(|item| item.matches(&query))
        .collect();

    let sections = match category.group_kind() {
        Some(kind) if !flat && query.is_empty() => grouped(state, kind, &items).await?,
        _ => vec![Section {
            heading: None,
            href: None,
            items: items.iter().map(item_link).collect(),
        }],
    };

    let base = format!("/{}", category.public_slug());
    Ok(ListTemplate {
        chrome: Chrome::for_viewer(viewer),
        title: category.plural_label().to_owned(),
        search_posts: category == Category::Npc,
        total: items.len(),
        all_href: (category == Category::Weapon && !flat).then(|| format!("{base}/all")),
        groups_href: category
            .group_kind()
            .map(|kind| format!("/{}", kind.public_slug())),
        editor_href: viewer
            .is_admin()
            .then(|| format!("/editor/{}", category.editor_slug())),
        list_href: base,
        query,
        sections,
    })
}

/// One section per non-empty group, then the ungrouped items.
async fn grouped(
    state: &AppState,
    kind: GroupKind,
    items: &[ContentItem],
) -> Result<Vec<Section>> {
    let groups = state.content().list_groups(kind).await?;
    let mut sections = Vec::with_capacity(groups.len() + 1);

    for group in &groups {
        let members: Vec<Link> = items
            .iter()
            .filter(|item| item.group_id == Some(group.id))
            .map(item_link)
            .collect();
        if !members.is_empty() {
            let link = group_link(group);
            sections.push(Section {
                heading: Some(link.label),
                href: Some(link.href),
                items: members,
            });
        }
    }

    let loose: Vec<Link> = items
        .iter()
        .filter(|item| {
            item.group_id
                .is_none_or(|id| !groups.iter().any(|g| g.id == id))
        })
        .map(item_link)
        .collect();
    if !loose.is_empty() || sections.is_empty() {
        let heading = (!sections.is_empty()).then(|| {
            format!(
                "Other {}",
                kind.member_category().plural_label().to_lowercase()
            )
        });
        sections.push(Section {
            heading,
            href: None,
            items: loose,
        });
    }

    Ok(sections)
}

// =============================================================================
// Details
// =============================================================================

/// Display one item.
#[instrument(skip(state, viewer))]
pub async fn show(
    State(state): State<AppState>,
    Extension(category): Extension<Category>,
    viewer: Viewer,
    IdPath(id): IdPath<ItemId>,
) -> Result<DetailTemplate> {
    let item = state
        .content()
        .get(category, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {id}", category.label())))?;

    let group = match (category.group_kind(), item.group_id) {
        (Some(kind), Some(group_id)) => state
            .content()
            .get_group(kind, group_id)
            .await?
            .as_ref()
            .map(group_link),
        _ => None,
    };

    let editor = format!("/editor/{}", category.editor_slug());
    let admin = viewer.is_admin();

    Ok(DetailTemplate {
        chrome: Chrome::for_viewer(&viewer),
        category_label: category.label().to_owned(),
        list_href: format!("/{}", category.public_slug()),
        rows: detail_rows(&item),
        updated_at: item.updated_at.format("%Y-%m-%d").to_string(),
        api_href: format!("/api/{}/{id}", category.public_slug()),
        modify_href: admin.then(|| format!("{editor}/modify/{id}")),
        delete_href: admin.then(|| format!("{editor}/delete/{id}")),
        name: item.name,
        group,
    })
}

// =============================================================================
// Groups
// =============================================================================

/// List the groups of one kind with member counts.
#[instrument(skip(state, viewer))]
pub async fn groups(
    State(state): State<AppState>,
    Extension(kind): Extension<GroupKind>,
    viewer: Viewer,
) -> Result<GroupsTemplate> {
    let groups = state.content().list_groups(kind).await?;
    let members = state.content().list(kind.member_category()).await?;

    let groups = groups
        .iter()
        .map(|group| GroupRow {
            link: group_link(group),
            description: group.description.clone(),
            members: members
                .iter()
                .filter(|item| item.group_id == Some(group.id))
                .count(),
        })
        .collect();

    Ok(GroupsTemplate {
        chrome: Chrome::for_viewer(&viewer),
        title: kind.plural_label().to_owned(),
        member_label: kind.member_category().plural_label().to_owned(),
        member_href: format!("/{}", kind.member_category().public_slug()),
        groups,
    })
}

/// Display one group and its members.
#[instrument(skip(state, viewer))]
pub async fn group(
    State(state): State<AppState>,
    Extension(kind): Extension<GroupKind>,
    viewer: Viewer,
    IdPath(id): IdPath<GroupId>,
) -> Result<impl IntoResponse> {
    let group = state
        .content()
        .get_group(kind, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {id}", kind.label())))?;
    let members = state.content().group_members(kind, id).await?;

    Ok(GroupDetailTemplate {
        chrome: Chrome::for_viewer(&viewer),
        kind_label: kind.label().to_owned(),
        list_href: format!("/{}", kind.public_slug()),
        name: group.name,
        description: group.description,
        members: members.iter().map(item_link).collect(),
    })
}
