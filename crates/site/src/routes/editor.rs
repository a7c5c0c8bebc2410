//! Content editor (admins only).
//!
//! Every category gets the same add / modify / delete workflow. Modify and
//! delete are bound twice: without an id they render a chooser, with one
//! they act on that item. Both bindings share one function taking
//! `Option<ItemId>`, so the chooser can never mutate anything.

use std::collections::BTreeMap;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Extension, Form, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware::from_fn,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use tracing::instrument;

use grace_codex_core::{AdminRequest, Category, ContentGroup, GroupId, GroupKind, ItemId, UserId};

use super::{IdPath, submission};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{RequireAdmin, Viewer, require_admin_page};
use crate::models::User;
use crate::state::AppState;
use crate::views::{Chrome, EditorForm, Link};

/// Section name for the admin request queue.
pub const REQUESTS_SECTION: &str = "requests";

/// Hub, sections and admin request review.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/editor", get(hub))
        .route("/editor/{section}", get(section))
        .route("/editor/requests/{user_id}/approve", post(approve))
        .route("/editor/requests/{user_id}/deny", post(deny))
        .route_layer(from_fn(require_admin_page))
}

/// Editor routes for one category.
pub fn category_routes(category: Category) -> Router<AppState> {
    let base = format!("/editor/{}", category.editor_slug());

    let mut router = Router::new()
        .route(&base, get(landing))
        .route(&format!("{base}/add"), get(add_form).post(add))
        .route(&format!("{base}/modify"), get(modify_chooser))
        .route(
            &format!("{base}/modify/{{id}}"),
            get(modify_form).post(modify),
        )
        .route(&format!("{base}/delete"), get(delete_chooser))
        .route(
            &format!("{base}/delete/{{id}}"),
            get(delete_confirm).post(delete),
        );

    if let Some(kind) = category.group_kind() {
        let groups = format!("{base}/{}/delete", kind.editor_slug());
        router = router
            .route(&groups, get(group_delete_chooser))
            .route(
                &format!("{groups}/{{id}}"),
                get(group_delete_confirm).post(group_delete),
            );
    }

    router
        .route_layer(from_fn(require_admin_page))
        .layer(Extension(category))
}

// =============================================================================
// View Types
// =============================================================================

/// One category on the editor hub.
#[derive(Debug, Clone)]
pub struct HubEntry {
    pub link: Link,
    pub count: i64,
}

/// One item row on a category landing page.
#[derive(Debug, Clone)]
pub struct EditorRow {
    pub name: String,
    pub view_href: String,
    pub modify_href: String,
    pub delete_href: String,
}

/// One pending admin request.
#[derive(Debug, Clone)]
pub struct RequestRow {
    pub username: String,
    pub shown_name: String,
    pub approve_action: String,
    pub deny_action: String,
}

impl From<&User> for RequestRow {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.to_string(),
            shown_name: user.shown_name().to_owned(),
            approve_action: format!("/editor/requests/{}/approve", user.id),
            deny_action: format!("/editor/requests/{}/deny", user.id),
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Editor hub template.
#[derive(Template, WebTemplate)]
#[template(path = "editor/hub.html")]
pub struct HubTemplate {
    pub chrome: Chrome,
    pub entries: Vec<HubEntry>,
    pub pending_requests: usize,
}

/// Admin request queue template.
#[derive(Template, WebTemplate)]
#[template(path = "editor/requests.html")]
pub struct RequestsTemplate {
    pub chrome: Chrome,
    pub requests: Vec<RequestRow>,
}

/// Category landing template.
#[derive(Template, WebTemplate)]
#[template(path = "editor/landing.html")]
pub struct LandingTemplate {
    pub chrome: Chrome,
    pub label: String,
    pub plural_label: String,
    pub public_href: String,
    pub add_href: String,
    pub modify_href: String,
    pub delete_href: String,
    pub group_delete: Option<Link>,
    pub rows: Vec<EditorRow>,
}

/// Add / modify form template.
#[derive(Template, WebTemplate)]
#[template(path = "editor/form.html")]
pub struct FormTemplate {
    pub chrome: Chrome,
    pub heading: String,
    pub action: String,
    pub submit_label: String,
    pub cancel_href: String,
    pub has_errors: bool,
    pub form: EditorForm,
}

/// Chooser shown when modify or delete is opened without an id.
#[derive(Template, WebTemplate)]
#[template(path = "editor/chooser.html")]
pub struct ChooserTemplate {
    pub chrome: Chrome,
    pub heading: String,
    pub choices: Vec<Link>,
    pub empty_message: String,
    pub back_href: String,
}

/// Delete confirmation template.
#[derive(Template, WebTemplate)]
#[template(path = "editor/confirm_delete.html")]
pub struct ConfirmDeleteTemplate {
    pub chrome: Chrome,
    pub heading: String,
    pub name: String,
    pub note: Option<String>,
    pub action: String,
    pub cancel_href: String,
}

// =============================================================================
// Hub and Sections
// =============================================================================

/// Editor hub: every category with counts, plus the request queue size.
#[instrument(skip(state, viewer))]
pub async fn hub(State(state): State<AppState>, viewer: Viewer) -> Result<HubTemplate> {
    let mut entries = Vec::with_capacity(Category::ALL.len());
    for category in Category::ALL {
        entries.push(HubEntry {
            link: Link::new(
                format!("/editor/{}", category.editor_slug()),
                category.plural_label(),
            ),
            count: state.content().count(category).await?,
        });
    }

    Ok(HubTemplate {
        chrome: Chrome::for_viewer(&viewer),
        entries,
        pending_requests: state.users().pending_admin_requests().await?.len(),
    })
}

/// Non-category editor sections. Only the request queue exists today.
#[instrument(skip(state, viewer))]
pub async fn section(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(section): Path<String>,
) -> Result<Response> {
    if section != REQUESTS_SECTION {
        return Err(AppError::NotFound(format!("editor section {section}")));
    }

    let pending = state.users().pending_admin_requests().await?;
    Ok(RequestsTemplate {
        chrome: Chrome::for_viewer(&viewer),
        requests: pending.iter().map(RequestRow::from).collect(),
    }
    .into_response())
}

/// Grant editor rights.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn approve(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    IdPath(user_id): IdPath<UserId>,
) -> Result<Redirect> {
    if !state.users().set_admin(user_id, true).await? {
        return Err(AppError::NotFound(format!("user {user_id}")));
    }
    tracing::info!(%user_id, "admin request approved");
    let (user_text, admin_text) = (user_id.to_string(), admin.id.to_string());
    add_breadcrumb(
        "editor",
        "Approved admin request",
        Some(&[("user_id", user_text.as_str()), ("admin_id", admin_text.as_str())]),
    );
    Ok(Redirect::to("/editor/requests"))
}

/// Refuse editor rights. The user may ask again later.
///
/// Only a pending request is refused; anything else is left as it is.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn deny(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    IdPath(user_id): IdPath<UserId>,
) -> Result<Redirect> {
    let missing = || AppError::NotFound(format!("user {user_id}"));

    let user = state.users().by_id(user_id).await?.ok_or_else(missing)?;
    if user.admin_request != AdminRequest::Pending {
        tracing::debug!(%user_id, status = %user.admin_request, "no pending request to deny");
        return Ok(Redirect::to("/editor/requests"));
    }

    if !state
        .users()
        .set_admin_request(user_id, AdminRequest::Denied)
        .await?
    {
        return Err(missing());
    }
    tracing::info!(%user_id, "admin request denied");
    Ok(Redirect::to("/editor/requests"))
}

// =============================================================================
// Category Landing
// =============================================================================

fn editor_base(category: Category) -> String {
    format!("/editor/{}", category.editor_slug())
}

fn detail_href(category: Category, id: ItemId) -> String {
    format!("/{}/{id}", category.public_slug())
}

/// Category landing: every item with modify and delete links.
#[instrument(skip(state, viewer))]
pub async fn landing(
    State(state): State<AppState>,
    Extension(category): Extension<Category>,
    viewer: Viewer,
) -> Result<LandingTemplate> {
    let base = editor_base(category);
    let rows = state
        .content()
        .list(category)
        .await?
        .into_iter()
        .map(|item| EditorRow {
            view_href: detail_href(category, item.id),
            modify_href: format!("{base}/modify/{}", item.id),
            delete_href: format!("{base}/delete/{}", item.id),
            name: item.name,
        })
        .collect();

    let group_delete = category.group_kind().map(|kind| {
        Link::new(
            group_delete_base(category, kind),
            format!("Delete a {}", kind.label().to_lowercase()),
        )
    });

    Ok(LandingTemplate {
        chrome: Chrome::for_viewer(&viewer),
        label: category.label().to_owned(),
        plural_label: category.plural_label().to_owned(),
        public_href: format!("/{}", category.public_slug()),
        add_href: format!("{base}/add"),
        modify_href: format!("{base}/modify"),
        delete_href: format!("{base}/delete"),
        group_delete,
        rows,
    })
}

async fn groups_for(state: &AppState, category: Category) -> Result<Vec<ContentGroup>> {
    match category.group_kind() {
        Some(kind) => Ok(state.content().list_groups(kind).await?),
        None => Ok(Vec::new()),
    }
}

// =============================================================================
// Add
// =============================================================================

fn add_page(viewer: &Viewer, category: Category, form: EditorForm) -> FormTemplate {
    let base = editor_base(category);
    FormTemplate {
        chrome: Chrome::for_viewer(viewer),
        heading: format!("Add {}", category.label().to_lowercase()),
        action: format!("{base}/add"),
        submit_label: "Create".to_owned(),
        has_errors: false,
        cancel_href: base,
        form,
    }
}

/// Empty add form.
#[instrument(skip(state, viewer))]
pub async fn add_form(
    State(state): State<AppState>,
    Extension(category): Extension<Category>,
    viewer: Viewer,
) -> Result<FormTemplate> {
    let groups = groups_for(&state, category).await?;
    let form = EditorForm::new(category, &BTreeMap::new(), &BTreeMap::new(), &groups);
    Ok(add_page(&viewer, category, form))
}

/// Create an item, or re-render the form with field errors (422).
#[instrument(skip(state, viewer, values))]
pub async fn add(
    State(state): State<AppState>,
    Extension(category): Extension<Category>,
    viewer: Viewer,
    Form(values): Form<BTreeMap<String, String>>,
) -> Result<Response> {
    let draft = match submission::validate(state.content(), category, &values).await? {
        Ok(draft) => draft,
        Err(errors) => {
            let groups = groups_for(&state, category).await?;
            let form = EditorForm::new(category, &values, &submission::error_map(&errors), &groups);
            let mut page = add_page(&viewer, category, form);
            page.has_errors = true;
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response());
        }
    };

    let id = state.content().insert(&draft).await?;
    tracing::info!(%id, category = category.table(), "item created");
    let id_text = id.to_string();
    add_breadcrumb(
        "editor",
        "Created item",
        Some(&[("category", category.table()), ("id", id_text.as_str())]),
    );

    Ok(Redirect::to(&detail_href(category, id)).into_response())
}

// =============================================================================
// Modify
// =============================================================================

/// `/modify`: chooser.
pub async fn modify_chooser(
    State(state): State<AppState>,
    Extension(category): Extension<Category>,
    viewer: Viewer,
) -> Result<Response> {
    modify_view(&state, &viewer, category, None).await
}

/// `/modify/{id}`: prefilled form.
pub async fn modify_form(
    State(state): State<AppState>,
    Extension(category): Extension<Category>,
    viewer: Viewer,
    IdPath(id): IdPath<ItemId>,
) -> Result<Response> {
    modify_view(&state, &viewer, category, Some(id)).await
}

fn modify_page(viewer: &Viewer, category: Category, id: ItemId, form: EditorForm) -> FormTemplate {
    let base = editor_base(category);
    FormTemplate {
        chrome: Chrome::for_viewer(viewer),
        heading: format!("Modify {}", form.name),
        action: format!("{base}/modify/{id}"),
        submit_label: "Save".to_owned(),
        cancel_href: detail_href(category, id),
        has_errors: false,
        form,
    }
}

#[instrument(skip(state, viewer))]
async fn modify_view(
    state: &AppState,
    viewer: &Viewer,
    category: Category,
    id: Option<ItemId>,
) -> Result<Response> {
    let base = editor_base(category);

    let Some(id) = id else {
        let items = state.content().list(category).await?;
        return Ok(ChooserTemplate {
            chrome: Chrome::for_viewer(viewer),
            heading: format!("Modify which {}?", category.label().to_lowercase()),
            choices: items
                .iter()
                .map(|item| Link::new(format!("{base}/modify/{}", item.id), item.name.clone()))
                .collect(),
            empty_message: format!("No {} yet.", category.plural_label().to_lowercase()),
            back_href: base,
        }
        .into_response());
    };

    let item = state
        .content()
        .get(category, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {id}", category.label())))?;
    let groups = groups_for(state, category).await?;

    Ok(modify_page(viewer, category, id, EditorForm::from_item(&item, &groups)).into_response())
}

/// Apply a partial update, or re-render the form with field errors (422).
#[instrument(skip(state, viewer, values))]
pub async fn modify(
    State(state): State<AppState>,
    Extension(category): Extension<Category>,
    viewer: Viewer,
    IdPath(id): IdPath<ItemId>,
    Form(values): Form<BTreeMap<String, String>>,
) -> Result<Response> {
    let missing = || AppError::NotFound(format!("{} {id}", category.label()));

    if state.content().get(category, id).await?.is_none() {
        return Err(missing());
    }

    let draft = match submission::validate(state.content(), category, &values).await? {
        Ok(draft) => draft,
        Err(errors) => {
            let groups = groups_for(&state, category).await?;
            let form = EditorForm::new(category, &values, &submission::error_map(&errors), &groups);
            let mut page = modify_page(&viewer, category, id, form);
            page.has_errors = true;
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response());
        }
    };

    if !state.content().update(id, &draft).await? {
        return Err(missing());
    }
    tracing::info!(%id, category = category.table(), "item updated");

    Ok(Redirect::to(&detail_href(category, id)).into_response())
}

// =============================================================================
// Delete
// =============================================================================

/// `/delete`: chooser.
pub async fn delete_chooser(
    State(state): State<AppState>,
    Extension(category): Extension<Category>,
    viewer: Viewer,
) -> Result<Response> {
    delete_view(&state, &viewer, category, None).await
}

/// `/delete/{id}`: confirmation page.
pub async fn delete_confirm(
    State(state): State<AppState>,
    Extension(category): Extension<Category>,
    viewer: Viewer,
    IdPath(id): IdPath<ItemId>,
) -> Result<Response> {
    delete_view(&state, &viewer, category, Some(id)).await
}

#[instrument(skip(state, viewer))]
async fn delete_view(
    state: &AppState,
    viewer: &Viewer,
    category: Category,
    id: Option<ItemId>,
) -> Result<Response> {
    let base = editor_base(category);

    let Some(id) = id else {
        let items = state.content().list(category).await?;
        return Ok(ChooserTemplate {
            chrome: Chrome::for_viewer(viewer),
            heading: format!("Delete which {}?", category.label().to_lowercase()),
            choices: items
                .iter()
                .map(|item| Link::new(format!("{base}/delete/{}", item.id), item.name.clone()))
                .collect(),
            empty_message: format!("No {} yet.", category.plural_label().to_lowercase()),
            back_href: base,
        }
        .into_response());
    };

    let item = state
        .content()
        .get(category, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {id}", category.label())))?;

    Ok(ConfirmDeleteTemplate {
        chrome: Chrome::for_viewer(viewer),
        heading: format!("Delete {}", category.label().to_lowercase()),
        name: item.name,
        note: None,
        action: format!("{base}/delete/{id}"),
        cancel_href: detail_href(category, id),
    }
    .into_response())
}

/// Delete an item. Already-deleted items redirect the same way.
#[instrument(skip(state))]
pub async fn delete(
    State(state): State<AppState>,
    Extension(category): Extension<Category>,
    IdPath(id): IdPath<ItemId>,
) -> Result<Redirect> {
    let existed = state.content().delete(category, id).await?;
    tracing::info!(%id, existed, category = category.table(), "item deleted");

    Ok(Redirect::to(&editor_base(category)))
}

// =============================================================================
// Group Delete
// =============================================================================

fn group_kind_of(category: Category) -> Result<GroupKind> {
    category
        .group_kind()
        .ok_or_else(|| AppError::NotFound(format!("{} has no groups", category.label())))
}

fn group_delete_base(category: Category, kind: GroupKind) -> String {
    format!("{}/{}/delete", editor_base(category), kind.editor_slug())
}

/// `/{group}/delete`: chooser.
#[instrument(skip(state, viewer))]
pub async fn group_delete_chooser(
    State(state): State<AppState>,
    Extension(category): Extension<Category>,
    viewer: Viewer,
) -> Result<ChooserTemplate> {
    let kind = group_kind_of(category)?;
    let base = group_delete_base(category, kind);
    let groups = state.content().list_groups(kind).await?;

    Ok(ChooserTemplate {
        chrome: Chrome::for_viewer(&viewer),
        heading: format!("Delete which {}?", kind.label().to_lowercase()),
        choices: groups
            .iter()
            .map(|g| Link::new(format!("{base}/{}", g.id), g.name.clone()))
            .collect(),
        empty_message: format!("No {} yet.", kind.plural_label().to_lowercase()),
        back_href: editor_base(category),
    })
}

/// `/{group}/delete/{id}`: confirmation page.
#[instrument(skip(state, viewer))]
pub async fn group_delete_confirm(
    State(state): State<AppState>,
    Extension(category): Extension<Category>,
    viewer: Viewer,
    IdPath(id): IdPath<GroupId>,
) -> Result<ConfirmDeleteTemplate> {
    let kind = group_kind_of(category)?;
    let group = state
        .content()
        .get_group(kind, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {id}", kind.label())))?;
    let members = state.content().group_members(kind, id).await?.len();

    Ok(ConfirmDeleteTemplate {
        chrome: Chrome::for_viewer(&viewer),
        heading: format!("Delete {}", kind.label().to_lowercase()),
        name: group.name,
        note: (members > 0).then(|| {
            format!(
                "Its {members} {} stay and become ungrouped.",
                category.plural_label().to_lowercase()
            )
        }),
        action: format!("{}/{id}", group_delete_base(category, kind)),
        cancel_href: format!("/{}/{id}", kind.public_slug()),
    })
}

/// Delete a group; its members are kept without a group.
#[instrument(skip(state))]
pub async fn group_delete(
    State(state): State<AppState>,
    Extension(category): Extension<Category>,
    IdPath(id): IdPath<GroupId>,
) -> Result<Redirect> {
    let kind = group_kind_of(category)?;
    let existed = state.content().delete_group(kind, id).await?;
    tracing::info!(%id, existed, kind = kind.table(), "group deleted");

    Ok(Redirect::to(&editor_base(category)))
}
