//! JSON API for single items.
//!
//! Reads are public. Updates and deletes sit behind the admin gate, which
//! answers a bare 401 or 403 before any handler runs.

use std::collections::BTreeMap;

use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware::from_fn,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde_json::{Map, Value, json};
use tracing::instrument;

use grace_codex_core::{Category, ItemId, ValidationErrors};

use super::submission;
use crate::error::{ApiError, AppError, add_breadcrumb};
use crate::middleware::require_admin_api;
use crate::state::AppState;

/// API routes for one category.
pub fn routes(category: Category) -> Router<AppState> {
    let item = format!("/api/{}/{{id}}", category.public_slug());

    let admin = Router::new()
        .route(&item, post(update))
        .route(&format!("{item}/delete"), delete(remove))
        .route_layer(from_fn(require_admin_api));

    Router::new()
        .route(&item, get(show))
        .merge(admin)
        .layer(Extension(category))
}

fn parse_id(category: Category, raw: &str) -> Result<ItemId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError(AppError::NotFound(format!("{} {raw:?}", category.label()))))
}

fn missing(category: Category, id: ItemId) -> ApiError {
    ApiError(AppError::NotFound(format!("{} {id}", category.label())))
}

/// Fetch one item.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Extension(category): Extension<Category>,
    Path(raw): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(category, &raw)?;
    let item = state
        .content()
        .get(category, id)
        .await?
        .ok_or_else(|| missing(category, id))?;

    Ok(Json(json!({ "status": "ok", "item": item })))
}

/// Partially update one item.
///
/// The body is a JSON object of field values. Invalid submissions get a 422
/// with one message per field and leave the item untouched.
#[instrument(skip(state, body))]
pub async fn update(
    State(state): State<AppState>,
    Extension(category): Extension<Category>,
    Path(raw): Path<String>,
    Json(body): Json<Map<String, Value>>,
) -> Result<Response, ApiError> {
    let id = parse_id(category, &raw)?;

    if state.content().get(category, id).await?.is_none() {
        return Err(missing(category, id));
    }

    let values = match submission_from_json(body) {
        Ok(values) => values,
        Err(errors) => return Ok(invalid(&errors)),
    };
    let draft = match submission::validate(state.content(), category, &values).await? {
        Ok(draft) => draft,
        Err(errors) => return Ok(invalid(&errors)),
    };

    if !state.content().update(id, &draft).await? {
        return Err(missing(category, id));
    }

    let id_text = id.to_string();
    add_breadcrumb(
        "api",
        "Updated item",
        Some(&[("category", category.table()), ("id", id_text.as_str())]),
    );

    let item = state.content().get(category, id).await?;
    Ok(Json(json!({ "status": "ok", "item": item })).into_response())
}

/// Delete one item. Deleting a missing item answers exactly like deleting
/// an existing one.
#[instrument(skip(state))]
pub async fn remove(
    State(state): State<AppState>,
    Extension(category): Extension<Category>,
    Path(raw): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(category, &raw)?;
    let existed = state.content().delete(category, id).await?;
    tracing::info!(%id, existed, "item deleted via api");

    Ok(Json(json!({ "status": "ok" })))
}

fn invalid(errors: &ValidationErrors) -> Response {
    let body = json!({
        "status": "error",
        "message": "validation failed",
        "errors": errors,
    });
    (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
}

/// Flatten a JSON object into form-style string values.
///
/// Strings pass through, numbers and booleans are written out, `null`
/// becomes blank (clearing an optional field).
fn submission_from_json(
    body: Map<String, Value>,
) -> Result<BTreeMap<String, String>, ValidationErrors> {
    let mut values = BTreeMap::new();
    let mut errors = ValidationErrors::new();

    for (key, value) in body {
        let text = match value {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null => String::new(),
            Value::Array(_) | Value::Object(_) => {
                errors.add(&key, "must be a string or number");
                continue;
            }
        };
        values.insert(key, text);
    }

    if errors.is_empty() {
        Ok(values)
    } else {
        Err(errors)
    }
}
