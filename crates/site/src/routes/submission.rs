//! Submission handling shared by the editor forms and the JSON API.

use std::collections::BTreeMap;

use grace_codex_core::{Category, GroupChange, ItemDraft, ValidationErrors};

use crate::db::{ContentStore, RepositoryError};

/// Validate a raw submission, including that a referenced group exists.
///
/// The outer error is a store failure; the inner one is the field-level
/// feedback for the user. Nothing is written either way.
pub async fn validate(
    content: &dyn ContentStore,
    category: Category,
    submission: &BTreeMap<String, String>,
) -> Result<Result<ItemDraft, ValidationErrors>, RepositoryError> {
    let draft = match ItemDraft::from_submission(category, submission) {
        Ok(draft) => draft,
        Err(errors) => return Ok(Err(errors)),
    };

    if let (GroupChange::Set(group_id), Some(kind)) = (draft.group, category.group_kind())
        && content.get_group(kind, group_id).await?.is_none()
    {
        let mut errors = ValidationErrors::new();
        errors.add(ItemDraft::GROUP_FIELD, "must reference an existing group");
        return Ok(Err(errors));
    }

    Ok(Ok(draft))
}

/// Field messages keyed by field name.
pub fn error_map(errors: &ValidationErrors) -> BTreeMap<String, String> {
    errors
        .iter()
        .map(|(field, message)| (field.to_owned(), message.to_owned()))
        .collect()
}
