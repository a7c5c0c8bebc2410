//! Validation of editor submissions.
//!
//! A submission is the flat set of string fields posted by an editor form or
//! sent to the JSON API. [`ItemDraft::from_submission`] checks it against
//! the category schema and produces a draft that can either create a new
//! item or be applied to an existing one.
//!
//! Rules:
//! - `name` and every required attribute must be present and non-blank.
//! - A present but blank optional attribute clears the stored value.
//! - An absent optional attribute leaves the stored value unchanged.
//! - `group_id` is only read for categories that have groups; blank clears
//!   membership, absent keeps it.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::category::{Category, FieldKind};
use super::content::ContentItem;
use super::id::GroupId;

/// Field-level validation messages, keyed by form field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, String>);

impl ValidationErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message for `field`. The first message per field is kept.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_owned())
            .or_insert_with(|| message.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("validation failed")?;
        for (i, (field, message)) in self.0.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{field} {message}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// What a draft does to an item's group membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupChange {
    Keep,
    Clear,
    Set(GroupId),
}

/// A validated submission for one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDraft {
    pub category: Category,
    pub name: String,
    pub group: GroupChange,
    /// `Some` sets the attribute, `None` clears it. Attributes missing from
    /// the map are left alone.
    pub attributes: BTreeMap<String, Option<String>>,
}

impl ItemDraft {
    /// Form field carrying the item name.
    pub const NAME_FIELD: &'static str = "name";

    /// Form field carrying the group reference.
    pub const GROUP_FIELD: &'static str = "group_id";

    const NAME_MAX: usize = FieldKind::TEXT_MAX;

    /// Validate a submission against the category schema.
    ///
    /// # Errors
    ///
    /// Returns every field-level problem at once; nothing is partially
    /// accepted.
    pub fn from_submission(
        category: Category,
        submission: &BTreeMap<String, String>,
    ) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let name = submission
            .get(Self::NAME_FIELD)
            .map(|v| v.trim())
            .unwrap_or_default();
        if name.is_empty() {
            errors.add(Self::NAME_FIELD, "is required");
        } else if name.chars().count() > Self::NAME_MAX {
            errors.add(
                Self::NAME_FIELD,
                format!("must be at most {} characters", Self::NAME_MAX),
            );
        }

        let group = match (category.group_kind(), submission.get(Self::GROUP_FIELD)) {
            (None, _) | (Some(_), None) => GroupChange::Keep,
            (Some(_), Some(raw)) if raw.trim().is_empty() => GroupChange::Clear,
            (Some(_), Some(raw)) => match raw.parse::<GroupId>() {
                Ok(id) => GroupChange::Set(id),
                Err(_) => {
                    errors.add(Self::GROUP_FIELD, "must reference an existing group");
                    GroupChange::Keep
                }
            },
        };

        let mut attributes = BTreeMap::new();
        for spec in category.fields() {
            let value = submission.get(spec.key).map(|v| v.trim());
            match value {
                None | Some("") if spec.required => errors.add(spec.key, "is required"),
                None => {}
                Some("") => {
                    attributes.insert(spec.key.to_owned(), None);
                }
                Some(raw) => match spec.kind.normalize(raw) {
                    Ok(canonical) => {
                        attributes.insert(spec.key.to_owned(), Some(canonical));
                    }
                    Err(message) => errors.add(spec.key, message),
                },
            }
        }

        if errors.is_empty() {
            Ok(Self {
                category,
                name: name.to_owned(),
                group,
                attributes,
            })
        } else {
            Err(errors)
        }
    }

    /// Group reference for a brand new item.
    #[must_use]
    pub const fn initial_group(&self) -> Option<GroupId> {
        match self.group {
            GroupChange::Set(id) => Some(id),
            GroupChange::Keep | GroupChange::Clear => None,
        }
    }

    /// Attribute values for a brand new item.
    #[must_use]
    pub fn initial_attributes(&self) -> BTreeMap<String, String> {
        self.attributes
            .iter()
            .filter_map(|(k, v)| v.as_ref().map(|v| (k.clone(), v.clone())))
            .collect()
    }

    /// Build the record a store should persist for a new item.
    #[must_use]
    pub fn into_item(self, id: super::ItemId, now: DateTime<Utc>) -> ContentItem {
        ContentItem {
            id,
            category: self.category,
            group_id: self.initial_group(),
            attributes: self.initial_attributes(),
            name: self.name,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply this draft to an existing item in place.
    pub fn apply_to(&self, item: &mut ContentItem, now: DateTime<Utc>) {
        item.name.clone_from(&self.name);
        match self.group {
            GroupChange::Keep => {}
            GroupChange::Clear => item.group_id = None,
            GroupChange::Set(id) => item.group_id = Some(id),
        }
        for (key, value) in &self.attributes {
            match value {
                Some(v) => {
                    item.attributes.insert(key.clone(), v.clone());
                }
                None => {
                    item.attributes.remove(key);
                }
            }
        }
        item.updated_at = now;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ItemId;

    fn submission(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn test_valid_armor_submission() {
        let draft = ItemDraft::from_submission(
            Category::Armor,
            &submission(&[
                ("name", "  Banished Knight Helm "),
                ("group_id", "3"),
                ("slot", "Head"),
                ("weight", "5.60"),
                ("poise", "7"),
            ]),
        )
        .unwrap();

        assert_eq!(draft.name, "Banished Knight Helm");
        assert_eq!(draft.group, GroupChange::Set(GroupId::new(3)));
        assert_eq!(draft.attributes["slot"], Some("head".to_owned()));
        assert_eq!(draft.attributes["weight"], Some("5.6".to_owned()));
        assert!(!draft.attributes.contains_key("description"));
    }

    #[test]
    fn test_missing_required_fields_are_all_reported() {
        let errors =
            ItemDraft::from_submission(Category::Armor, &submission(&[("poise", "x")]))
                .unwrap_err();

        assert_eq!(errors.get("name"), Some("is required"));
        assert_eq!(errors.get("slot"), Some("is required"));
        assert_eq!(errors.get("weight"), Some("is required"));
        assert_eq!(errors.get("poise"), Some("must be a whole number"));
    }

    #[test]
    fn test_blank_required_field_is_rejected() {
        let errors = ItemDraft::from_submission(
            Category::Npc,
            &submission(&[("name", "Patches"), ("location", "   ")]),
        )
        .unwrap_err();
        assert_eq!(errors.get("location"), Some("is required"));
    }

    #[test]
    fn test_group_field_ignored_without_groups() {
        let draft = ItemDraft::from_submission(
            Category::Npc,
            &submission(&[("name", "Patches"), ("location", "Murkwater Cave"), ("group_id", "x")]),
        )
        .unwrap();
        assert_eq!(draft.group, GroupChange::Keep);
    }

    #[test]
    fn test_bad_group_reference() {
        let errors = ItemDraft::from_submission(
            Category::Weapon,
            &submission(&[
                ("name", "Uchigatana"),
                ("attack_power", "115"),
                ("weight", "5.5"),
                ("group_id", "katanas"),
            ]),
        )
        .unwrap_err();
        assert!(errors.get("group_id").is_some());
    }

    #[test]
    fn test_apply_is_partial() {
        let now = Utc::now();
        let original = ItemDraft::from_submission(
            Category::Armor,
            &submission(&[
                ("name", "Helm"),
                ("group_id", "1"),
                ("slot", "head"),
                ("weight", "4"),
                ("poise", "3"),
                ("description", "Old"),
            ]),
        )
        .unwrap();
        let mut item = original.into_item(ItemId::new(9), now);

        let change = ItemDraft::from_submission(
            Category::Armor,
            &submission(&[
                ("name", "Better Helm"),
                ("group_id", ""),
                ("slot", "head"),
                ("weight", "4.5"),
                ("description", ""),
            ]),
        )
        .unwrap();
        change.apply_to(&mut item, now);

        assert_eq!(item.name, "Better Helm");
        assert_eq!(item.group_id, None);
        assert_eq!(item.attribute("weight"), Some("4.5"));
        // Absent: kept. Blank: cleared.
        assert_eq!(item.attribute("poise"), Some("3"));
        assert_eq!(item.attribute("description"), None);
    }

    #[test]
    fn test_display_lists_fields() {
        let mut errors = ValidationErrors::new();
        errors.add("name", "is required");
        errors.add("name", "ignored");
        errors.add("slot", "is required");
        assert_eq!(
            errors.to_string(),
            "validation failed: name is required; slot is required"
        );
    }
}
