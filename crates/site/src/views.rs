//! View models shared by templates.
//!
//! Templates stay logic-free: everything they branch on is precomputed here.

use std::collections::BTreeMap;

use grace_codex_core::{Category, ContentGroup, ContentItem, FieldKind, FieldSpec};

use crate::middleware::Viewer;

/// A link in a list or menu.
#[derive(Debug, Clone)]
pub struct Link {
    pub href: String,
    pub label: String,
}

impl Link {
    pub fn new(href: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            label: label.into(),
        }
    }
}

/// Page chrome: navigation and the logged-in user.
#[derive(Debug, Clone)]
pub struct Chrome {
    pub username: Option<String>,
    pub is_admin: bool,
    pub nav: Vec<Link>,
}

impl Chrome {
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            username: None,
            is_admin: false,
            nav: category_nav(),
        }
    }

    #[must_use]
    pub fn for_viewer(viewer: &Viewer) -> Self {
        Self {
            username: viewer.user().map(|u| u.username.to_string()),
            is_admin: viewer.is_admin(),
            nav: category_nav(),
        }
    }
}

fn category_nav() -> Vec<Link> {
    Category::ALL
        .into_iter()
        .map(|c| Link::new(format!("/{}", c.public_slug()), c.plural_label()))
        .collect()
}

/// Label/value pair on a detail page.
#[derive(Debug, Clone)]
pub struct DetailRow {
    pub label: String,
    pub value: String,
    pub long: bool,
}

/// Rows for every attribute that has a value, in schema order.
#[must_use]
pub fn detail_rows(item: &ContentItem) -> Vec<DetailRow> {
    item.category
        .fields()
        .iter()
        .filter_map(|spec| {
            item.attribute(spec.key).map(|value| DetailRow {
                label: spec.label.to_owned(),
                value: value.to_owned(),
                long: matches!(spec.kind, FieldKind::LongText),
            })
        })
        .collect()
}

/// Item link for list pages.
#[must_use]
pub fn item_link(item: &ContentItem) -> Link {
    Link::new(
        format!("/{}/{}", item.category.public_slug(), item.id),
        item.name.clone(),
    )
}

/// Group link for list pages.
#[must_use]
pub fn group_link(group: &ContentGroup) -> Link {
    Link::new(
        format!("/{}/{}", group.kind.public_slug(), group.id),
        group.name.clone(),
    )
}

/// One block of items on a list page. Grouped lists get one per group.
#[derive(Debug, Clone)]
pub struct Section {
    pub heading: Option<String>,
    pub href: Option<String>,
    pub items: Vec<Link>,
}

/// One option of a `<select>`.
#[derive(Debug, Clone)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

/// One input of an editor form.
#[derive(Debug, Clone)]
pub struct FormField {
    pub key: String,
    pub label: String,
    pub value: String,
    pub required: bool,
    pub error: Option<String>,
    pub is_long_text: bool,
    pub is_choice: bool,
    pub is_number: bool,
    pub options: Vec<SelectOption>,
}

impl FormField {
    fn from_spec(spec: &FieldSpec, value: &str, error: Option<&str>) -> Self {
        let options = spec
            .kind
            .options()
            .iter()
            .map(|o| SelectOption {
                value: (*o).to_owned(),
                label: (*o).to_owned(),
                selected: o.eq_ignore_ascii_case(value),
            })
            .collect();

        Self {
            key: spec.key.to_owned(),
            label: spec.label.to_owned(),
            value: value.to_owned(),
            required: spec.required,
            error: error.map(str::to_owned),
            is_long_text: matches!(spec.kind, FieldKind::LongText),
            is_choice: matches!(spec.kind, FieldKind::Choice(_)),
            is_number: matches!(spec.kind, FieldKind::Integer | FieldKind::Decimal),
            options,
        }
    }
}

/// Everything an add/modify form needs to render.
#[derive(Debug, Clone)]
pub struct EditorForm {
    pub name: String,
    pub name_error: Option<String>,
    pub fields: Vec<FormField>,
    pub group_label: Option<String>,
    pub group_error: Option<String>,
    pub group_options: Vec<SelectOption>,
}

impl EditorForm {
    /// Build a form from raw submitted (or stored) values.
    #[must_use]
    pub fn new(
        category: Category,
        values: &BTreeMap<String, String>,
        errors: &BTreeMap<String, String>,
        groups: &[ContentGroup],
    ) -> Self {
        let value = |key: &str| values.get(key).map(String::as_str).unwrap_or_default();
        let error = |key: &str| errors.get(key).map(String::as_str);

        let fields = category
            .fields()
            .iter()
            .map(|spec| FormField::from_spec(spec, value(spec.key), error(spec.key)))
            .collect();

        let current_group = value("group_id").trim();
        let group_options = groups
            .iter()
            .map(|g| SelectOption {
                value: g.id.to_string(),
                label: g.name.clone(),
                selected: g.id.to_string() == current_group,
            })
            .collect();

        Self {
            name: value("name").to_owned(),
            name_error: error("name").map(str::to_owned),
            fields,
            group_label: category.group_kind().map(|k| k.label().to_owned()),
            group_error: error("group_id").map(str::to_owned),
            group_options,
        }
    }

    /// Form prefilled from a stored item.
    #[must_use]
    pub fn from_item(item: &ContentItem, groups: &[ContentGroup]) -> Self {
        let mut values = item.attributes.clone();
        values.insert("name".to_owned(), item.name.clone());
        if let Some(group) = item.group_id {
            values.insert("group_id".to_owned(), group.to_string());
        }
        Self::new(item.category, &values, &BTreeMap::new(), groups)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use grace_codex_core::{GroupId, GroupKind, ItemId};

    use super::*;

    fn armor() -> ContentItem {
        ContentItem {
            id: ItemId::new(7),
            category: Category::Armor,
            name: "Raging Wolf Helm".to_owned(),
            group_id: Some(GroupId::new(2)),
            attributes: BTreeMap::from([
                ("slot".to_owned(), "head".to_owned()),
                ("weight".to_owned(), "5.2".to_owned()),
            ]),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn sets() -> Vec<ContentGroup> {
        vec![
            ContentGroup {
                id: GroupId::new(1),
                kind: GroupKind::ArmorSet,
                name: "Bull-Goat Set".to_owned(),
                description: None,
            },
            ContentGroup {
                id: GroupId::new(2),
                kind: GroupKind::ArmorSet,
                name: "Raging Wolf Set".to_owned(),
                description: None,
            },
        ]
    }

    #[test]
    fn test_detail_rows_skip_unset_attributes() {
        let rows = detail_rows(&armor());
        let labels: Vec<&str> = rows.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, ["Slot", "Weight"]);
    }

    #[test]
    fn test_form_from_item_selects_current_values() {
        let form = EditorForm::from_item(&armor(), &sets());
        assert_eq!(form.name, "Raging Wolf Helm");
        assert_eq!(form.group_label.as_deref(), Some("Armor Set"));

        let selected: Vec<&str> = form
            .group_options
            .iter()
            .filter(|o| o.selected)
            .map(|o| o.label.as_str())
            .collect();
        assert_eq!(selected, ["Raging Wolf Set"]);

        let slot = form.fields.iter().find(|f| f.key == "slot").unwrap();
        assert!(slot.is_choice);
        assert!(slot.options.iter().any(|o| o.value == "head" && o.selected));
    }

    #[test]
    fn test_form_carries_errors() {
        let errors = BTreeMap::from([("weight".to_owned(), "is required".to_owned())]);
        let form = EditorForm::new(Category::Armor, &BTreeMap::new(), &errors, &[]);
        let weight = form.fields.iter().find(|f| f.key == "weight").unwrap();
        assert_eq!(weight.error.as_deref(), Some("is required"));
        assert!(weight.is_number);
    }
}
