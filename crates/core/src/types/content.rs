//! Content records as the stores hand them out.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::category::{Category, GroupKind};
use super::id::{GroupId, ItemId};

/// One record of game data (an NPC, a weapon, an armor piece, ...).
///
/// Attribute values are the canonical strings produced by
/// [`FieldKind::normalize`](super::FieldKind::normalize); unset optional
/// attributes are simply absent from the map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: ItemId,
    pub category: Category,
    pub name: String,
    pub group_id: Option<GroupId>,
    pub attributes: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContentItem {
    /// Stored value of one attribute.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Case-insensitive name filter used by list pages.
    #[must_use]
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim();
        query.is_empty() || self.name.to_lowercase().contains(&query.to_lowercase())
    }
}

/// A named collection of items (a weapon group or an armor set).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentGroup {
    pub id: GroupId,
    pub kind: GroupKind,
    pub name: String,
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str) -> ContentItem {
        ContentItem {
            id: ItemId::new(1),
            category: Category::Talisman,
            name: name.to_owned(),
            group_id: None,
            attributes: BTreeMap::from([("effect".to_owned(), "Raises HP".to_owned())]),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_matches_is_case_insensitive() {
        let talisman = item("Erdtree's Favor");
        assert!(talisman.matches("erdtree"));
        assert!(talisman.matches("FAVOR"));
        assert!(talisman.matches("  "));
        assert!(!talisman.matches("crimson"));
    }

    #[test]
    fn test_attribute_lookup() {
        let talisman = item("Erdtree's Favor");
        assert_eq!(talisman.attribute("effect"), Some("Raises HP"));
        assert_eq!(talisman.attribute("weight"), None);
    }
}
