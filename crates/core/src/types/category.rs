//! Content categories and their field schemas.
//!
//! Every category shares the same shape: a required `name`, an optional
//! group membership (weapons and armor only), and a list of
//! category-specific attributes described by [`FieldSpec`]s. The editor
//! workflow, the stores, and the templates are all driven by these tables.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A slug did not name any known category or group kind.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown slug: {0}")]
pub struct UnknownSlug(pub String);

/// A kind of game reference data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Npc,
    Weapon,
    Armor,
    Talisman,
    Magic,
    SpiritAsh,
    KeyItem,
    Bolster,
}

/// A named collection that items of one category may belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    WeaponGroup,
    ArmorSet,
}

/// How an attribute is entered and validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Single line of text, at most [`FieldKind::TEXT_MAX`] characters.
    Text,
    /// Multi-line text, at most [`FieldKind::LONG_TEXT_MAX`] characters.
    LongText,
    /// Whole number (`i64`).
    Integer,
    /// Decimal number, stored normalized (`1.50` becomes `1.5`).
    Decimal,
    /// One of a fixed set of options.
    Choice(&'static [&'static str]),
}

/// One category-specific attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Form field name and storage key.
    pub key: &'static str,
    /// Human-readable label.
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

const fn field(key: &'static str, label: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        key,
        label,
        kind,
        required: false,
    }
}

const fn required(key: &'static str, label: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        key,
        label,
        kind,
        required: true,
    }
}

const DAMAGE_TYPES: &[&str] = &[
    "standard",
    "strike",
    "slash",
    "pierce",
    "magic",
    "fire",
    "lightning",
    "holy",
];
const ARMOR_SLOTS: &[&str] = &["head", "chest", "arms", "legs"];
const MAGIC_SCHOOLS: &[&str] = &["sorcery", "incantation"];

const NPC_FIELDS: &[FieldSpec] = &[
    required("location", "Location", FieldKind::Text),
    field("role", "Role", FieldKind::Text),
    field("quest", "Questline", FieldKind::LongText),
    field("description", "Description", FieldKind::LongText),
];

const WEAPON_FIELDS: &[FieldSpec] = &[
    field("damage_type", "Damage type", FieldKind::Choice(DAMAGE_TYPES)),
    required("attack_power", "Attack power", FieldKind::Integer),
    required("weight", "Weight", FieldKind::Decimal),
    field("scaling", "Scaling", FieldKind::Text),
    field("description", "Description", FieldKind::LongText),
];

const ARMOR_FIELDS: &[FieldSpec] = &[
    required("slot", "Slot", FieldKind::Choice(ARMOR_SLOTS)),
    required("weight", "Weight", FieldKind::Decimal),
    field("poise", "Poise", FieldKind::Integer),
    field("description", "Description", FieldKind::LongText),
];

const TALISMAN_FIELDS: &[FieldSpec] = &[
    required("effect", "Effect", FieldKind::LongText),
    field("weight", "Weight", FieldKind::Decimal),
    field("location", "Location", FieldKind::Text),
];

const MAGIC_FIELDS: &[FieldSpec] = &[
    required("school", "School", FieldKind::Choice(MAGIC_SCHOOLS)),
    field("fp_cost", "FP cost", FieldKind::Integer),
    field("slots", "Memory slots", FieldKind::Integer),
    required("effect", "Effect", FieldKind::LongText),
];

const SPIRIT_ASH_FIELDS: &[FieldSpec] = &[
    field("fp_cost", "FP cost", FieldKind::Integer),
    field("hp_cost", "HP cost", FieldKind::Integer),
    required("effect", "Effect", FieldKind::LongText),
];

const KEY_ITEM_FIELDS: &[FieldSpec] = &[
    field("usage", "Usage", FieldKind::LongText),
    field("location", "Location", FieldKind::Text),
];

const BOLSTER_FIELDS: &[FieldSpec] = &[
    required("effect", "Effect", FieldKind::Text),
    field("location", "Location", FieldKind::Text),
];

impl Category {
    /// Every category, in navigation order.
    pub const ALL: [Self; 8] = [
        Self::Npc,
        Self::Weapon,
        Self::Armor,
        Self::Talisman,
        Self::Magic,
        Self::SpiritAsh,
        Self::KeyItem,
        Self::Bolster,
    ];

    /// Singular display name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Npc => "NPC",
            Self::Weapon => "Weapon",
            Self::Armor => "Armor",
            Self::Talisman => "Talisman",
            Self::Magic => "Spell",
            Self::SpiritAsh => "Spirit Ash",
            Self::KeyItem => "Key Item",
            Self::Bolster => "Bolstering Material",
        }
    }

    /// Collection display name.
    #[must_use]
    pub const fn plural_label(self) -> &'static str {
        match self {
            Self::Npc => "NPCs",
            Self::Weapon => "Weapons",
            Self::Armor => "Armor",
            Self::Talisman => "Talismans",
            Self::Magic => "Magic",
            Self::SpiritAsh => "Spirit Ashes",
            Self::KeyItem => "Key Items",
            Self::Bolster => "Bolstering Materials",
        }
    }

    /// Path segment of the public pages and the JSON API (`/armors/7`).
    #[must_use]
    pub const fn public_slug(self) -> &'static str {
        match self {
            Self::Npc => "npcs",
            Self::Weapon => "weapons",
            Self::Armor => "armors",
            Self::Talisman => "talismans",
            Self::Magic => "magic",
            Self::SpiritAsh => "spirit_ashes",
            Self::KeyItem => "key_items",
            Self::Bolster => "bolsters",
        }
    }

    /// Path segment under `/editor` (`/editor/armor/add`).
    #[must_use]
    pub const fn editor_slug(self) -> &'static str {
        match self {
            Self::Armor => "armor",
            other => other.public_slug(),
        }
    }

    /// Table holding items of this category.
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::Npc => "npc",
            Self::Weapon => "weapon",
            Self::Armor => "armor",
            Self::Talisman => "talisman",
            Self::Magic => "magic",
            Self::SpiritAsh => "spirit_ash",
            Self::KeyItem => "key_item",
            Self::Bolster => "bolster",
        }
    }

    /// The kind of group items of this category can belong to, if any.
    #[must_use]
    pub const fn group_kind(self) -> Option<GroupKind> {
        match self {
            Self::Weapon => Some(GroupKind::WeaponGroup),
            Self::Armor => Some(GroupKind::ArmorSet),
            _ => None,
        }
    }

    /// Category-specific attributes, in form order.
    #[must_use]
    pub const fn fields(self) -> &'static [FieldSpec] {
        match self {
            Self::Npc => NPC_FIELDS,
            Self::Weapon => WEAPON_FIELDS,
            Self::Armor => ARMOR_FIELDS,
            Self::Talisman => TALISMAN_FIELDS,
            Self::Magic => MAGIC_FIELDS,
            Self::SpiritAsh => SPIRIT_ASH_FIELDS,
            Self::KeyItem => KEY_ITEM_FIELDS,
            Self::Bolster => BOLSTER_FIELDS,
        }
    }

    /// Look up one attribute by key.
    #[must_use]
    pub fn field(self, key: &str) -> Option<&'static FieldSpec> {
        self.fields().iter().find(|f| f.key == key)
    }

    /// Resolve a public slug (`armors`).
    ///
    /// # Errors
    ///
    /// Returns `UnknownSlug` if no category uses this slug.
    pub fn from_public_slug(slug: &str) -> Result<Self, UnknownSlug> {
        Self::ALL
            .into_iter()
            .find(|c| c.public_slug() == slug)
            .ok_or_else(|| UnknownSlug(slug.to_owned()))
    }

    /// Resolve an editor slug (`armor`).
    ///
    /// # Errors
    ///
    /// Returns `UnknownSlug` if no category uses this slug.
    pub fn from_editor_slug(slug: &str) -> Result<Self, UnknownSlug> {
        Self::ALL
            .into_iter()
            .find(|c| c.editor_slug() == slug)
            .ok_or_else(|| UnknownSlug(slug.to_owned()))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = UnknownSlug;

    /// Parses the storage name (`spirit_ash`), as used by the CLI.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.table() == s)
            .ok_or_else(|| UnknownSlug(s.to_owned()))
    }
}

impl GroupKind {
    /// Every group kind.
    pub const ALL: [Self; 2] = [Self::WeaponGroup, Self::ArmorSet];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::WeaponGroup => "Weapon Group",
            Self::ArmorSet => "Armor Set",
        }
    }

    #[must_use]
    pub const fn plural_label(self) -> &'static str {
        match self {
            Self::WeaponGroup => "Weapon Groups",
            Self::ArmorSet => "Armor Sets",
        }
    }

    /// Path segment of the public group pages (`/weapon_groups/3`).
    #[must_use]
    pub const fn public_slug(self) -> &'static str {
        match self {
            Self::WeaponGroup => "weapon_groups",
            Self::ArmorSet => "armor_sets",
        }
    }

    /// Path segment under the member category's editor
    /// (`/editor/armor/set/delete/3`).
    #[must_use]
    pub const fn editor_slug(self) -> &'static str {
        match self {
            Self::WeaponGroup => "group",
            Self::ArmorSet => "set",
        }
    }

    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::WeaponGroup => "weapon_group",
            Self::ArmorSet => "armor_set",
        }
    }

    /// The category whose items join groups of this kind.
    #[must_use]
    pub const fn member_category(self) -> Category {
        match self {
            Self::WeaponGroup => Category::Weapon,
            Self::ArmorSet => Category::Armor,
        }
    }
}

impl std::fmt::Display for GroupKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for GroupKind {
    type Err = UnknownSlug;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|g| g.table() == s)
            .ok_or_else(|| UnknownSlug(s.to_owned()))
    }
}

impl FieldKind {
    /// Maximum length of a [`FieldKind::Text`] value.
    pub const TEXT_MAX: usize = 200;

    /// Maximum length of a [`FieldKind::LongText`] value.
    pub const LONG_TEXT_MAX: usize = 5000;

    /// Validate a non-blank, trimmed input and return its canonical form.
    ///
    /// # Errors
    ///
    /// Returns a user-facing message if the value does not fit this kind.
    pub fn normalize(self, value: &str) -> Result<String, String> {
        match self {
            Self::Text => within(value, Self::TEXT_MAX),
            Self::LongText => within(value, Self::LONG_TEXT_MAX),
            Self::Integer => value
                .parse::<i64>()
                .map(|n| n.to_string())
                .map_err(|_| "must be a whole number".to_owned()),
            Self::Decimal => Decimal::from_str(value)
                .map(|d| d.normalize().to_string())
                .map_err(|_| "must be a number".to_owned()),
            Self::Choice(options) => options
                .iter()
                .find(|o| o.eq_ignore_ascii_case(value))
                .map(|o| (*o).to_owned())
                .ok_or_else(|| format!("must be one of: {}", options.join(", "))),
        }
    }

    /// Options for choice fields, empty otherwise.
    #[must_use]
    pub const fn options(self) -> &'static [&'static str] {
        match self {
            Self::Choice(options) => options,
            _ => &[],
        }
    }
}

fn within(value: &str, max: usize) -> Result<String, String> {
    if value.chars().count() > max {
        Err(format!("must be at most {max} characters"))
    } else {
        Ok(value.to_owned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_slugs_roundtrip() {
        for category in Category::ALL {
            assert_eq!(
                Category::from_public_slug(category.public_slug()).unwrap(),
                category
            );
            assert_eq!(
                Category::from_editor_slug(category.editor_slug()).unwrap(),
                category
            );
            assert_eq!(category.table().parse::<Category>().unwrap(), category);
        }
    }

    #[test]
    fn test_armor_slugs_differ() {
        assert_eq!(Category::Armor.public_slug(), "armors");
        assert_eq!(Category::Armor.editor_slug(), "armor");
        assert!(Category::from_public_slug("armor").is_err());
    }

    #[test]
    fn test_group_kinds_point_back() {
        for kind in GroupKind::ALL {
            assert_eq!(kind.member_category().group_kind(), Some(kind));
        }
        assert_eq!(Category::Npc.group_kind(), None);
    }

    #[test]
    fn test_every_category_has_fields() {
        for category in Category::ALL {
            assert!(!category.fields().is_empty(), "{category} has no fields");
            assert!(category.field("name").is_none(), "name is not an attribute");
        }
    }

    #[test]
    fn test_normalize_integer() {
        assert_eq!(FieldKind::Integer.normalize("042").unwrap(), "42");
        assert!(FieldKind::Integer.normalize("4.2").is_err());
    }

    #[test]
    fn test_normalize_decimal() {
        assert_eq!(FieldKind::Decimal.normalize("9.50").unwrap(), "9.5");
        assert_eq!(FieldKind::Decimal.normalize("3").unwrap(), "3");
        assert!(FieldKind::Decimal.normalize("heavy").is_err());
    }

    #[test]
    fn test_normalize_choice_is_case_insensitive() {
        let kind = FieldKind::Choice(ARMOR_SLOTS);
        assert_eq!(kind.normalize("Head").unwrap(), "head");
        assert!(kind.normalize("feet").is_err());
    }

    #[test]
    fn test_normalize_text_length() {
        assert!(FieldKind::Text.normalize(&"a".repeat(200)).is_ok());
        assert!(FieldKind::Text.normalize(&"a".repeat(201)).is_err());
        assert!(FieldKind::LongText.normalize(&"a".repeat(201)).is_ok());
    }
}
