//! Seed the default weapon groups and armor sets.
//!
//! Safe to run repeatedly: groups that already exist are skipped.

use grace_codex_core::GroupKind;
use grace_codex_site::db::{ContentStore, PgContentStore, RepositoryError};

use super::{CommandError, connect};

const WEAPON_GROUPS: &[(&str, &str)] = &[
    ("Daggers", "Short blades with fast attacks and high critical damage."),
    ("Straight Swords", "Balanced one-handed swords."),
    ("Greatswords", "Heavy two-handed swords."),
    ("Katanas", "Curved blades that cause blood loss."),
    ("Axes", "Chopping weapons with strong guard breaks."),
    ("Spears", "Thrusting weapons with long reach."),
    ("Bows", "Ranged weapons that fire arrows."),
    ("Glintstone Staffs", "Catalysts for sorceries."),
    ("Sacred Seals", "Catalysts for incantations."),
];

const ARMOR_SETS: &[(&str, &str)] = &[
    ("Vagabond Knight Set", "Armor worn by wandering knights."),
    ("Raging Wolf Set", "Armor of the Raging Wolf of Redmane."),
    ("Bull-Goat Set", "Heavy armor that grants great poise."),
    ("Banished Knight Set", "Armor of knights exiled from their lords."),
];

/// Insert every default group that is not there yet.
pub async fn run() -> Result<(), CommandError> {
    let content = PgContentStore::new(connect().await?);

    for kind in GroupKind::ALL {
        let defaults = match kind {
            GroupKind::WeaponGroup => WEAPON_GROUPS,
            GroupKind::ArmorSet => ARMOR_SETS,
        };

        let mut created = 0;
        for (name, description) in defaults {
            match content.create_group(kind, name, Some(description)).await {
                Ok(id) => {
                    created += 1;
                    tracing::debug!(%id, name, "Created group");
                }
                Err(RepositoryError::Conflict(_)) => {
                    tracing::debug!(name, "Group exists, skipping");
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::info!(
            kind = kind.plural_label(),
            created,
            skipped = defaults.len() - created,
            "Seeded groups"
        );
    }

    Ok(())
}
