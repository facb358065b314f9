use crate::now_secs;
use crate::policy::DatasetPolicy;
use lodestar_store::{Dataset, Store, StoreResult};
use tracing::info;

const PROFESSIONS: &[(u32, &str)] = &[
    (1, "Guardian"),
    (2, "Warrior"),
    (3, "Engineer"),
    (4, "Ranger"),
    (5, "Thief"),
    (6, "Elementalist"),
    (7, "Mesmer"),
    (8, "Necromancer"),
    (9, "Revenant"),
];

const MAP_TYPES: &[(u32, &str)] = &[
    (0, "Redirect"),
    (1, "Character Create"),
    (2, "PvP"),
    (3, "GvG"),
    (4, "Instance"),
    (5, "Open World"),
    (6, "Tournament"),
    (7, "Tutorial"),
    (8, "User Tournament"),
    (9, "WvW Eternal Battlegrounds"),
    (10, "WvW Blue Borderlands"),
    (11, "WvW Green Borderlands"),
    (12, "WvW Red Borderlands"),
    (13, "WvW Reward"),
    (14, "WvW Obsidian Sanctum"),
    (15, "WvW Edge of the Mists"),
    (16, "Public Mini"),
    (17, "Big Battle"),
    (18, "WvW Lounge"),
];

const MOUNTS: &[(u32, &str)] = &[
    (1, "Jackal"),
    (2, "Griffon"),
    (3, "Skimmer"),
    (4, "Raptor"),
    (5, "Roller Beetle"),
    (6, "Warclaw"),
    (7, "Skyscale"),
    (8, "Skiff"),
    (9, "Siege Turtle"),
];

// Community-sourced and incomplete. Unlisted ids resolve to "Team <id>".
const WVW_TEAMS: &[(u32, &str)] = &[(9, "Blue"), (55, "Green"), (376, "Red")];

fn rows(dataset: Dataset) -> &'static [(u32, &'static str)] {
    match dataset {
        Dataset::Profession => PROFESSIONS,
        Dataset::MapType => MAP_TYPES,
        Dataset::Mount => MOUNTS,
        Dataset::WvwTeam => WVW_TEAMS,
        Dataset::Specialization | Dataset::Map => &[],
    }
}

/// Write the built-in tables. Safe to call on every start: each dataset's
/// seed policy decides whether existing rows are kept or replaced.
pub fn seed_static(store: &Store) -> StoreResult<usize> {
    let now = now_secs();
    let mut written = 0;
    for dataset in Dataset::ALL {
        let rows = rows(dataset);
        if rows.is_empty() {
            continue;
        }
        let policy = DatasetPolicy::for_dataset(dataset).seed_policy;
        written += store.seed(dataset, rows, policy, now)?;
    }
    info!(written, "static datasets seeded");
    Ok(written)
}
