/// Reference datasets with one resolution table each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dataset {
    Profession,
    Specialization,
    Map,
    MapType,
    Mount,
    WvwTeam,
}

impl Dataset {
    pub const ALL: [Dataset; 6] = [
        Dataset::Profession,
        Dataset::Specialization,
        Dataset::Map,
        Dataset::MapType,
        Dataset::Mount,
        Dataset::WvwTeam,
    ];

    /// Table name. Only ever these literals reach SQL text.
    pub fn table(&self) -> &'static str {
        match self {
            Dataset::Profession => "professions",
            Dataset::Specialization => "specializations",
            Dataset::Map => "maps",
            Dataset::MapType => "map_types",
            Dataset::Mount => "mounts",
            Dataset::WvwTeam => "wvw_teams",
        }
    }

    /// Human label used in fallback names, e.g. `"Map 1155"`.
    pub fn label(&self) -> &'static str {
        match self {
            Dataset::Profession => "Profession",
            Dataset::Specialization => "Specialization",
            Dataset::Map => "Map",
            Dataset::MapType => "Map Type",
            Dataset::Mount => "Mount",
            Dataset::WvwTeam => "Team",
        }
    }
}
