use std::fmt;
use std::str::FromStr;

/// A resolved identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Named {
    pub id: u32,
    pub name: String,
}

impl Named {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// Placeholder carried by every identifier while disconnected.
    pub fn offline() -> Self {
        Self::new(0, "Offline")
    }
}

impl fmt::Display for Named {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedState {
    pub connected: bool,
    pub character_name: String,
    pub profession: Named,
    pub specialization: Named,
    pub map: Named,
    pub game_mode: Named,
    pub mount: Named,
    pub wvw_team: Named,
    pub commander: bool,
    pub map_open: bool,
    pub compass_top_right: bool,
    pub compass_rotating: bool,
    pub game_has_focus: bool,
    pub competitive_mode: bool,
    pub textbox_has_focus: bool,
    pub in_combat: bool,
}

impl ResolvedState {
    pub fn disconnected() -> Self {
        Self {
            connected: false,
            character_name: String::new(),
            profession: Named::offline(),
            specialization: Named::offline(),
            map: Named::offline(),
            game_mode: Named::offline(),
            mount: Named::offline(),
            wvw_team: Named::offline(),
            commander: false,
            map_open: false,
            compass_top_right: false,
            compass_rotating: false,
            game_has_focus: false,
            competitive_mode: false,
            textbox_has_focus: false,
            in_combat: false,
        }
    }

    pub fn get(&self, field: Field) -> FieldValue {
        match field {
            Field::Connected => FieldValue::Flag(self.connected),
            Field::CharacterName => FieldValue::Text(self.character_name.clone()),
            Field::Profession => FieldValue::Named(self.profession.clone()),
            Field::Specialization => FieldValue::Named(self.specialization.clone()),
            Field::Map => FieldValue::Named(self.map.clone()),
            Field::GameMode => FieldValue::Named(self.game_mode.clone()),
            Field::Mount => FieldValue::Named(self.mount.clone()),
            Field::WvwTeam => FieldValue::Named(self.wvw_team.clone()),
            Field::Commander => FieldValue::Flag(self.commander),
            Field::MapOpen => FieldValue::Flag(self.map_open),
            Field::CompassTopRight => FieldValue::Flag(self.compass_top_right),
            Field::CompassRotating => FieldValue::Flag(self.compass_rotating),
            Field::GameHasFocus => FieldValue::Flag(self.game_has_focus),
            Field::CompetitiveMode => FieldValue::Flag(self.competitive_mode),
            Field::TextboxHasFocus => FieldValue::Flag(self.textbox_has_focus),
            Field::InCombat => FieldValue::Flag(self.in_combat),
        }
    }
}

impl Default for ResolvedState {
    fn default() -> Self {
        Self::disconnected()
    }
}

/// Diff keys of [`ResolvedState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Connected,
    CharacterName,
    Profession,
    Specialization,
    Map,
    GameMode,
    Mount,
    WvwTeam,
    Commander,
    MapOpen,
    CompassTopRight,
    CompassRotating,
    GameHasFocus,
    CompetitiveMode,
    TextboxHasFocus,
    InCombat,
}

impl Field {
    pub const ALL: [Field; 16] = [
        Field::Connected,
        Field::CharacterName,
        Field::Profession,
        Field::Specialization,
        Field::Map,
        Field::GameMode,
        Field::Mount,
        Field::WvwTeam,
        Field::Commander,
        Field::MapOpen,
        Field::CompassTopRight,
        Field::CompassRotating,
        Field::GameHasFocus,
        Field::CompetitiveMode,
        Field::TextboxHasFocus,
        Field::InCombat,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Field::Connected => "connected",
            Field::CharacterName => "character_name",
            Field::Profession => "profession",
            Field::Specialization => "specialization",
            Field::Map => "map",
            Field::GameMode => "game_mode",
            Field::Mount => "mount",
            Field::WvwTeam => "wvw_team",
            Field::Commander => "commander",
            Field::MapOpen => "map_open",
            Field::CompassTopRight => "compass_top_right",
            Field::CompassRotating => "compass_rotating",
            Field::GameHasFocus => "game_has_focus",
            Field::CompetitiveMode => "competitive_mode",
            Field::TextboxHasFocus => "textbox_has_focus",
            Field::InCombat => "in_combat",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown state field `{0}`")]
pub struct UnknownField(pub String);

impl FromStr for Field {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| UnknownField(s.to_owned()))
    }
}

/// Value of one field, as handed to field subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Flag(bool),
    Text(String),
    Named(Named),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Flag(v) => write!(f, "{v}"),
            FieldValue::Text(v) => write!(f, "{v:?}"),
            FieldValue::Named(v) => write!(f, "{v}"),
        }
    }
}

/// Fields whose values differ. With no previous state every field counts as
/// changed.
pub fn diff(prev: Option<&ResolvedState>, next: &ResolvedState) -> Vec<Field> {
    let Some(prev) = prev else {
        return Field::ALL.to_vec();
    };
    Field::ALL
        .into_iter()
        .filter(|&field| prev.get(field) != next.get(field))
        .collect()
}
