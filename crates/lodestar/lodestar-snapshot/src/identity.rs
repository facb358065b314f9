#![forbid(unsafe_code)]

use serde::Deserialize;

/// Character identity the producer embeds as a JSON document.
///
/// Every field defaults so that older or partial documents still parse.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Identity {
    pub name: String,
    pub profession: u32,
    #[serde(rename = "spec")]
    pub specialization: u32,
    pub race: u32,
    pub map_id: u32,
    pub world_id: u64,
    pub team_color_id: u32,
    pub commander: bool,
    pub fov: f32,
    #[serde(rename = "uisz")]
    pub ui_size: u32,
}

impl Identity {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
