pub mod context;
pub mod identity;

pub use context::{Context, UiState};
pub use identity::Identity;

/// Three-component float vector as the producer lays it out.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// One decoded frame of the shared link segment.
///
/// Built once per poll cycle and never mutated afterwards.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawSnapshot {
    pub ui_version: u32,
    /// Monotonic frame counter written by the producer.
    pub tick: u32,
    pub avatar_position: Vec3,
    pub avatar_front: Vec3,
    pub avatar_top: Vec3,
    pub camera_position: Vec3,
    pub camera_front: Vec3,
    pub camera_top: Vec3,
    /// Link name the producer identifies itself with.
    pub name: String,
    /// `None` when the embedded JSON was absent or malformed this cycle.
    pub identity: Option<Identity>,
    pub context: Context,
}
