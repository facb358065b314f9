#![forbid(unsafe_code)]

/// Fixed-layout context blob that follows the identity document.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Context {
    pub map_id: u32,
    pub map_type: u32,
    pub shard_id: u32,
    pub instance: u32,
    pub build_id: u32,
    pub ui_state: UiState,
    pub compass_width: u16,
    pub compass_height: u16,
    pub compass_rotation: f32,
    pub player_x: f32,
    pub player_y: f32,
    pub map_center_x: f32,
    pub map_center_y: f32,
    pub map_scale: f32,
    pub process_id: u32,
    pub mount_index: u8,
}

// Bit positions are counted from the least significant bit.
const MAP_OPEN: u32 = 1 << 0;
const COMPASS_TOP_RIGHT: u32 = 1 << 1;
const COMPASS_ROTATING: u32 = 1 << 2;
const GAME_HAS_FOCUS: u32 = 1 << 3;
const COMPETITIVE_MODE: u32 = 1 << 4;
const TEXTBOX_HAS_FOCUS: u32 = 1 << 5;
const IN_COMBAT: u32 = 1 << 6;

/// The raw UI state flag word.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct UiState(pub u32);

impl UiState {
    #[inline]
    fn has(self, bit: u32) -> bool {
        self.0 & bit != 0
    }

    pub fn map_open(self) -> bool {
        self.has(MAP_OPEN)
    }

    pub fn compass_top_right(self) -> bool {
        self.has(COMPASS_TOP_RIGHT)
    }

    pub fn compass_rotating(self) -> bool {
        self.has(COMPASS_ROTATING)
    }

    pub fn game_has_focus(self) -> bool {
        self.has(GAME_HAS_FOCUS)
    }

    pub fn competitive_mode(self) -> bool {
        self.has(COMPETITIVE_MODE)
    }

    pub fn textbox_has_focus(self) -> bool {
        self.has(TEXTBOX_HAS_FOCUS)
    }

    pub fn in_combat(self) -> bool {
        self.has(IN_COMBAT)
    }
}
