//! Binary layout of the link segment and the frame decoder.
//!
//! The producer writes one fixed-size frame in place, over and over. Every
//! field lives at a fixed offset; all integers and floats are little-endian
//! and strings are NUL-padded UTF-16.
//!
//! # Memory Layout
//!
//! ```text
//! ┌──────────┬──────────┬──────────────────────────────┬───────────────────┐
//! │ version  │  tick    │ avatar pos / front / top     │ name              │
//! │ u32 @0   │ u32 @4   │ f32x3 @8, @20, @32           │ utf16x256 @44     │
//! ├──────────┴──────────┴──────────────────────────────┼───────────────────┤
//! │ camera pos / front / top  f32x3 @556, @568, @580    │ identity json     │
//! │                                                     │ utf16x256 @592    │
//! ├──────────────┬──────────────────────────────────────┴───────────────────┤
//! │ context_len  │ context blob (256 bytes) @1108                            │
//! │ u32 @1104    │                                                           │
//! ├──────────────┴───────────────────────────────────────────────────────────┤
//! │ description utf16x2048 @1364 (not decoded)                    end @5460 │
//! └──────────────────────────────────────────────────────────────────────────┘
//! ```

use lodestar_snapshot::{Context, Identity, RawSnapshot, UiState, Vec3};
use tracing::trace;

/// Total bytes of the link segment.
pub const LINK_SIZE: usize = 5460;

/// Byte offsets into the segment. Context offsets are relative to the start
/// of the context blob.
pub mod offsets {
    pub const UI_VERSION: usize = 0;
    pub const TICK: usize = 4;
    pub const AVATAR_POSITION: usize = 8;
    pub const AVATAR_FRONT: usize = 20;
    pub const AVATAR_TOP: usize = 32;
    pub const NAME: usize = 44;
    pub const CAMERA_POSITION: usize = 556;
    pub const CAMERA_FRONT: usize = 568;
    pub const CAMERA_TOP: usize = 580;
    pub const IDENTITY: usize = 592;
    pub const CONTEXT_LEN: usize = 1104;
    pub const CONTEXT: usize = 1108;
    pub const DESCRIPTION: usize = 1364;

    /// UTF-16 code units in the name and identity fields.
    pub const WIDE_FIELD_UNITS: usize = 256;
    pub const CONTEXT_SIZE: usize = 256;

    pub mod context {
        pub const MAP_ID: usize = 28;
        pub const MAP_TYPE: usize = 32;
        pub const SHARD_ID: usize = 36;
        pub const INSTANCE: usize = 40;
        pub const BUILD_ID: usize = 44;
        pub const UI_STATE: usize = 48;
        pub const COMPASS_WIDTH: usize = 52;
        pub const COMPASS_HEIGHT: usize = 54;
        pub const COMPASS_ROTATION: usize = 56;
        pub const PLAYER_X: usize = 60;
        pub const PLAYER_Y: usize = 64;
        pub const MAP_CENTER_X: usize = 68;
        pub const MAP_CENTER_Y: usize = 72;
        pub const MAP_SCALE: usize = 76;
        pub const PROCESS_ID: usize = 80;
        pub const MOUNT_INDEX: usize = 84;
    }
}

#[inline]
pub(crate) fn read_u32(b: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([b[at], b[at + 1], b[at + 2], b[at + 3]])
}

#[inline]
fn read_u16(b: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([b[at], b[at + 1]])
}

#[inline]
fn read_f32(b: &[u8], at: usize) -> f32 {
    f32::from_bits(read_u32(b, at))
}

#[inline]
fn read_vec3(b: &[u8], at: usize) -> Vec3 {
    Vec3 {
        x: read_f32(b, at),
        y: read_f32(b, at + 4),
        z: read_f32(b, at + 8),
    }
}

/// Decode a NUL-padded UTF-16 field of `units` code units. Everything from
/// the first NUL on is padding. Unpaired surrogates become U+FFFD.
fn read_wide(b: &[u8], at: usize, units: usize) -> String {
    let field = &b[at..at + units * 2];
    let wide: Vec<u16> = field
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .take_while(|&unit| unit != 0)
        .collect();
    String::from_utf16_lossy(&wide)
}

fn decode_identity(b: &[u8]) -> Option<Identity> {
    let text = read_wide(b, offsets::IDENTITY, offsets::WIDE_FIELD_UNITS);
    if text.is_empty() {
        return None;
    }
    match Identity::from_json(&text) {
        Ok(identity) => Some(identity),
        Err(e) => {
            // The producer rewrites this field every frame, so a bad
            // document is usually a torn write and gone next cycle.
            trace!(error = %e, "discarding malformed identity document");
            None
        }
    }
}

fn decode_context(b: &[u8]) -> Context {
    use offsets::context as c;
    let ctx = &b[offsets::CONTEXT..offsets::CONTEXT + offsets::CONTEXT_SIZE];
    Context {
        map_id: read_u32(ctx, c::MAP_ID),
        map_type: read_u32(ctx, c::MAP_TYPE),
        shard_id: read_u32(ctx, c::SHARD_ID),
        instance: read_u32(ctx, c::INSTANCE),
        build_id: read_u32(ctx, c::BUILD_ID),
        ui_state: UiState(read_u32(ctx, c::UI_STATE)),
        compass_width: read_u16(ctx, c::COMPASS_WIDTH),
        compass_height: read_u16(ctx, c::COMPASS_HEIGHT),
        compass_rotation: read_f32(ctx, c::COMPASS_ROTATION),
        player_x: read_f32(ctx, c::PLAYER_X),
        player_y: read_f32(ctx, c::PLAYER_Y),
        map_center_x: read_f32(ctx, c::MAP_CENTER_X),
        map_center_y: read_f32(ctx, c::MAP_CENTER_Y),
        map_scale: read_f32(ctx, c::MAP_SCALE),
        process_id: read_u32(ctx, c::PROCESS_ID),
        mount_index: ctx[c::MOUNT_INDEX],
    }
}

/// Decode one frame.
///
/// Total over every possible buffer: each offset is in bounds of
/// `LINK_SIZE`, and a bad identity document only clears `identity`.
pub fn decode_frame(frame: &[u8; LINK_SIZE]) -> RawSnapshot {
    let b: &[u8] = frame;
    RawSnapshot {
        ui_version: read_u32(b, offsets::UI_VERSION),
        tick: read_u32(b, offsets::TICK),
        avatar_position: read_vec3(b, offsets::AVATAR_POSITION),
        avatar_front: read_vec3(b, offsets::AVATAR_FRONT),
        avatar_top: read_vec3(b, offsets::AVATAR_TOP),
        camera_position: read_vec3(b, offsets::CAMERA_POSITION),
        camera_front: read_vec3(b, offsets::CAMERA_FRONT),
        camera_top: read_vec3(b, offsets::CAMERA_TOP),
        name: read_wide(b, offsets::NAME, offsets::WIDE_FIELD_UNITS),
        identity: decode_identity(b),
        context: decode_context(b),
    }
}
