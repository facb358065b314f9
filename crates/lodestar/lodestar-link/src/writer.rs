use crate::layout::{LINK_SIZE, offsets};
use lodestar_snapshot::{Context, Vec3};

/// Producer-side encoder for the link layout.
///
/// Writes fields in place into a segment-sized buffer. Used to drive the
/// reader from test harnesses and benchmarks without the real producer.
pub struct FrameWriter<'a> {
    buf: &'a mut [u8],
}

impl<'a> FrameWriter<'a> {
    /// # Panics
    /// Panics if `buf` is shorter than `LINK_SIZE`.
    pub fn new(buf: &'a mut [u8]) -> Self {
        assert!(buf.len() >= LINK_SIZE, "buffer smaller than link segment");
        Self { buf }
    }

    fn put_u32(&mut self, at: usize, v: u32) {
        self.buf[at..at + 4].copy_from_slice(&v.to_le_bytes());
    }

    fn put_u16(&mut self, at: usize, v: u16) {
        self.buf[at..at + 2].copy_from_slice(&v.to_le_bytes());
    }

    fn put_f32(&mut self, at: usize, v: f32) {
        self.put_u32(at, v.to_bits());
    }

    fn put_vec3(&mut self, at: usize, v: Vec3) {
        self.put_f32(at, v.x);
        self.put_f32(at + 4, v.y);
        self.put_f32(at + 8, v.z);
    }

    /// Truncates to the field width, always leaving room for a NUL.
    fn put_wide(&mut self, at: usize, units: usize, text: &str) {
        let field = &mut self.buf[at..at + units * 2];
        field.fill(0);
        for (i, unit) in text.encode_utf16().take(units - 1).enumerate() {
            field[i * 2..i * 2 + 2].copy_from_slice(&unit.to_le_bytes());
        }
    }

    pub fn set_ui_version(&mut self, v: u32) {
        self.put_u32(offsets::UI_VERSION, v);
    }

    pub fn set_tick(&mut self, tick: u32) {
        self.put_u32(offsets::TICK, tick);
    }

    pub fn set_avatar_position(&mut self, v: Vec3) {
        self.put_vec3(offsets::AVATAR_POSITION, v);
    }

    pub fn set_avatar_front(&mut self, v: Vec3) {
        self.put_vec3(offsets::AVATAR_FRONT, v);
    }

    pub fn set_camera_position(&mut self, v: Vec3) {
        self.put_vec3(offsets::CAMERA_POSITION, v);
    }

    pub fn set_camera_front(&mut self, v: Vec3) {
        self.put_vec3(offsets::CAMERA_FRONT, v);
    }

    pub fn set_name(&mut self, name: &str) {
        self.put_wide(offsets::NAME, offsets::WIDE_FIELD_UNITS, name);
    }

    pub fn set_identity(&mut self, json: &str) {
        self.put_wide(offsets::IDENTITY, offsets::WIDE_FIELD_UNITS, json);
    }

    pub fn set_context(&mut self, ctx: &Context) {
        use offsets::context as c;
        let base = offsets::CONTEXT;
        self.put_u32(offsets::CONTEXT_LEN, 88);
        self.put_u32(base + c::MAP_ID, ctx.map_id);
        self.put_u32(base + c::MAP_TYPE, ctx.map_type);
        self.put_u32(base + c::SHARD_ID, ctx.shard_id);
        self.put_u32(base + c::INSTANCE, ctx.instance);
        self.put_u32(base + c::BUILD_ID, ctx.build_id);
        self.put_u32(base + c::UI_STATE, ctx.ui_state.0);
        self.put_u16(base + c::COMPASS_WIDTH, ctx.compass_width);
        self.put_u16(base + c::COMPASS_HEIGHT, ctx.compass_height);
        self.put_f32(base + c::COMPASS_ROTATION, ctx.compass_rotation);
        self.put_f32(base + c::PLAYER_X, ctx.player_x);
        self.put_f32(base + c::PLAYER_Y, ctx.player_y);
        self.put_f32(base + c::MAP_CENTER_X, ctx.map_center_x);
        self.put_f32(base + c::MAP_CENTER_Y, ctx.map_center_y);
        self.put_f32(base + c::MAP_SCALE, ctx.map_scale);
        self.put_u32(base + c::PROCESS_ID, ctx.process_id);
        self.buf[base + c::MOUNT_INDEX] = ctx.mount_index;
    }
}
