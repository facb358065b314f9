mod layout;
mod liveness;
mod reader;
mod writer;

pub use layout::{LINK_SIZE, decode_frame, offsets};
pub use liveness::{DEFAULT_STALE_THRESHOLD, Liveness};
pub use reader::{LinkFrame, SharedMemoryReader};
pub use writer::FrameWriter;
