//! Consumer side of the link segment.
//!
//! The producer only attaches to a segment that already exists, so the
//! reader creates it. Every failure here is logged and turned into `false` or
//! `None`; the caller retries on a later cycle.

use crate::layout::{LINK_SIZE, decode_frame, offsets, read_u32};
use crate::liveness::Liveness;
use lodestar_mmap::SharedSegment;
use lodestar_snapshot::RawSnapshot;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Copies attempted before accepting a frame the producer is still writing.
const COPY_ATTEMPTS: usize = 3;

/// One poll's result: the decoded frame and whether the producer is live.
#[derive(Clone, Debug)]
pub struct LinkFrame {
    pub snapshot: RawSnapshot,
    pub connected: bool,
}

pub struct SharedMemoryReader {
    path: PathBuf,
    /// `None` until `open()` succeeds and after `close()`.
    segment: Option<SharedSegment>,
    liveness: Liveness,
    /// Scratch copy of the segment, reused every poll.
    frame: Box<[u8; LINK_SIZE]>,
}

impl SharedMemoryReader {
    pub fn new<P: AsRef<Path>>(path: P, stale_threshold: u32) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            segment: None,
            liveness: Liveness::new(stale_threshold),
            frame: Box::new([0u8; LINK_SIZE]),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.segment.is_some()
    }

    /// Create or open the segment and map it. Returns `true` if the segment
    /// is mapped after the call.
    pub fn open(&mut self) -> bool {
        if self.segment.is_some() {
            return true;
        }
        match SharedSegment::create_or_open(&self.path, LINK_SIZE as u64) {
            Ok(segment) => {
                info!(path = %self.path.display(), "link segment mapped");
                self.segment = Some(segment);
                true
            }
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "failed to map link segment");
                false
            }
        }
    }

    /// Decode the current frame. `None` if the segment is not mapped.
    pub fn read(&mut self) -> Option<LinkFrame> {
        let segment = self.segment.as_ref()?;
        let live = segment.as_slice();
        if live.len() < LINK_SIZE {
            warn!(len = live.len(), "link segment shorter than frame");
            return None;
        }

        // The producer writes in place without a lock. Take a private copy
        // and retry if the tick moved underneath it; past the last attempt
        // the newest copy is used as is.
        for attempt in 1..=COPY_ATTEMPTS {
            self.frame.copy_from_slice(&live[..LINK_SIZE]);
            let copied = read_u32(&self.frame[..], offsets::TICK);
            if read_u32(live, offsets::TICK) == copied {
                break;
            }
            debug!(attempt, "frame changed during copy");
        }

        let snapshot = decode_frame(&self.frame);
        let connected = self.liveness.observe(snapshot.tick);
        Some(LinkFrame {
            snapshot,
            connected,
        })
    }

    /// Unmap the segment. Safe to call repeatedly.
    pub fn close(&mut self) {
        if self.segment.take().is_some() {
            debug!(path = %self.path.display(), "link segment unmapped");
        }
        self.liveness.reset();
    }
}

impl Drop for SharedMemoryReader {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::FrameWriter;

    #[test]
    fn read_before_open_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let mut reader = SharedMemoryReader::new(dir.path().join("link"), 3);
        assert!(reader.read().is_none());
    }

    #[test]
    fn open_creates_full_size_segment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("link");
        let mut reader = SharedMemoryReader::new(&path, 3);
        assert!(reader.open());
        assert!(reader.open(), "second open is a no-op");
        assert_eq!(std::fs::metadata(&path).unwrap().len(), LINK_SIZE as u64);
    }

    #[test]
    fn open_failure_is_false() {
        let dir = tempfile::tempdir().unwrap();
        let mut reader = SharedMemoryReader::new(dir.path().join("missing/dir/link"), 3);
        assert!(!reader.open());
        assert!(!reader.is_open());
    }

    #[test]
    fn close_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut reader = SharedMemoryReader::new(dir.path().join("link"), 3);
        reader.open();
        reader.close();
        reader.close();
        assert!(reader.read().is_none());
    }

    #[test]
    fn tracks_liveness_through_the_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("link");
        let mut reader = SharedMemoryReader::new(&path, 3);
        assert!(reader.open());

        let mut producer = SharedSegment::open_existing(&path).unwrap();
        let mut tick = 0u32;
        let mut advance = |producer: &mut SharedSegment| {
            tick += 1;
            FrameWriter::new(producer.as_mut_slice()).set_tick(tick);
        };

        advance(&mut producer);
        assert!(reader.read().unwrap().connected, "first read");
        advance(&mut producer);
        let frame = reader.read().unwrap();
        assert!(frame.connected);
        assert_eq!(frame.snapshot.tick, 2);

        assert!(reader.read().unwrap().connected);
        assert!(reader.read().unwrap().connected);
        assert!(!reader.read().unwrap().connected);

        advance(&mut producer);
        assert!(reader.read().unwrap().connected);
    }

    #[test]
    fn first_read_of_running_producer_is_connected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("link");
        let mut producer = SharedSegment::create_or_open(&path, LINK_SIZE as u64).unwrap();
        FrameWriter::new(producer.as_mut_slice()).set_tick(100);

        let mut reader = SharedMemoryReader::new(&path, 3);
        assert!(reader.open());
        let frame = reader.read().unwrap();
        assert_eq!(frame.snapshot.tick, 100);
        assert!(frame.connected);
    }

    #[test]
    fn reopen_reads_connected_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("link");
        let mut reader = SharedMemoryReader::new(&path, 3);
        assert!(reader.open());
        let mut producer = SharedSegment::open_existing(&path).unwrap();
        FrameWriter::new(producer.as_mut_slice()).set_tick(7);
        for _ in 0..4 {
            reader.read();
        }
        assert!(!reader.read().unwrap().connected);

        reader.close();
        assert!(reader.open());
        FrameWriter::new(producer.as_mut_slice()).set_tick(8);
        assert!(reader.read().unwrap().connected);
    }
}
