use lodestar_link::{LinkFrame, SharedMemoryReader};

/// What the orchestrator polls. Implemented by the shared-memory reader;
/// tests substitute scripted frames.
pub trait SnapshotSource: Send {
    fn open(&mut self) -> bool;
    fn read(&mut self) -> Option<LinkFrame>;
    fn close(&mut self);
}

impl SnapshotSource for SharedMemoryReader {
    fn open(&mut self) -> bool {
        SharedMemoryReader::open(self)
    }

    fn read(&mut self) -> Option<LinkFrame> {
        SharedMemoryReader::read(self)
    }

    fn close(&mut self) {
        SharedMemoryReader::close(self)
    }
}
